//! List work items in a session

use crate::config::Config;
use anyhow::Result;
use ferry_storage::WorkItemState;

pub async fn run(config: &Config, session: &str) -> Result<()> {
    let (coordinator, _) = config.open_coordinator()?;
    let items = coordinator.list_work_items_by_session(session).await?;

    for item in &items {
        let worker = match &item.state {
            WorkItemState::Assigned { worker_id, .. } => worker_id.as_str(),
            _ => "-",
        };
        println!(
            "{}\t{}\t{}\t{}/{} docs\t{}",
            item.work_item_id,
            item.state.label(),
            worker,
            item.documents_processed,
            item.document_count,
            item.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("{} work items", items.len());
    Ok(())
}
