//! Pull languages, courses and words from the API into local storage.

use clap::Args;

use mydictionary_core::{AppContext, SyncItem, SyncResult};

use super::{current_session, CommandError};

/// Sync with the MyDictionary API
#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    pub async fn run(&self, context: &AppContext) -> Result<(), CommandError> {
        let session = current_session(context).await?;
        let item = SyncItem::new(session.jwt.access_token, session.user.id);

        println!("Syncing with {}...", context.dispatcher.base_url());
        println!();

        let results = context.sync_engine().start(item).await?;
        for result in &results {
            println!("  {}", format_result(result));
        }

        println!();
        let failed = results.iter().filter(|r| !r.is_ok()).count();
        if failed == 0 {
            println!("Sync complete.");
        } else {
            println!(
                "Sync finished with {} failed famil{}.",
                failed,
                if failed == 1 { "y" } else { "ies" }
            );
        }

        Ok(())
    }
}

fn format_result(result: &SyncResult) -> String {
    match &result.result {
        Ok(count) => format!(
            "✓ {} ({} record{})",
            result.family,
            count,
            if *count == 1 { "" } else { "s" }
        ),
        Err(e) => format!("✗ {} - {}", result.family, e),
    }
}
