use clap::{Args, Subcommand};
use std::io::{self, Write};

use mydictionary_core::storage::collect_results;
use mydictionary_core::{AccountApi, AppContext, StorageType};

use super::auth::clear_session;
use super::{current_session, report_failures, CommandError};

#[derive(Args)]
pub struct AccountCommand {
    #[command(subcommand)]
    pub command: AccountSubcommand,
}

#[derive(Subcommand)]
pub enum AccountSubcommand {
    /// Delete the account on the server and all local data
    Delete {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl AccountCommand {
    pub async fn run(&self, context: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            AccountSubcommand::Delete { force } => {
                let session = current_session(context).await?;

                if !force {
                    print!(
                        "Delete account '{}' and all its words? [y/N] ",
                        session.user.nickname
                    );
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                delete_account(context).await?;
                println!("Deleted account: {}", session.user.nickname);
                Ok(())
            }
        }
    }
}

/// Deletes the remote account, then every locally stored family.
pub async fn delete_account(context: &AppContext) -> Result<(), CommandError> {
    let session = current_session(context).await?;

    context
        .account_api
        .delete_account(&session.jwt.access_token, session.user.id)
        .await?;

    let words = context.words.delete_all(StorageType::All).await;
    let courses = context.courses.delete_all(StorageType::All).await;
    let languages = context.languages.delete_all(StorageType::All).await;

    report_failures("remove words", &words);
    report_failures("remove courses", &courses);
    report_failures("remove languages", &languages);
    collect_results(words)?;
    collect_results(courses)?;
    collect_results(languages)?;

    clear_session(context).await?;

    tracing::info!(user_id = session.user.id, "account deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::delete;
    use axum::Router;
    use chrono::{Duration, Utc};
    use mydictionary_core::storage::init_db;
    use mydictionary_core::{JwtCredential, RequestDispatcher, User, Word};
    use tempfile::TempDir;

    async fn logged_in_context(status: StatusCode) -> (TempDir, AppContext) {
        let app = Router::new().route(
            "/deleteAccount/userId/{id}",
            delete(move |Path(_id): Path<i64>| async move { status }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let dir = TempDir::new().unwrap();
        let pool = init_db(&dir.path().join("cli.db")).await.unwrap();
        let context = AppContext::with_pool(pool, RequestDispatcher::new(url));

        context
            .users
            .create(User::new(3, "dima"), StorageType::All)
            .await;
        context
            .jwts
            .create(
                JwtCredential::new("tok", Utc::now() + Duration::hours(1)),
                StorageType::All,
            )
            .await;
        context
            .words
            .create(Word::new(1, 1, "Flank", "side").with_user(3), StorageType::All)
            .await;

        (dir, context)
    }

    #[tokio::test]
    async fn test_delete_account_clears_local_state() {
        let (_dir, context) = logged_in_context(StatusCode::OK).await;

        delete_account(&context).await.unwrap();

        let words = collect_results(context.words.count(StorageType::All).await).unwrap();
        assert_eq!(words, vec![0, 0]);
        assert!(matches!(
            current_session(&context).await,
            Err(CommandError::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_local_state() {
        let (_dir, context) = logged_in_context(StatusCode::INTERNAL_SERVER_ERROR).await;

        let err = delete_account(&context).await.unwrap_err();
        assert!(matches!(err, CommandError::Api(_)));

        let words = collect_results(context.words.count(StorageType::All).await).unwrap();
        assert_eq!(words, vec![1, 1]);
        assert!(current_session(&context).await.is_ok());
    }
}
