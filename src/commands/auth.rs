//! Login and logout.
//!
//! The signed-in user and their credential are stored like any other
//! entity, in both tiers.

use clap::Args;
use std::io::{self, Write};

use mydictionary_core::storage::collect_results;
use mydictionary_core::{AppContext, AuthRequest, AuthResponse, JwtApi, StorageType};

use super::{report_failures, CommandError};

/// Log in to the MyDictionary API
#[derive(Args)]
pub struct LoginCommand {
    /// Account nickname
    #[arg(long, short)]
    nickname: String,

    /// Account password (prompted for when omitted)
    #[arg(long, short)]
    password: Option<String>,
}

impl LoginCommand {
    pub async fn run(&self, context: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        let password = match &self.password {
            Some(password) => password.clone(),
            None => prompt("Password: ")?,
        };

        let request = AuthRequest {
            nickname: self.nickname.clone(),
            password,
        };

        let response = login(context, &request).await?;
        println!("Logged in as {}", response.user.nickname);
        Ok(())
    }
}

/// Authenticates and replaces any stored session with the new one.
pub async fn login(
    context: &AppContext,
    request: &AuthRequest,
) -> Result<AuthResponse, CommandError> {
    let response = context.jwt_api.authenticate(request).await?;

    clear_session(context).await?;

    let users = context
        .users
        .create(response.user.clone(), StorageType::All)
        .await;
    let jwts = context
        .jwts
        .create(response.jwt.clone(), StorageType::All)
        .await;

    report_failures("save user", &users);
    report_failures("save credential", &jwts);
    collect_results(users)?;
    collect_results(jwts)?;

    tracing::info!(user_id = response.user.id, "session stored");
    Ok(response)
}

/// Log out, removing the stored session
#[derive(Args)]
pub struct LogoutCommand {}

impl LogoutCommand {
    pub async fn run(&self, context: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        clear_session(context).await?;
        println!("Logged out");
        Ok(())
    }
}

pub async fn clear_session(context: &AppContext) -> Result<(), CommandError> {
    let users = context.users.delete_all(StorageType::All).await;
    let jwts = context.jwts.delete_all(StorageType::All).await;

    report_failures("remove user", &users);
    report_failures("remove credential", &jwts);
    collect_results(users)?;
    collect_results(jwts)?;
    Ok(())
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
