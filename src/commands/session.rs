//! One-shot session commands
//!
//! Every command that talks to the server first runs the bootstrap, the way
//! a page load does, then saves the cookie jar on the way out.

use colored::Colorize;

use crate::commands::{prompt_password, ClientContext};
use crate::config::Config;
use crate::error::Result;
use crate::http::ApiRequest;
use crate::models::{Credentials, Registration, UserIdentity};
use crate::session::BootstrapOutcome;

/// Signs in and saves the session.
pub async fn login(config: Config, username: String, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_password("Password: ")?,
    };
    let mut ctx = ClientContext::open(&config)?;

    let user = ctx
        .manager
        .login(Credentials::new(username, password))
        .await?;
    ctx.take_routes();
    ctx.save()?;

    println!("{}", format!("Signed in as {}", user.username).green());
    Ok(())
}

/// Creates an account, signs in, and saves the session.
pub async fn register(
    config: Config,
    username: String,
    email: String,
    password: Option<String>,
    profile_picture: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_password("Password: ")?,
    };
    let mut ctx = ClientContext::open(&config)?;

    let user = ctx
        .manager
        .register(Registration {
            username,
            email,
            password,
            profile_picture,
        })
        .await?;
    ctx.take_routes();
    ctx.save()?;

    println!("{}", format!("Registered and signed in as {}", user.username).green());
    Ok(())
}

/// Restores the session and prints who it belongs to.
pub async fn whoami(config: Config, json: bool) -> Result<()> {
    let mut ctx = ClientContext::open(&config)?;
    let outcome = ctx.manager.bootstrap().await;
    ctx.take_routes();
    ctx.save()?;

    match outcome {
        BootstrapOutcome::Authenticated(user) if json => {
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        BootstrapOutcome::Authenticated(user) => print_user(&user),
        BootstrapOutcome::Anonymous if json => println!("null"),
        BootstrapOutcome::Anonymous => println!("{}", "Not signed in".yellow()),
    }
    Ok(())
}

/// Ends the session on the server and forgets the saved credential.
pub async fn logout(config: Config) -> Result<()> {
    let mut ctx = ClientContext::open(&config)?;
    ctx.manager.bootstrap().await;
    ctx.manager.logout().await;
    ctx.take_routes();
    ctx.forget()?;

    println!("{}", "Signed out".green());
    Ok(())
}

/// Sends an authenticated `GET` and prints the body.
///
/// # Errors
///
/// Returns the HTTP failure as an error after printing it, so the process
/// exits non-zero.
pub async fn get(config: Config, path: String) -> Result<()> {
    let mut ctx = ClientContext::open(&config)?;
    ctx.manager.bootstrap().await;

    let response = ctx.manager.client().send(ApiRequest::get(path)).await?;
    let ended = ctx.settle_routes()?;
    if !ended {
        ctx.save()?;
    }

    print_body(&response.body);
    if ended {
        eprintln!(
            "{}",
            "Session expired. Sign in again with `lovenote login <username>`.".yellow()
        );
    }
    response.error_for_status()?;
    Ok(())
}

pub(crate) fn print_user(user: &UserIdentity) {
    println!("{} {}", "User:".bold(), user.username.cyan());
    println!("  id:      {}", user.id);
    if let Some(email) = &user.email {
        println!("  email:   {}", email);
    }
    if !user.profile_picture.is_empty() {
        println!("  picture: {}", user.profile_picture);
    }
    if let Some(bio) = &user.bio {
        println!("  bio:     {}", bio);
    }
    if let Some(created_at) = &user.created_at {
        println!("  joined:  {}", created_at);
    }
}

/// Pretty-prints JSON bodies, falls back to raw text.
pub(crate) fn print_body(body: &[u8]) {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", String::from_utf8_lossy(body)),
        },
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            if !text.trim().is_empty() {
                println!("{}", text.trim());
            }
        }
    }
}
