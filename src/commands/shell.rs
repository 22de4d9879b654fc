//! Interactive session shell
//!
//! Keeps one [`ClientContext`] alive across many commands, the way a browser
//! tab keeps one session across many page interactions. The access token
//! lives only in memory; the durable credential is saved after every command.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;

use crate::commands::session::{print_body, print_user};
use crate::commands::{prompt_password, ClientContext};
use crate::config::Config;
use crate::error::Result;
use crate::http::ApiRequest;
use crate::models::{Credentials, Registration};
use crate::session::navigator::Route;
use crate::session::store::SessionStore;
use crate::session::BootstrapOutcome;

/// Errors that can occur when parsing a shell line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType 'help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Login { username: String },
    Register { username: String, email: String },
    Whoami,
    /// Session and refresh coordinator diagnostics
    Status,
    Logout,
    Get { path: String },
    Help,
    Exit,
}

/// Parses one non-empty shell line.
///
/// # Errors
///
/// Returns [`ShellError`] for unknown commands and missing arguments.
///
/// # Examples
///
/// ```
/// use lovenote::commands::shell::{parse_line, ShellCommand};
///
/// assert_eq!(
///     parse_line("get notes/3").unwrap(),
///     ShellCommand::Get { path: "notes/3".to_string() }
/// );
/// assert_eq!(parse_line("QUIT").unwrap(), ShellCommand::Exit);
/// ```
pub fn parse_line(line: &str) -> std::result::Result<ShellCommand, ShellError> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    let missing = |usage: &str| ShellError::MissingArgument {
        command: command.clone(),
        usage: usage.to_string(),
    };

    match command.as_str() {
        "login" => match args.as_slice() {
            [username, ..] => Ok(ShellCommand::Login {
                username: username.to_string(),
            }),
            [] => Err(missing("login <username>")),
        },
        "register" => match args.as_slice() {
            [username, email, ..] => Ok(ShellCommand::Register {
                username: username.to_string(),
                email: email.to_string(),
            }),
            _ => Err(missing("register <username> <email>")),
        },
        "get" => match args.as_slice() {
            [path, ..] => Ok(ShellCommand::Get {
                path: path.to_string(),
            }),
            [] => Err(missing("get <path>")),
        },
        "whoami" => Ok(ShellCommand::Whoami),
        "status" => Ok(ShellCommand::Status),
        "logout" => Ok(ShellCommand::Logout),
        "help" | "?" => Ok(ShellCommand::Help),
        "exit" | "quit" => Ok(ShellCommand::Exit),
        other => Err(ShellError::UnknownCommand(other.to_string())),
    }
}

/// Runs the interactive shell until `exit`, Ctrl-C or Ctrl-D.
pub async fn run_shell(config: Config) -> Result<()> {
    let mut ctx = ClientContext::open(&config)?;
    let outcome = ctx.manager.bootstrap().await;
    ctx.take_routes();
    ctx.save()?;
    print_banner(&outcome);

    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = prompt_for(ctx.manager.store());
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                let command = match parse_line(trimmed) {
                    Ok(ShellCommand::Exit) => break,
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}", e.to_string().red());
                        continue;
                    }
                };

                if let Err(e) = execute(&mut ctx, command).await {
                    eprintln!("{}", format!("Error: {}", e).red());
                }

                let routes = ctx.take_routes();
                for route in &routes {
                    println!("{}", format!("-> {}", route).cyan());
                }
                if routes.contains(&Route::Login) {
                    ctx.forget()?;
                } else {
                    ctx.save()?;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    ctx.save()?;
    println!("Goodbye!");
    Ok(())
}

async fn execute(ctx: &mut ClientContext, command: ShellCommand) -> Result<()> {
    match command {
        ShellCommand::Login { username } => {
            let password = prompt_password("Password: ")?;
            let user = ctx
                .manager
                .login(Credentials::new(username, password))
                .await?;
            println!("{}", format!("Signed in as {}", user.username).green());
        }
        ShellCommand::Register { username, email } => {
            let password = prompt_password("Password: ")?;
            let user = ctx
                .manager
                .register(Registration {
                    username,
                    email,
                    password,
                    profile_picture: None,
                })
                .await?;
            println!("{}", format!("Registered as {}", user.username).green());
        }
        ShellCommand::Whoami => match ctx.manager.store().current_user() {
            Some(user) => print_user(&user),
            None => println!("{}", "Not signed in".yellow()),
        },
        ShellCommand::Status => print_status(ctx),
        ShellCommand::Logout => {
            ctx.manager.logout().await;
            println!("{}", "Signed out".green());
        }
        ShellCommand::Get { path } => {
            let response = ctx.manager.client().send(ApiRequest::get(path)).await?;
            let status = response.status.to_string();
            if response.is_success() {
                println!("{}", status.green());
            } else {
                println!("{}", status.red());
            }
            print_body(&response.body);
        }
        ShellCommand::Help => print_help(),
        ShellCommand::Exit => {}
    }
    Ok(())
}

fn prompt_for(store: &SessionStore) -> String {
    match store.current_user() {
        Some(user) => format!("{}> ", user.username.green()),
        None => format!("{}> ", "anonymous".yellow()),
    }
}

fn print_banner(outcome: &BootstrapOutcome) {
    println!("{}", "lovenote shell".bold());
    match outcome {
        BootstrapOutcome::Authenticated(user) => {
            println!("Session restored for {}", user.username.cyan())
        }
        BootstrapOutcome::Anonymous => println!("{}", "Not signed in".yellow()),
    }
    println!("Type 'help' for commands.\n");
}

fn print_status(ctx: &ClientContext) {
    let session = ctx.manager.store().get();
    let coordinator = ctx.manager.coordinator();
    println!(
        "Signed in:     {}",
        if session.is_authenticated() {
            "yes".green()
        } else {
            "no".yellow()
        }
    );
    if let Some(at) = session.authenticated_at {
        println!("Token issued:  {}", at.to_rfc3339());
    }
    println!("Refresh state: {:?}", coordinator.state());
    println!("Refreshes:     {}", coordinator.refresh_count());
    println!("Session epoch: {}", ctx.manager.store().epoch());
}

fn print_help() {
    println!(
        r#"
Commands
========
  login <username>             - Sign in (prompts for password)
  register <username> <email>  - Create an account and sign in
  whoami                       - Show the signed-in user
  status                       - Show session and refresh diagnostics
  get <path>                   - Authenticated GET relative to the API base URL
  logout                       - Sign out
  help                         - Show this help
  exit | quit                  - Leave the shell
"#
    );
}
