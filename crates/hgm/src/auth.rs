use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use hgm_api::{login_flow, Destination, LoginOutcome};
use serde_json::{Map, Value};

use crate::context::{print_json, Context};
use crate::dashboard;

#[derive(Args, Debug)]
#[command(about = "Log in, log out, or show the current session")]
pub struct AuthArgs {
    #[command(subcommand)]
    command: Option<AuthCommand>,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Log in and store the session token
    Login(LoginArgs),
    /// Invalidate the session on the server and forget it locally
    Logout,
    /// Show the stored session
    Status,
    /// Create an account
    Register(RegisterArgs),
    /// Print the server-side account details of the current session
    Details,
}

#[derive(Args, Debug, Default)]
pub struct LoginArgs {
    /// Username (prompted if omitted)
    #[arg(short, long)]
    username: Option<String>,

    /// Password (prompted if omitted)
    #[arg(short, long)]
    password: Option<String>,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    username: String,

    #[arg(long)]
    password: String,

    /// Account role, e.g. anganwadi or family
    #[arg(long)]
    role: String,

    #[arg(long)]
    name: Option<String>,

    /// Additional account fields as key=value
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    fields: Vec<(String, String)>,
}

pub fn execute(args: AuthArgs) -> Result<()> {
    match args.command {
        Some(AuthCommand::Login(login)) => self::login(login),
        None => self::login(LoginArgs::default()),
        Some(AuthCommand::Logout) => logout(),
        Some(AuthCommand::Status) => status(),
        Some(AuthCommand::Register(register)) => self::register(register),
        Some(AuthCommand::Details) => details(),
    }
}

fn login(args: LoginArgs) -> Result<()> {
    let ctx = Context::load()?;

    let username = match args.username {
        Some(u) => u,
        None => inquire::Text::new("Username:").prompt()?,
    };
    let password = match args.password {
        Some(p) => p,
        None => inquire::Password::new("Password:")
            .without_confirmation()
            .prompt()?,
    };

    match login_flow(&ctx.client, &username, &password, ctx.config.routing_policy()) {
        LoginOutcome::MissingCredentials => {
            anyhow::bail!("Username and password are required")
        }
        LoginOutcome::ConnectionFailed(message) => {
            anyhow::bail!(
                "Cannot reach server at {} ({message}). Check your connection and try again.",
                ctx.client.base_url()
            )
        }
        LoginOutcome::Rejected(message) => anyhow::bail!("Login failed: {message}"),
        LoginOutcome::Routed(destination) => {
            println!("{} Logged in as {}", "✓".green(), username.bold());
            match &destination {
                Destination::AdminDisabled => println!(
                    "{}",
                    "Admin accounts are not supported by this client.".yellow()
                ),
                Destination::UnknownRole => println!(
                    "{}",
                    "Your account has no recognised role; contact your supervisor.".yellow()
                ),
                _ => println!("Run {} to continue.", "hgm dashboard".cyan()),
            }
            log::debug!("Routed to {}", dashboard::destination_name(&destination));
            Ok(())
        }
    }
}

fn logout() -> Result<()> {
    let ctx = Context::load()?;
    if ctx.client.session().is_none() {
        println!("Not logged in");
        return Ok(());
    }
    match ctx.client.logout() {
        Ok(_) => println!("{} Logged out", "✓".green()),
        Err(e) => {
            log::warn!("Server logout failed: {e}");
            println!("{} Logged out locally (server said: {e})", "✓".green());
        }
    }
    Ok(())
}

fn status() -> Result<()> {
    let ctx = Context::load()?;
    println!("Authentication Status:");
    match ctx.client.session() {
        Some(session) => {
            println!("  Status: Logged in");
            if let Some(username) = session.username() {
                println!("  Username: {username}");
            }
            match session.role() {
                Some(role) => println!("  Role: {role}"),
                None => println!("  Role: unknown"),
            }
            if let Some(center) = session.user.as_ref().and_then(|u| u.center_code.as_deref()) {
                println!("  Center: {center}");
            }
        }
        None => {
            println!("  Status: Not logged in");
            println!("\nRun `hgm auth login` to authenticate.");
        }
    }
    Ok(())
}

fn register(args: RegisterArgs) -> Result<()> {
    let ctx = Context::load()?;

    let mut payload = Map::new();
    for (key, value) in args.fields {
        payload.insert(key, Value::String(value));
    }
    payload.insert("username".into(), Value::String(args.username.clone()));
    payload.insert("password".into(), Value::String(args.password));
    payload.insert("role".into(), Value::String(args.role));
    if let Some(name) = args.name {
        payload.insert("name".into(), Value::String(name));
    }

    let response = ctx
        .client
        .register(&Value::Object(payload))
        .context("Registration failed")?;
    if !response.success {
        anyhow::bail!("Registration failed: {}", response.message);
    }
    match response.user_id {
        Some(id) => println!("{} Registered {} (id {id})", "✓".green(), args.username.bold()),
        None => println!("{} Registered {}", "✓".green(), args.username.bold()),
    }
    Ok(())
}

fn details() -> Result<()> {
    let ctx = Context::load()?;
    ctx.require_session()?;
    let details = ctx
        .client
        .get_details()
        .context("Failed to fetch account details")?;
    print_json(&details)
}

pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("worker_code=AW-1").unwrap(),
            ("worker_code".to_string(), "AW-1".to_string())
        );
        assert_eq!(
            parse_key_value("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
