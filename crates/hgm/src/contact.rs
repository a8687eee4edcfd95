use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::context::{print_json, Context};

#[derive(Args, Debug)]
#[command(about = "Look up an account by contact number")]
pub struct ContactArgs {
    /// Contact or mobile number
    number: String,

    #[arg(long)]
    json: bool,
}

pub fn execute(args: ContactArgs) -> Result<()> {
    let ctx = Context::load()?;
    let lookup = ctx.client.lookup_contact(args.number.trim());

    if args.json {
        return print_json(&lookup);
    }

    let Some(user) = lookup.user.filter(|_| lookup.success) else {
        anyhow::bail!(lookup.message);
    };
    println!("{} {}", "✓".green(), lookup.message);
    if let Some(name) = &user.name {
        println!("  Name: {}", name.bold());
    }
    if let Some(role) = &user.role {
        println!("  Role: {role}");
    }
    if let Some(center) = user.center_name.as_deref().or(user.center_code.as_deref()) {
        println!("  Center: {center}");
    }
    Ok(())
}
