use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::context::{print_json, Context};

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Output JSON
    #[arg(long)]
    json: bool,
}

pub fn execute(args: PingArgs) -> Result<()> {
    let ctx = Context::load()?;
    let status = ctx.client.test_connection();

    if args.json {
        return print_json(&status);
    }

    if status.success {
        println!(
            "{} {} is reachable ({})",
            "✓".green(),
            ctx.client.base_url(),
            status.message
        );
        Ok(())
    } else {
        anyhow::bail!(
            "{} is not reachable: {}",
            ctx.client.base_url(),
            status.message
        )
    }
}
