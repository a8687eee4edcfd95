use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use hgm_api::CancelToken;

use crate::context::{print_json, Context};
use crate::family::families_table;

#[derive(Args, Debug)]
#[command(about = "Search households by child name or mobile number")]
pub struct SearchArgs {
    /// Search text. Omit to open the interactive search screen.
    query: Option<String>,

    /// Limit to one center (uses the center-scoped search endpoint)
    #[arg(long, value_name = "CODE")]
    center: Option<String>,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

pub fn execute(args: SearchArgs) -> Result<()> {
    let ctx = Context::load()?;

    let Some(query) = args.query else {
        if args.json {
            anyhow::bail!("--json requires a search query");
        }
        return hgm_api::tui::run(ctx.client.clone(), ctx.config.search_debounce());
    };

    let families = match args.center.as_deref() {
        Some(center) => ctx.client.search_families(&query, Some(center)),
        None => ctx.client.try_search_households(&query, &CancelToken::never()),
    }
    .with_context(|| format!("Search for '{query}' failed"))?;

    if args.json {
        return print_json(&families);
    }

    if families.is_empty() {
        println!("{}", "No households found".yellow());
        return Ok(());
    }
    println!("{}", families_table(&families));
    println!("{} household(s)", families.len());
    Ok(())
}
