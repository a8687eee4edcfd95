use anyhow::{Context as _, Result};
use clap::Args;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::Table;
use hgm_api::Totals;

use crate::context::{print_json, Context};

#[derive(Args, Debug)]
#[command(about = "Program-wide totals")]
pub struct StatsArgs {
    #[arg(long)]
    json: bool,
}

pub fn execute(args: StatsArgs) -> Result<()> {
    let ctx = Context::load()?;
    let totals = ctx
        .client
        .fetch_totals()
        .context("Failed to fetch totals")?;

    if args.json {
        return print_json(&totals);
    }
    println!("{}", totals_table(&totals));
    Ok(())
}

pub fn totals_table(totals: &Totals) -> Table {
    let count = |n: Option<u64>| n.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.add_row(vec!["Registered households".to_string(), count(totals.total_students)]);
    table.add_row(vec!["Photos uploaded".to_string(), count(totals.total_images_uploaded)]);
    table
}
