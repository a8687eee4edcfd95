use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use hgm_api::FileKind;
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::auth::parse_key_value;
use crate::context::{print_json, Context};

#[derive(Args, Debug)]
#[command(about = "Upload a photo or document")]
pub struct UploadArgs {
    /// File path or file:// URI
    file: String,

    /// photo or document
    #[arg(long = "type", value_name = "TYPE", default_value = "photo")]
    kind: String,

    /// Extra form fields as key=value
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    fields: Vec<(String, String)>,

    #[arg(long)]
    json: bool,
}

pub fn execute(args: UploadArgs) -> Result<()> {
    let kind: FileKind = args.kind.parse()?;
    let ctx = Context::load()?;
    let extra: BTreeMap<String, String> = args.fields.into_iter().collect();

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Uploading {}...", args.file));
    let result = ctx.client.upload_file(&args.file, kind, &extra);
    spinner.finish_and_clear();
    let response = result.context("Upload failed")?;

    if args.json {
        print_json(&response)?;
    }
    if !response.success {
        anyhow::bail!("Upload failed: {}", response.message);
    }
    if args.json {
        return Ok(());
    }
    println!("{} Uploaded {}", "✓".green(), args.file);
    if let Some(url) = &response.file_url {
        println!("  {}", url.dimmed());
    }
    Ok(())
}
