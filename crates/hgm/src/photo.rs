use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use hgm_api::PlantPhotoMeta;
use indicatif::ProgressBar;
use std::time::Duration;

use crate::context::{print_json, Context};

#[derive(Args, Debug)]
#[command(about = "Upload a plant growth photo")]
pub struct PhotoArgs {
    /// Image path or file:// URI
    image: String,

    /// Parent or child name to show with the photo
    #[arg(long)]
    name: String,

    /// Growth stage, e.g. seedling, sapling, flowering
    #[arg(long, default_value = "")]
    stage: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Upload on behalf of this username (defaults to the logged-in user)
    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    json: bool,
}

pub fn execute(args: PhotoArgs) -> Result<()> {
    let ctx = Context::load()?;
    let session = ctx.require_session()?;
    let username = match args.username.or_else(|| session.username().map(String::from)) {
        Some(u) => u,
        None => anyhow::bail!("No username on the session; pass --username"),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Uploading {}...", args.image));

    let result = ctx.client.upload_plant_photo(
        &args.image,
        PlantPhotoMeta {
            username: &username,
            name: &args.name,
            plant_stage: &args.stage,
            description: &args.description,
        },
    );
    spinner.finish_and_clear();
    let response = result.context("Photo upload failed")?;

    if !response.success {
        if args.json {
            print_json(&response)?;
        }
        anyhow::bail!("Photo upload failed: {}", response.message);
    }

    if let Err(e) = ctx
        .notification_log()
        .record_photo_upload(&args.name, chrono::Utc::now())
    {
        log::warn!("Failed to record upload notification: {e}");
    }

    if args.json {
        return print_json(&response);
    }
    println!("{} Photo uploaded for {}", "✓".green(), args.name.bold());
    if let Some(url) = &response.file_url {
        println!("  {}", url.dimmed());
    }
    Ok(())
}
