use anyhow::Result;
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::Table;
use hgm_api::{resolve_destination, Destination, FamilyProfile, LoginResponse, Totals};

use crate::context::Context;
use crate::notifications::print_notifications;
use crate::stats::totals_table;

#[derive(Args, Debug)]
#[command(about = "Role-specific landing view")]
pub struct DashboardArgs {}

pub fn destination_name(destination: &Destination) -> &'static str {
    match destination {
        Destination::AnganwadiDashboard => "anganwadi dashboard",
        Destination::FamilyDashboard(_) => "family dashboard",
        Destination::AdminDisabled => "admin (disabled)",
        Destination::UnknownRole => "unknown role",
    }
}

pub fn execute(_args: DashboardArgs) -> Result<()> {
    let ctx = Context::load()?;

    // Startup probe is advisory only
    let probe = ctx.client.test_connection();
    if !probe.success {
        log::warn!(
            "Server {} did not answer the probe: {}",
            ctx.client.base_url(),
            probe.message
        );
    }

    let session = ctx.require_session()?;
    let response = LoginResponse {
        success: true,
        user: session.user.clone(),
        ..Default::default()
    };

    match resolve_destination(&response, ctx.config.routing_policy()) {
        Destination::AnganwadiDashboard => anganwadi(&ctx, &session),
        Destination::FamilyDashboard(profile) => family(&ctx, &profile),
        Destination::AdminDisabled => {
            anyhow::bail!("Admin accounts are not supported by this client")
        }
        Destination::UnknownRole => {
            anyhow::bail!("Your account has no recognised role. Log in again or contact your supervisor.")
        }
    }
}

fn anganwadi(ctx: &Context, session: &hgm_api::Session) -> Result<()> {
    let user = session.user.clone().unwrap_or_default();
    println!(
        "{} {}",
        "Anganwadi dashboard".green().bold(),
        user.name.as_deref().or(session.username()).unwrap_or("")
    );
    if let Some(center) = user.center_name.as_deref().or(user.center_code.as_deref()) {
        println!("Center: {center}");
    }

    let totals = ctx.client.fetch_totals().unwrap_or_else(|e| {
        log::warn!("Failed to fetch totals: {e}");
        Totals::default()
    });
    println!("{}", totals_table(&totals));

    // The last record of an unfiltered search is the newest registration
    let log = ctx.notification_log();
    let now = Utc::now();
    if let Some(latest) = ctx.client.search_households("").last() {
        if let Err(e) = log.observe_latest_family(&latest.child_name, now) {
            log::warn!("Failed to update notifications: {e}");
        }
    }

    match log.load(now) {
        Ok(notifications) => print_notifications(&notifications, now),
        Err(e) => log::warn!("Failed to read notifications: {e}"),
    }
    Ok(())
}

fn family(ctx: &Context, profile: &FamilyProfile) -> Result<()> {
    println!(
        "{} {}",
        "Family dashboard".green().bold(),
        profile.name.as_deref().unwrap_or("")
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    for (label, value) in [
        ("Name", &profile.name),
        ("Age", &profile.age),
        ("Guardian", &profile.guardian_name),
        ("Father", &profile.father_name),
        ("Mother", &profile.mother_name),
        ("Center", &profile.center_code),
    ] {
        if let Some(value) = value {
            table.add_row(vec![label, value.as_str()]);
        }
    }
    println!("{table}");

    if let Some(user_id) = &profile.user_id {
        match ctx.client.get_family_by_user_id(user_id) {
            Ok(household) => {
                let plant = if household.plant_distributed {
                    "distributed".green()
                } else {
                    "not yet distributed".yellow()
                };
                println!("Plant: {plant}");
                if let Some(count) = household.total_images_yet {
                    println!("Photos uploaded: {count}");
                }
            }
            Err(e) => log::warn!("Failed to fetch household for user {user_id}: {e}"),
        }
    }
    Ok(())
}
