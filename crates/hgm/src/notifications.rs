use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use hgm_api::{Notification, NotificationKind};

use crate::context::{print_json, Context};

#[derive(Args, Debug)]
#[command(about = "Recent activity on this device (last 24 hours)")]
pub struct NotificationsArgs {
    /// Remove all notifications
    #[arg(long)]
    clear: bool,

    #[arg(long)]
    json: bool,
}

pub fn execute(args: NotificationsArgs) -> Result<()> {
    let ctx = Context::load()?;
    let log = ctx.notification_log();

    if args.clear {
        log.clear().context("Failed to clear notifications")?;
        println!("{} Notifications cleared", "✓".green());
        return Ok(());
    }

    let now = Utc::now();
    let notifications = log.load(now).context("Failed to read notifications")?;
    if args.json {
        return print_json(&notifications);
    }
    print_notifications(&notifications, now);
    Ok(())
}

pub fn print_notifications(notifications: &[Notification], now: DateTime<Utc>) {
    if notifications.is_empty() {
        println!("{}", "No recent activity".dimmed());
        return;
    }
    println!("{}", "Recent activity".bold());
    for n in notifications {
        let icon = match n.kind {
            NotificationKind::FamilyRegistered => "+".green(),
            NotificationKind::PhotoUploaded => "*".cyan(),
        };
        println!("  {icon} {} {}", n.message, format_age(now - n.timestamp).dimmed());
    }
}

fn format_age(age: chrono::Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else {
        format!("{}h ago", age.num_hours())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::seconds(20)), "just now");
        assert_eq!(format_age(Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(Duration::minutes(150)), "2h ago");
    }
}
