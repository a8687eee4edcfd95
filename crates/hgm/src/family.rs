use anyhow::{Context as _, Result};
use clap::{Args, Subcommand, ValueEnum};
use colored::Colorize;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use hgm_api::{Family, FamilyRegistration, FamilyUpdate, Gender};

use crate::context::{print_json, Context};

#[derive(Args, Debug)]
#[command(about = "Register, inspect and update households")]
pub struct FamilyArgs {
    #[command(subcommand)]
    command: FamilyCommand,
}

#[derive(Subcommand, Debug)]
pub enum FamilyCommand {
    /// Register a new household
    Register(RegisterArgs),
    /// Show one household
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Show the household linked to a user account
    ByUser {
        user_id: String,
        #[arg(long)]
        json: bool,
    },
    /// List households, optionally for one center
    List {
        #[arg(long, value_name = "CODE")]
        center: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Update fields of a household
    Update(UpdateArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum GenderArg {
    Boy,
    Girl,
}

impl From<GenderArg> for Gender {
    fn from(g: GenderArg) -> Self {
        match g {
            GenderArg::Boy => Gender::Boy,
            GenderArg::Girl => Gender::Girl,
        }
    }
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    child_name: String,
    #[arg(long, value_enum)]
    gender: Option<GenderArg>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    date_of_birth: Option<String>,
    #[arg(long)]
    age: Option<String>,
    /// Weight in kg
    #[arg(long)]
    weight: Option<String>,
    /// Height in cm
    #[arg(long)]
    height: Option<String>,
    #[arg(long)]
    mother_name: Option<String>,
    #[arg(long)]
    father_name: Option<String>,
    /// 10-digit mobile number
    #[arg(long)]
    mobile: String,
    #[arg(long)]
    village: String,
    #[arg(long)]
    ward: Option<String>,
    #[arg(long)]
    panchayat: Option<String>,
    #[arg(long)]
    district: Option<String>,
    #[arg(long)]
    block: Option<String>,
    /// Plant distribution date (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    distribution_date: Option<String>,
    /// Center name (defaults to the logged-in worker's center)
    #[arg(long)]
    center_name: Option<String>,
    /// Center code (defaults to the logged-in worker's center)
    #[arg(long)]
    center_code: Option<String>,
    #[arg(long)]
    worker_name: Option<String>,
    #[arg(long)]
    worker_code: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    id: String,
    #[arg(long)]
    child_name: Option<String>,
    #[arg(long)]
    parent_name: Option<String>,
    #[arg(long)]
    mobile: Option<String>,
    #[arg(long)]
    village: Option<String>,
    #[arg(long)]
    plant_distributed: Option<bool>,
    #[arg(long)]
    status: Option<String>,
}

pub fn execute(args: FamilyArgs) -> Result<()> {
    let ctx = Context::load()?;
    match args.command {
        FamilyCommand::Register(register) => self::register(&ctx, register),
        FamilyCommand::Show { id, json } => {
            let family = ctx
                .client
                .get_family_details(&id)
                .with_context(|| format!("Failed to fetch household {id}"))?;
            show(&family, json)
        }
        FamilyCommand::ByUser { user_id, json } => {
            let family = ctx
                .client
                .get_family_by_user_id(&user_id)
                .with_context(|| format!("Failed to fetch household for user {user_id}"))?;
            show(&family, json)
        }
        FamilyCommand::List { center, json } => {
            let families = ctx
                .client
                .get_families(center.as_deref())
                .context("Failed to list households")?;
            if json {
                return print_json(&families);
            }
            println!("{}", families_table(&families));
            println!("{} household(s)", families.len());
            Ok(())
        }
        FamilyCommand::Update(update) => self::update(&ctx, update),
    }
}

fn register(ctx: &Context, args: RegisterArgs) -> Result<()> {
    let session = ctx.require_session()?;
    let worker = session.user.unwrap_or_default();
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    let form = FamilyRegistration {
        child_name: args.child_name,
        gender: args.gender.map(Gender::from),
        date_of_birth: args.date_of_birth.unwrap_or_default(),
        age: args.age.unwrap_or_default(),
        weight: args.weight.unwrap_or_default(),
        height: args.height.unwrap_or_default(),
        mother_name: args.mother_name.unwrap_or_default(),
        father_name: args.father_name.unwrap_or_default(),
        mobile_number: args.mobile,
        village: args.village,
        ward: args.ward.unwrap_or_default(),
        panchayat: args.panchayat.unwrap_or_default(),
        district: args.district.or(worker.district).unwrap_or_default(),
        distribution_date: args.distribution_date.unwrap_or_else(|| today.clone()),
        anganwadi_center_name: args.center_name.or(worker.center_name).unwrap_or_default(),
        anganwadi_code: args.center_code.or(worker.center_code).unwrap_or_default(),
        worker_name: args.worker_name.or(worker.name).unwrap_or_default(),
        worker_code: args.worker_code.or(worker.username).unwrap_or_default(),
        block: args.block.or(worker.block).unwrap_or_default(),
        registration_date: today,
        plant_photo: None,
        pledge_photo: None,
    };

    let response = ctx
        .client
        .register_family(&form)
        .context("Household registration failed")?;
    if args.json {
        print_json(&response)?;
    }
    if !response.success {
        anyhow::bail!("Household registration failed: {}", response.message);
    }
    if args.json {
        return Ok(());
    }
    match response.family_id {
        Some(id) => println!(
            "{} Registered {} (household {id})",
            "✓".green(),
            form.child_name.bold()
        ),
        None => println!("{} Registered {}", "✓".green(), form.child_name.bold()),
    }
    Ok(())
}

fn update(ctx: &Context, args: UpdateArgs) -> Result<()> {
    let update = FamilyUpdate {
        child_name: args.child_name,
        parent_name: args.parent_name,
        mobile_number: args.mobile,
        village: args.village,
        plant_distributed: args.plant_distributed,
        status: args.status,
    };
    let response = ctx
        .client
        .update_family(&args.id, &update)
        .with_context(|| format!("Failed to update household {}", args.id))?;
    let message = if response.message.is_empty() {
        "Updated".to_string()
    } else {
        response.message
    };
    println!("{} {message}", "✓".green());
    Ok(())
}

fn show(family: &Family, json: bool) -> Result<()> {
    if json {
        return print_json(family);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    let rows: [(&str, Option<&str>); 9] = [
        ("ID", Some(family.id.as_str())),
        ("Child", Some(family.child_name.as_str())),
        ("Parent", Some(family.parent_name.as_str())),
        ("Mobile", Some(family.mobile_number.as_str())),
        ("Village", Some(family.village.as_str())),
        (
            "Plant",
            Some(if family.plant_distributed {
                "distributed"
            } else {
                "not distributed"
            }),
        ),
        (
            "Center",
            family
                .center_name
                .as_deref()
                .or(family.center_code.as_deref()),
        ),
        ("Registered", family.registration_date.as_deref()),
        ("Status", family.status.as_deref()),
    ];
    for (label, value) in rows {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            table.add_row(vec![label, value]);
        }
    }
    println!("{table}");
    Ok(())
}

pub fn families_table(families: &[Family]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Child", "Parent", "Mobile", "Village", "Plant"]);
    for f in families {
        table.add_row(vec![
            f.id.as_str(),
            f.child_name.as_str(),
            f.parent_name.as_str(),
            f.mobile_number.as_str(),
            f.village.as_str(),
            if f.plant_distributed { "✓" } else { "" },
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families_table_lists_every_row() {
        let families = vec![
            Family {
                id: "1".into(),
                child_name: "Aarav".into(),
                parent_name: "Sunita".into(),
                mobile_number: "9876543210".into(),
                village: "Rampur".into(),
                plant_distributed: true,
                ..Default::default()
            },
            Family {
                id: "2".into(),
                child_name: "Diya".into(),
                ..Default::default()
            },
        ];
        let rendered = families_table(&families).to_string();
        assert!(rendered.contains("Aarav"));
        assert!(rendered.contains("9876543210"));
        assert!(rendered.contains("Diya"));
        assert_eq!(rendered.matches('✓').count(), 1);
    }
}
