// Import command implementation

use crate::backup::ExportBundle;
use crate::core::AppContext;
use crate::utils::{KeydeckError, Result};
use crate::Commands;
use colored::Colorize;
use dialoguer::Confirm;
use std::fs;
use std::path::Path;

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Import { file, force } = command {
        do_import(ctx, Path::new(&file), force)
    } else {
        unreachable!()
    }
}

fn do_import(ctx: &AppContext, path: &Path, force: bool) -> Result<()> {
    if !path.exists() {
        return Err(KeydeckError::InvalidArgument(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)?;
    let bundle = ExportBundle::from_json(&raw)?;

    println!(
        "📄 Bundle version {} exported {} ({} key(s))",
        if bundle.version.is_empty() { "?" } else { &bundle.version },
        if bundle.export_date.is_empty() { "?" } else { &bundle.export_date },
        bundle.data.len()
    );

    if !force {
        let confirmed = Confirm::new()
            .with_prompt("Importing replaces the current data. Continue?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Import cancelled.");
            return Ok(());
        }
    }

    let written = ctx.backups.import(&bundle)?;
    let report = ctx.store.load()?;
    if let Some(warning) = report.warning {
        println!("{} {}", "⚠️".yellow(), warning);
    }

    println!(
        "{} Imported {} key(s); {} credential(s) loaded",
        "✅".green(),
        written,
        report.count
    );
    Ok(())
}
