// Backup command implementation

use crate::core::AppContext;
use crate::utils::Result;
use crate::{BackupAction, Commands};
use colored::Colorize;
use dialoguer::Confirm;

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Backup { action } = command {
        match action {
            BackupAction::Create => create(ctx),
            BackupAction::List => list(ctx),
            BackupAction::Restore { backup, force } => restore(ctx, &backup, force).await,
            BackupAction::Clean => clean(ctx),
        }
    } else {
        unreachable!()
    }
}

fn create(ctx: &AppContext) -> Result<()> {
    let snapshot = ctx.backups.backup()?;
    println!(
        "{} Backup created ({} key(s), version {})",
        "✅".green(),
        snapshot.data.len(),
        snapshot.version
    );
    Ok(())
}

fn list(ctx: &AppContext) -> Result<()> {
    let keys = ctx.backups.list_backups()?;
    if keys.is_empty() {
        println!("No backups found.");
        return Ok(());
    }

    println!("{}", "Backups".bold().underline());
    for key in keys.iter().rev() {
        match ctx.backups.load_backup(key) {
            Ok(snapshot) => println!(
                "  {}  {} key(s)  {}",
                key.bold(),
                snapshot.data.len(),
                snapshot.timestamp.dimmed()
            ),
            Err(e) => println!("  {}  {}", key.bold(), format!("unreadable: {}", e).red()),
        }
    }
    println!();
    println!("  Keeping at most {} backup(s).", ctx.backups.max_backups());
    Ok(())
}

async fn restore(ctx: &AppContext, backup: &str, force: bool) -> Result<()> {
    let snapshot = ctx.backups.load_backup(backup)?;

    if !force {
        println!(
            "{} Restoring overwrites the current data with the backup taken {}.",
            "⚠️".yellow(),
            snapshot.timestamp
        );
        let confirmed = Confirm::new()
            .with_prompt("Continue?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Restore cancelled.");
            return Ok(());
        }
    }

    let written = ctx.backups.restore(&snapshot)?;
    let report = ctx.store.load()?;
    if let Some(warning) = report.warning {
        println!("{} {}", "⚠️".yellow(), warning);
    }

    println!(
        "{} Restored {} key(s); {} credential(s) loaded",
        "✅".green(),
        written,
        report.count
    );
    Ok(())
}

fn clean(ctx: &AppContext) -> Result<()> {
    let removed = ctx.backups.clean_old_backups()?;
    if removed.is_empty() {
        println!("Nothing to clean (limit {}).", ctx.backups.max_backups());
    } else {
        for key in &removed {
            println!("  Removed {}", key);
        }
        println!("{} Removed {} old backup(s)", "✅".green(), removed.len());
    }
    Ok(())
}
