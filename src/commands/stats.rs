// Stats command implementation

use crate::core::AppContext;
use crate::state::list::{recent_activities, RECENT_ACTIVITY_LIMIT};
use crate::utils::Result;
use crate::Commands;
use colored::Colorize;
use std::fs;

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Stats { verbose } = command {
        do_stats(ctx, verbose)
    } else {
        unreachable!()
    }
}

fn do_stats(ctx: &AppContext, verbose: bool) -> Result<()> {
    let stats = ctx.store.stats()?;

    println!("{}", "Statistics".bold().underline());
    println!();
    println!("  Total credentials: {}", stats.total);
    println!("  Active: {}", stats.active.to_string().green());
    println!("  Inactive: {}", stats.inactive.to_string().dimmed());
    println!("  Total tests: {}", stats.total_tests);

    let activities = recent_activities(&ctx.store.records()?, RECENT_ACTIVITY_LIMIT);
    if !activities.is_empty() {
        println!();
        println!("{}", "Recent activity".bold().underline());
        for activity in activities {
            println!("  {} {}", activity.tested_at.dimmed(), activity.content);
        }
    }

    if verbose {
        println!();
        println!("{}", "Storage".bold().underline());
        println!("  Managed data: {}", format_file_size(ctx.backups.storage_size()? as u64));
        println!(
            "  Backups: {} (keeping at most {})",
            ctx.backups.list_backups()?.len(),
            ctx.backups.max_backups()
        );

        let db_path = &ctx.config.db_path;
        println!("  Location: {}", db_path.display());
        if let Ok(metadata) = fs::metadata(db_path) {
            println!("  Database size: {}", format_file_size(metadata.len()));
        }

        // Check for WAL file
        let wal_path = db_path.with_extension("db-wal");
        if let Ok(metadata) = fs::metadata(&wal_path) {
            println!(
                "  WAL file: {} ({})",
                wal_path.display(),
                format_file_size(metadata.len())
            );
        }
    }

    Ok(())
}

/// Format file size in human-readable format
fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
