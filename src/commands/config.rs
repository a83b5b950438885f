// Config command implementation

use crate::core::AppContext;
use crate::utils::Result;
use crate::Commands;
use colored::Colorize;

pub async fn execute(ctx: &mut AppContext, command: Commands) -> Result<()> {
    if let Commands::Config { key, value } = command {
        do_config(ctx, key.as_deref(), value.as_deref())
    } else {
        unreachable!()
    }
}

fn do_config(ctx: &mut AppContext, key: Option<&str>, value: Option<&str>) -> Result<()> {
    match (key, value) {
        (Some(k), Some(v)) => {
            let mut settings = ctx.settings.clone();
            settings.set(k, v)?;
            ctx.save_settings(settings)?;
            println!("{} Set config: {} = {}", "✅".green(), k.bold(), v);
        }
        (Some("show"), None) | (None, None) => show_all_config(ctx),
        (Some(k), None) => match ctx.settings.entries().into_iter().find(|(name, _)| *name == k) {
            Some((name, v)) => println!("{} = {}", name, v),
            None => println!("Unknown setting '{}'", k),
        },
        (None, Some(_)) => {
            println!(
                "{} Cannot set a value without a key. Usage: keydeck config <key> <value>",
                "❌".red()
            );
        }
    }

    Ok(())
}

fn show_all_config(ctx: &AppContext) {
    println!("{}", "Configuration".bold().underline());
    for (k, v) in ctx.settings.entries() {
        println!("  {} = {}", k, v);
    }
    println!();
    println!("  {} = {}", "database".dimmed(), ctx.config.db_path.display());
    println!(
        "  {} = {}s",
        "httpTimeout".dimmed(),
        ctx.config.http_timeout.as_secs()
    );
}
