// Export command implementation

use crate::core::AppContext;
use crate::utils::Result;
use crate::Commands;
use colored::Colorize;
use std::path::PathBuf;

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Export { output } = command {
        let dir = output.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        do_export(ctx, dir)
    } else {
        unreachable!()
    }
}

fn do_export(ctx: &AppContext, dir: PathBuf) -> Result<()> {
    let count = ctx.store.len()?;
    let path = ctx.backups.export_to_file(&dir)?;

    println!(
        "{} Exported {} credential(s) to {}",
        "✅".green(),
        count,
        path.display().to_string().bold()
    );
    println!(
        "   {}",
        "Credentials stay encrypted inside the bundle; keep the file private.".dimmed()
    );
    Ok(())
}
