// Delete command implementation

use crate::core::AppContext;
use crate::utils::Result;
use crate::Commands;
use colored::Colorize;
use dialoguer::Confirm;

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Delete { ids, force } = command {
        do_delete(ctx, &ids, force).await
    } else {
        unreachable!()
    }
}

async fn do_delete(ctx: &AppContext, targets: &[String], force: bool) -> Result<()> {
    // Resolve everything up front so nothing is removed when one target is unknown
    let mut ids = Vec::with_capacity(targets.len());
    for target in targets {
        let id = ctx.store.resolve(target)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let records = ids
        .iter()
        .map(|id| ctx.store.get(id))
        .collect::<Result<Vec<_>>>()?;

    if !force {
        if records.len() == 1 {
            println!("About to delete '{}'", records[0].name.bold());
        } else {
            println!(
                "{} WARNING: This will delete {} credentials:",
                "⚠️".yellow(),
                records.len()
            );
            for record in records.iter().take(10) {
                println!("   - {} ({})", record.name, record.endpoint_url);
            }
            if records.len() > 10 {
                println!("   ... and {} more", records.len() - 10);
            }
        }

        let confirmed = Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Delete cancelled.");
            return Ok(());
        }
    }

    if ids.len() == 1 {
        let deleted = ctx.crud.delete(&ids[0]).await?;
        println!("{} Deleted credential: {}", "✅".green(), deleted.name.bold());
    } else {
        let deleted = ctx.crud.batch_delete(&ids).await?;
        for item in &deleted {
            println!("{} Deleted: {}", "✅".green(), item.name);
        }
        println!();
        println!("{} Batch delete completed: {} credential(s)", "✅".green(), deleted.len());
    }

    ctx.auto_save();
    Ok(())
}
