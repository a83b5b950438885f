// Watch command implementation
// Reloads the store on the sync interval until Ctrl-C

use crate::core::AppContext;
use crate::state::sync::SyncScheduler;
use crate::utils::Result;
use crate::Commands;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Watch { interval } = command {
        do_watch(ctx, interval).await
    } else {
        unreachable!()
    }
}

async fn do_watch(ctx: &AppContext, interval: Option<u64>) -> Result<()> {
    let mut settings = ctx.settings.clone();
    if let Some(secs) = interval.filter(|s| *s > 0) {
        settings.sync_enabled = true;
        settings.sync_interval_secs = secs;
    }

    if !settings.sync_enabled {
        println!(
            "Sync is disabled. Enable it with 'keydeck config syncEnabled true' or pass --interval."
        );
        return Ok(());
    }

    let store = Arc::clone(&ctx.store);
    let list = Arc::clone(&ctx.list);
    let tick = move || {
        let store = Arc::clone(&store);
        let list = Arc::clone(&list);
        async move {
            match store.load() {
                Ok(report) => {
                    if let Some(warning) = report.warning {
                        eprintln!("{} {}", "Warning:".yellow(), warning);
                    }
                    if let Err(e) = list.lock().await.refresh().await {
                        log::warn!("List refresh during sync failed: {}", e);
                    }
                    let stamp = chrono::Local::now().format("%H:%M:%S");
                    println!("[{}] synced {} credential(s)", stamp, report.count);
                }
                Err(e) => log::error!("Sync failed: {}", e),
            }
        }
    };

    let mut scheduler = SyncScheduler::new();
    scheduler.apply(&settings, tick);
    println!(
        "👀 Syncing every {}s. Press Ctrl-C to stop.",
        scheduler.interval().unwrap_or(Duration::ZERO).as_secs()
    );

    tokio::signal::ctrl_c().await?;
    scheduler.stop();
    println!();
    println!("Stopped.");

    Ok(())
}
