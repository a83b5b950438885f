// Search command implementation

use crate::core::AppContext;
use crate::utils::Result;
use crate::Commands;
use colored::Colorize;

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Search { query } = command {
        do_search(ctx, &query).await
    } else {
        unreachable!()
    }
}

async fn do_search(ctx: &AppContext, query: &str) -> Result<()> {
    let mut list = ctx.list.lock().await;
    list.search(query).await?;

    if list.total() == 0 {
        println!("No results found for '{}'", query);
        return Ok(());
    }

    println!(
        "Found {} credential(s) matching '{}':",
        list.total(),
        query.bold()
    );

    for record in list.items() {
        println!(
            "  {} {}",
            record.name.bold(),
            format!("({})", record.provider_type.display_name()).dimmed()
        );
        println!("    {}", record.endpoint_url.cyan());
        if let Some(description) = &record.description {
            println!("    {}", description);
        }
    }

    if list.total_pages() > 1 {
        println!();
        println!(
            "Showing page 1 of {}. Use 'keydeck list --search {} --page N' for more.",
            list.total_pages(),
            query
        );
    }

    Ok(())
}
