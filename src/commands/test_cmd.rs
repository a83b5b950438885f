// Test command implementation

use crate::core::AppContext;
use crate::types::{TestOutcome, TestRequest};
use crate::utils::Result;
use crate::Commands;
use colored::Colorize;

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Test {
        id,
        message,
        model,
        temperature,
        max_tokens,
        raw,
    } = command
    {
        let request = TestRequest {
            message,
            model,
            temperature,
            max_tokens,
        };
        do_test(ctx, &id, &request, raw).await
    } else {
        unreachable!()
    }
}

async fn do_test(ctx: &AppContext, id_or_name: &str, request: &TestRequest, raw: bool) -> Result<()> {
    let id = ctx.store.resolve(id_or_name)?;
    let record = ctx.store.get(&id)?;

    println!(
        "🔌 Testing {} ({}) with model {}...",
        record.name.bold(),
        record.endpoint_url.cyan(),
        request.model
    );

    let outcome = ctx.crud.test(&id, request).await?;
    ctx.auto_save();

    print_outcome(&outcome);
    if raw {
        println!();
        println!("{}", serde_json::to_string_pretty(&outcome.response)?);
    }

    Ok(())
}

fn print_outcome(outcome: &TestOutcome) {
    if outcome.unexpected_format {
        println!(
            "{} Request succeeded but the response has no choices (unexpected format). Use --raw to inspect it.",
            "⚠️".yellow()
        );
        return;
    }

    println!("{} Test succeeded", "✅".green());
    match &outcome.content {
        Some(content) => println!("  Reply: {}", content),
        None => println!("  Reply: {}", "<empty>".dimmed()),
    }
    if let Some(usage) = &outcome.usage {
        let show = |n: Option<u64>| n.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  Tokens: prompt {}, completion {}, total {}",
            show(usage.prompt_tokens),
            show(usage.completion_tokens),
            show(usage.total_tokens)
        );
    }
}
