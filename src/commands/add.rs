// Add command implementation

use crate::commands::{parse_provider, print_record};
use crate::core::AppContext;
use crate::types::{CredentialDraft, CredentialStatus};
use crate::utils::Result;
use crate::Commands;
use colored::Colorize;

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Add {
        name,
        url,
        key,
        provider,
        description,
        inactive,
    } = command
    {
        let draft = CredentialDraft {
            name: Some(name),
            endpoint_url: Some(url),
            secret_key: Some(key),
            provider_type: provider.as_deref().map(parse_provider).transpose()?,
            description,
            status: inactive.then_some(CredentialStatus::Inactive),
        };
        do_add(ctx, draft).await
    } else {
        unreachable!()
    }
}

async fn do_add(ctx: &AppContext, draft: CredentialDraft) -> Result<()> {
    let record = ctx.crud.create(draft).await?;
    ctx.auto_save();

    println!("{} Added credential: {}", "✅".green(), record.name.cyan().bold());
    print_record(&record);

    Ok(())
}
