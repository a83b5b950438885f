// Update command implementation

use crate::commands::{parse_provider, parse_status, print_record};
use crate::core::AppContext;
use crate::types::CredentialDraft;
use crate::utils::{KeydeckError, Result};
use crate::Commands;
use colored::Colorize;

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Update {
        id,
        name,
        url,
        key,
        provider,
        description,
        status,
    } = command
    {
        let draft = CredentialDraft {
            name,
            endpoint_url: url,
            secret_key: key,
            provider_type: provider.as_deref().map(parse_provider).transpose()?,
            description,
            status: status.as_deref().map(parse_status).transpose()?,
        };
        do_update(ctx, &id, draft).await
    } else {
        unreachable!()
    }
}

async fn do_update(ctx: &AppContext, id_or_name: &str, draft: CredentialDraft) -> Result<()> {
    if draft == CredentialDraft::default() {
        return Err(KeydeckError::InvalidArgument(
            "Nothing to update. Use --name, --url, --key, --provider, --description or --status."
                .to_string(),
        ));
    }

    let changes = changed_fields(&draft);
    let id = ctx.store.resolve(id_or_name)?;
    let record = ctx.crud.update(&id, draft).await?;
    ctx.auto_save();

    println!(
        "{} Updated {}: {}",
        "✅".green(),
        record.name.cyan().bold(),
        changes.join(", ")
    );
    print_record(&record);

    Ok(())
}

fn changed_fields(draft: &CredentialDraft) -> Vec<&'static str> {
    [
        ("name", draft.name.is_some()),
        ("endpoint", draft.endpoint_url.is_some()),
        ("key", draft.secret_key.is_some()),
        ("provider", draft.provider_type.is_some()),
        ("description", draft.description.is_some()),
        ("status", draft.status.is_some()),
    ]
    .into_iter()
    .filter_map(|(field, changed)| changed.then_some(field))
    .collect()
}
