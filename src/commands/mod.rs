// CLI command modules

pub mod add;
pub mod backup;
pub mod config;
pub mod delete;
pub mod export;
pub mod import;
pub mod list;
pub mod search;
pub mod stats;
pub mod test_cmd;
pub mod update;
pub mod watch;

use crate::types::{CredentialRecord, CredentialStatus, ProviderType};
use crate::utils::{KeydeckError, Result};
use colored::Colorize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Truncate string by display width, handling Unicode properly
pub(crate) fn truncate_string(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }

    let target_width = max_width.saturating_sub(3);
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > target_width {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }

    result.push_str("...");
    result
}

/// Pad string to target display width
pub(crate) fn pad_string(s: &str, target_width: usize) -> String {
    let current_width = UnicodeWidthStr::width(s);
    if current_width >= target_width {
        return s.to_string();
    }
    format!("{}{}", s, " ".repeat(target_width - current_width))
}

pub(crate) fn parse_status(raw: &str) -> Result<CredentialStatus> {
    CredentialStatus::parse(raw)
        .ok_or_else(|| KeydeckError::validation("status", "expected active or inactive"))
}

pub(crate) fn parse_provider(raw: &str) -> Result<ProviderType> {
    if raw.trim().is_empty() {
        return Err(KeydeckError::validation("providerType", "must not be empty"));
    }
    Ok(ProviderType::from(raw.trim()))
}

pub(crate) fn status_label(status: CredentialStatus) -> String {
    match status {
        CredentialStatus::Active => "active".green().to_string(),
        CredentialStatus::Inactive => "inactive".dimmed().to_string(),
    }
}

/// Multi-line detail view; the secret is always masked
pub(crate) fn print_record(record: &CredentialRecord) {
    println!("  {} {}", record.name.bold(), format!("({})", record.id).dimmed());
    println!("    Endpoint: {}", record.endpoint_url.cyan());
    println!("    Key: {}", record.masked_secret());
    println!("    Provider: {}", record.provider_type.display_name());
    println!("    Status: {}", status_label(record.status));
    if let Some(description) = &record.description {
        println!("    Description: {}", description);
    }
    println!("    Created: {}", record.created_at.dimmed());
    if let Some(updated) = &record.updated_at {
        println!("    Updated: {}", updated.dimmed());
    }
    if let Some(tested) = &record.last_tested_at {
        println!("    Last tested: {} ({} test(s))", tested.dimmed(), record.test_count);
    }
}
