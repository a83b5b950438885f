// List command implementation

use crate::commands::{pad_string, print_record, status_label, truncate_string};
use crate::core::AppContext;
use crate::types::CredentialRecord;
use crate::utils::Result;
use crate::Commands;
use colored::Colorize;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

/// Output format for list command
#[derive(Debug, Clone, Copy, PartialEq)]
enum ListFormat {
    Table,
    Json,
    Verbose,
}

pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::List {
        page,
        page_size,
        search,
        json,
        verbose,
    } = command
    {
        let format = if json {
            ListFormat::Json
        } else if verbose {
            ListFormat::Verbose
        } else {
            ListFormat::Table
        };

        do_list(ctx, page, page_size, search.as_deref().unwrap_or(""), format).await
    } else {
        unreachable!()
    }
}

async fn do_list(
    ctx: &AppContext,
    page: usize,
    page_size: usize,
    search: &str,
    format: ListFormat,
) -> Result<()> {
    let mut list = ctx.list.lock().await;
    if !search.is_empty() {
        list.search(search).await?;
    }
    list.set_page_size(page_size).await?;
    if page > 1 {
        list.set_page(page).await?;
    }

    if format == ListFormat::Json {
        return list_json(list.items(), list.total(), list.current_page(), list.page_size());
    }

    if list.items().is_empty() {
        if list.total() > 0 {
            println!(
                "Page {} is empty ({} credential(s), {} page(s)).",
                list.current_page(),
                list.total(),
                list.total_pages()
            );
        } else if search.is_empty() {
            println!("No credentials found.");
        } else {
            println!("No credentials match '{}'.", search);
        }
        return Ok(());
    }

    match format {
        ListFormat::Verbose => list_verbose(list.items()),
        _ => list_table(list.items()),
    }

    println!(
        "{}",
        format!(
            "Page {}/{} - {} credential(s)",
            list.current_page(),
            list.total_pages(),
            list.total()
        )
        .dimmed()
    );
    Ok(())
}

/// JSON format output; secrets are never printed
fn list_json(items: &[CredentialRecord], total: usize, page: usize, page_size: usize) -> Result<()> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct JsonEntry<'a> {
        id: &'a str,
        name: &'a str,
        endpoint_url: &'a str,
        provider_type: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<&'a str>,
        status: String,
        created_at: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        updated_at: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_tested_at: Option<&'a str>,
        test_count: u64,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct JsonPage<'a> {
        items: Vec<JsonEntry<'a>>,
        total: usize,
        page: usize,
        page_size: usize,
    }

    let output = JsonPage {
        items: items
            .iter()
            .map(|r| JsonEntry {
                id: &r.id,
                name: &r.name,
                endpoint_url: &r.endpoint_url,
                provider_type: r.provider_type.as_str(),
                description: r.description.as_deref(),
                status: r.status.to_string(),
                created_at: &r.created_at,
                updated_at: r.updated_at.as_deref(),
                last_tested_at: r.last_tested_at.as_deref(),
                test_count: r.test_count,
            })
            .collect(),
        total,
        page,
        page_size,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn list_verbose(items: &[CredentialRecord]) {
    println!("{}", "Credentials:".bold().underline());
    println!();
    for record in items {
        print_record(record);
        println!();
    }
}

/// Table format - ASCII bordered table (default)
fn list_table(items: &[CredentialRecord]) {
    let headers = ["Name", "Endpoint", "Provider", "Status", "Tests"];
    let limits = [24, 40, 20, 8, 6];

    let rows: Vec<[String; 5]> = items
        .iter()
        .map(|r| {
            [
                r.name.clone(),
                r.endpoint_url.clone(),
                r.provider_type.display_name().to_string(),
                r.status.to_string(),
                r.test_count.to_string(),
            ]
        })
        .collect();

    let mut widths = headers.map(|h| h.width());
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(UnicodeWidthStr::width(cell.as_str()));
        }
    }
    for (width, limit) in widths.iter_mut().zip(limits) {
        *width = (*width).min(limit);
    }

    let line = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}", left, segments.join(mid), right)
    };

    println!("{}", line("┌", "┬", "┐"));
    let header_cells: Vec<String> = headers
        .iter()
        .zip(widths)
        .map(|(h, w)| pad_string(h, w).bold().to_string())
        .collect();
    println!("│ {} │", header_cells.join(" │ "));
    println!("{}", line("├", "┼", "┤"));

    for (row, record) in rows.iter().zip(items) {
        let cells: Vec<String> = row
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                let text = pad_string(&truncate_string(cell, w), w);
                // Status column is colored after padding so escapes don't count
                if i == 3 {
                    text.replace(&record.status.to_string(), &status_label(record.status))
                } else {
                    text
                }
            })
            .collect();
        println!("│ {} │", cells.join(" │ "));
    }

    println!("{}", line("└", "┴", "┘"));
}
