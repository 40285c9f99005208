//! Rendering of response envelopes.

use crewdeck_membership::{BulkResponse, OperationResponse};
use serde::Serialize;

use crate::app::{App, CliResult};

/// Print a response; returns whether it succeeded.
pub fn emit<T: Serialize>(
    app: &App,
    response: &OperationResponse<T>,
    render: impl FnOnce(&T),
) -> CliResult<bool> {
    if app.json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(response.success);
    }
    if response.success {
        if let Some(payload) = &response.payload {
            render(payload);
        }
        println!("{}", response.message);
    } else {
        eprintln!("Error: {}", response.message);
        if let Some(kind) = response.error_kind {
            eprintln!("       ({kind})");
        }
    }
    for warning in &response.warnings {
        eprintln!("Warning: {warning}");
    }
    Ok(response.success)
}

pub fn emit_bulk(app: &App, response: &BulkResponse) -> CliResult<bool> {
    if app.json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(response.success);
    }
    for result in &response.results {
        let mark = if result.success { "ok  " } else { "FAIL" };
        println!(
            "{mark} #{:<3} {:<16} {:<15} {}",
            result.index, result.target, result.action, result.message
        );
        for warning in &result.warnings {
            println!("          warning: {warning}");
        }
    }
    if !response.results.is_empty() {
        println!();
    }
    let line = format!(
        "{} (total {}, succeeded {}, failed {})",
        response.message,
        response.summary.total,
        response.summary.successful,
        response.summary.failed
    );
    if response.success {
        println!("{line}");
    } else {
        eprintln!("Error: {line}");
    }
    for warning in &response.warnings {
        eprintln!("Warning: {warning}");
    }
    Ok(response.success)
}
