use std::path::Path;

use crewdeck_membership::BulkRequest;

use crate::app::{App, CliResult};
use crate::output::emit_bulk;

/// Run a bulk request file; `--dry-run` forces validation only.
pub async fn cmd_bulk_run(app: &App, file: &Path, dry_run: bool) -> CliResult<bool> {
    let raw = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let mut request: BulkRequest = serde_json::from_str(&raw)?;
    request.dry_run |= dry_run;
    let response = app.service.execute_bulk(request).await;
    emit_bulk(app, &response)
}
