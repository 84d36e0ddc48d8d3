use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Persist the ordered list of removal candidates as a JSON array.
///
/// This happens before the confirmation prompt and before any deletion
/// call; the file is the sole artifact for manual audit and recovery.
pub fn write_manifest(path: &Path, public_ids: &[String]) -> Result<()> {
    let json = serde_json::to_string_pretty(public_ids).context("failed to encode manifest")?;
    fs::write(path, json).with_context(|| format!("failed to write manifest {}", path.display()))
}
