//! Checksum command: compute SHA-256 of a file.

use anyhow::{Context, Result};
use filesage_core::digest;
use std::path::Path;

/// Compute and print SHA-256 of the given file.
pub async fn run_checksum(path: &Path) -> Result<i32> {
    let owned = path.to_path_buf();
    let digest = tokio::task::spawn_blocking(move || digest::sha256_path(&owned))
        .await
        .context("checksum task join")??;
    println!("{}  {}", digest, path.display());
    Ok(0)
}
