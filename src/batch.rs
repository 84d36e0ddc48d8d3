use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::{info, warn};
use rayon::prelude::*;

use crate::cluster::{HashedAsset, cluster_assets, select_survivor};
use crate::config::DedupeOptions;
use crate::fingerprint::FingerprintExtractor;
use crate::host::{Asset, AssetHost};
use crate::manifest::write_manifest;

/// Totals reported after a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DedupeReport {
    pub groups: usize,
    pub candidates: usize,
    pub deleted: usize,
}

/// Enumerate, filter, fingerprint and cluster, returning the duplicate
/// groups in enumeration order. Shared by the report-only and destructive
/// paths.
pub fn find_duplicate_groups<H: AssetHost + Sync>(
    host: &H,
    opts: &DedupeOptions,
) -> Result<Vec<Vec<Asset>>> {
    let assets = host.list_assets().context("asset enumeration failed")?;
    let total = assets.len();
    let scoped = filter_by_folder(assets, opts.folder.as_deref());
    info!("{} of {total} assets in scope", scoped.len());

    let hashed = benchmark("fingerprinting", || fingerprint_assets(host, opts, scoped));
    Ok(cluster_assets(&hashed, opts.threshold))
}

/// Run the full pipeline: enumerate, fingerprint, cluster, pick survivors,
/// persist the manifest, ask `confirm`, then delete in fixed-size batches.
///
/// `confirm` receives the candidate count and is only consulted once the
/// manifest is on disk; anything but an affirmative answer leaves the host
/// untouched.
pub fn run_dedupe<H, F>(host: &H, opts: &DedupeOptions, confirm: F) -> Result<DedupeReport>
where
    H: AssetHost + Sync,
    F: FnOnce(usize) -> Result<bool>,
{
    let groups = find_duplicate_groups(host, opts)?;
    let mut report = DedupeReport {
        groups: groups.len(),
        ..DedupeReport::default()
    };
    info!("{} similarity group(s)", report.groups);

    let mut doomed = Vec::new();
    for group in groups {
        let (keep, remove) = select_survivor(group);
        info!("keeping {} over {} duplicate(s)", keep.public_id, remove.len());
        doomed.extend(remove.into_iter().map(|a| a.public_id));
    }
    report.candidates = doomed.len();

    if doomed.is_empty() {
        info!("nothing to delete");
        return Ok(report);
    }

    // On disk before the prompt and before any deletion call; the manifest
    // is the sole recovery artifact if the batch goes wrong.
    write_manifest(&opts.manifest_path, &doomed)?;
    info!(
        "wrote {} candidate id(s) to {}",
        doomed.len(),
        opts.manifest_path.display()
    );

    if !confirm(doomed.len())? {
        info!("aborted; nothing deleted");
        return Ok(report);
    }

    report.deleted = delete_in_batches(host, &doomed, opts.batch_size)?;
    Ok(report)
}

/// Delete `public_ids` in fixed-size calls, counting only identifiers the
/// host explicitly reports as deleted. Anything else stays where it is and
/// is not retried.
pub fn delete_in_batches<H: AssetHost>(
    host: &H,
    public_ids: &[String],
    batch_size: usize,
) -> Result<usize> {
    let bar = ProgressBar::new(public_ids.len() as u64);
    let mut deleted = 0;

    for chunk in public_ids.chunks(batch_size) {
        let statuses = host.delete_assets(chunk)?;
        deleted += chunk
            .iter()
            .filter(|id| statuses.get(id.as_str()).map(String::as_str) == Some("deleted"))
            .count();
        bar.inc(chunk.len() as u64);
    }

    bar.finish();
    info!("deleted {deleted}/{} asset(s)", public_ids.len());
    Ok(deleted)
}

/// Pure prefix filter over the host's container path.
fn filter_by_folder(assets: Vec<Asset>, prefix: Option<&str>) -> Vec<Asset> {
    match prefix {
        Some(prefix) => assets
            .into_iter()
            .filter(|a| a.folder.as_deref().is_some_and(|f| f.starts_with(prefix)))
            .collect(),
        None => assets,
    }
}

/// Fingerprint every asset on the rayon pool. Indexed collect keeps the
/// results in enumeration order, which clustering depends on; a failed
/// fetch or decode is isolated to its own asset.
fn fingerprint_assets<H: AssetHost + Sync>(
    host: &H,
    opts: &DedupeOptions,
    assets: Vec<Asset>,
) -> Vec<HashedAsset> {
    let extractor = FingerprintExtractor::new(opts.hash_size);
    let bar = ProgressBar::new(assets.len() as u64);

    let hashed: Vec<HashedAsset> = assets
        .into_par_iter()
        .map(|asset| {
            let fingerprint = match host
                .fetch_thumbnail(&asset)
                .and_then(|bytes| extractor.fingerprint_bytes(&bytes))
            {
                Ok(fp) => Some(fp),
                Err(err) => {
                    warn!("no fingerprint for {}: {err:#}", asset.public_id);
                    None
                }
            };
            bar.inc(1);
            HashedAsset { asset, fingerprint }
        })
        .collect();

    bar.finish();
    hashed
}

/// Run `f()`, log how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    info!("{label} took {:.2?}", start.elapsed());
    result
}
