use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Credentials for the asset host. Opaque to the rest of the tool; every
/// API call carries them as HTTP basic auth.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl HostConfig {
    /// Read credentials from the standard Cloudinary environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                .context("CLOUDINARY_CLOUD_NAME not set")?,
            api_key: env::var("CLOUDINARY_API_KEY").context("CLOUDINARY_API_KEY not set")?,
            api_secret: env::var("CLOUDINARY_API_SECRET")
                .context("CLOUDINARY_API_SECRET not set")?,
        })
    }
}

/// Tunables for one dedupe run.
#[derive(Debug, Clone)]
pub struct DedupeOptions {
    /// Maximum Hamming distance (in bits) for two images to count as
    /// duplicates of the same group seed.
    pub threshold: u32,
    /// Side length of the hash grid; 16 yields 256-bit fingerprints.
    pub hash_size: u32,
    /// Square thumbnail dimension requested from the host for hashing.
    pub thumb_size: u32,
    /// Per-request network timeout.
    pub timeout: Duration,
    /// Assets per enumeration page.
    pub page_size: u32,
    /// Identifiers per deletion call.
    pub batch_size: usize,
    /// Only analyze assets whose folder starts with this prefix.
    pub folder: Option<String>,
    /// Where the pre-deletion manifest is written.
    pub manifest_path: PathBuf,
}

impl Default for DedupeOptions {
    fn default() -> Self {
        Self {
            threshold: 12,
            hash_size: 16,
            thumb_size: 128,
            timeout: Duration::from_secs(10),
            page_size: 500,
            batch_size: 100,
            folder: None,
            manifest_path: PathBuf::from("dedupe-manifest.json"),
        }
    }
}
