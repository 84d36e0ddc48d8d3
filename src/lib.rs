pub mod batch;
pub mod cluster;
pub mod config;
pub mod fingerprint;
pub mod host;
pub mod manifest;

pub use batch::{DedupeReport, run_dedupe};
pub use config::{DedupeOptions, HostConfig};
pub use host::{Asset, AssetHost, CloudinaryHost};
