use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;

use cloudcull::batch;
use cloudcull::cluster::select_survivor;
use cloudcull::config::{DedupeOptions, HostConfig};
use cloudcull::host::CloudinaryHost;

#[derive(Parser, Debug)]
#[command(
    name = "cloudcull",
    version,
    about = "CLI for culling visually duplicate images from a hosted media library"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find and list duplicate groups without touching anything
    Scan {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Delete every duplicate except the oldest copy in each group
    Prune {
        #[command(flatten)]
        run: RunArgs,

        /// Identifiers per deletion call
        #[arg(long, default_value_t = 100)]
        batch_size: usize,

        /// Where to write the pre-deletion manifest
        #[arg(long, value_name = "FILE", default_value = "dedupe-manifest.json")]
        manifest: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Only analyze assets whose folder starts with this prefix
    #[arg(short, long, value_name = "PREFIX")]
    folder: Option<String>,

    /// Maximum Hamming distance (in bits) for two images to be duplicates
    #[arg(long, default_value_t = 12)]
    threshold: u32,

    /// Side length of the hash grid (16 yields 256-bit fingerprints)
    #[arg(long, default_value_t = 16)]
    hash_size: u32,

    /// Square thumbnail size requested from the host for hashing
    #[arg(long, default_value_t = 128)]
    thumb_size: u32,

    /// Per-request network timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Assets per enumeration page
    #[arg(long, default_value_t = 500)]
    page_size: u32,
}

impl RunArgs {
    fn into_options(self, batch_size: usize, manifest: PathBuf) -> DedupeOptions {
        DedupeOptions {
            threshold: self.threshold,
            hash_size: self.hash_size,
            thumb_size: self.thumb_size,
            timeout: Duration::from_secs(self.timeout),
            page_size: self.page_size,
            batch_size,
            folder: self.folder,
            manifest_path: manifest,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { run } => {
            let opts = run.into_options(100, PathBuf::new());
            let host = CloudinaryHost::new(HostConfig::from_env()?, &opts)?;

            println!("▶ Scanning for duplicates…");
            let groups = batch::find_duplicate_groups(&host, &opts)?;
            if groups.is_empty() {
                println!("No duplicates found.");
                return Ok(());
            }

            println!("Found {} duplicate group(s):", groups.len());
            for (i, group) in groups.into_iter().enumerate() {
                let (keep, remove) = select_survivor(group);
                println!("\n✨ Group {}:", i + 1);
                println!("   🏆 Keeping → {}", keep.public_id);
                for dup in remove {
                    println!("   🗑️  Duplicate → {}", dup.public_id);
                }
            }
        }

        Commands::Prune {
            run,
            batch_size,
            manifest,
        } => {
            let opts = run.into_options(batch_size, manifest);
            let host = CloudinaryHost::new(HostConfig::from_env()?, &opts)?;

            println!("▶ Pruning duplicates…");
            let report = batch::run_dedupe(&host, &opts, |count| {
                Confirm::new()
                    .with_prompt(format!("Delete {count} duplicate image(s) from the host?"))
                    .default(false)
                    .interact()
                    .map_err(anyhow::Error::from)
            })?;

            println!(
                "\n✅ {} group(s), {} removal candidate(s), {} deleted.",
                report.groups, report.candidates, report.deleted
            );
        }
    }

    Ok(())
}
