//! apkscout - best-effort APK download-link resolver
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Given an Android package identifier and optional device capability
//! hints, apkscout resolves a single downloadable APK/XAPK URL from a
//! pair of third-party catalogs, with manual-override precedence and a
//! deterministic search-page fallback when nothing can be confirmed.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.apkscout/
//! └── overrides.db    # SQLite override store + resolution log
//! ```

pub mod cmd;
pub mod paths;
pub mod store;

pub use store::SqliteOverrideStore;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use apkscout_schema::{DeviceProfile, RawProfile};

#[derive(Debug, Parser)]
#[command(name = "apkscout")]
#[command(author, version, about = "apkscout - best-effort APK download-link resolver")]
pub struct Cli {
    /// Mirror-style catalog base URL
    #[arg(long, global = true, env = "APKSCOUT_MIRROR_URL", default_value = "https://apkpure.com")]
    pub mirror_url: String,

    /// Mirror-style catalog download CDN base URL
    #[arg(
        long,
        global = true,
        env = "APKSCOUT_MIRROR_DL_URL",
        default_value = "https://d.apkpure.com"
    )]
    pub mirror_dl_url: String,

    /// Listing-style catalog base URL
    #[arg(
        long,
        global = true,
        env = "APKSCOUT_LISTING_URL",
        default_value = "https://www.apkmonk.com"
    )]
    pub listing_url: String,

    /// Listing-style catalog download CDN prefix
    #[arg(
        long,
        global = true,
        env = "APKSCOUT_LISTING_CDN",
        default_value = "https://dl.apkmonk.com"
    )]
    pub listing_cdn: String,

    /// Curated known-versions TOML table (last-resort catalog)
    #[arg(long, global = true, env = "APKSCOUT_KNOWN_VERSIONS")]
    pub known_versions: Option<PathBuf>,

    /// Override-store SQLite database (default ~/.apkscout/overrides.db)
    #[arg(long, global = true, env = "APKSCOUT_OVERRIDES_DB")]
    pub overrides_db: Option<PathBuf>,

    /// Static app-metadata JSON file
    #[arg(long, global = true, env = "APKSCOUT_METADATA_JSON")]
    pub metadata_json: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve a download URL for a package
    Resolve {
        /// Package identifier (reverse-DNS, e.g. com.example.app)
        package: String,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Emit the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List and rank candidate versions across catalogs
    Versions {
        /// Package identifier
        package: String,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Emit candidates as JSON
        #[arg(long)]
        json: bool,
    },
    /// Probe a URL and report whether it looks like a real binary
    Verify {
        /// URL to probe
        url: String,
        /// Emit the verdict as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a package and stream the artifact to disk
    Fetch {
        /// Package identifier
        package: String,
        /// Output file
        #[arg(long, short)]
        out: PathBuf,
        #[command(flatten)]
        profile: ProfileArgs,
    },
}

/// Device capability hints, shared by the profile-aware subcommands.
/// Every field is optional free text; unusable values normalize to
/// "unknown" rather than erroring.
#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Device API level (e.g. 30)
    #[arg(long)]
    pub api_level: Option<String>,

    /// Android version label (e.g. 11, 8.0, 12L); --api-level wins
    #[arg(long)]
    pub android: Option<String>,

    /// Device ABI (e.g. arm64-v8a, aarch64)
    #[arg(long)]
    pub abi: Option<String>,

    /// Screen density bucket (e.g. xxhdpi)
    #[arg(long)]
    pub dpi: Option<String>,

    /// Device model, for override targeting
    #[arg(long)]
    pub model: Option<String>,

    /// Device manufacturer, for override targeting
    #[arg(long)]
    pub manufacturer: Option<String>,

    /// Prefer an older, more compatible version
    #[arg(long)]
    pub older: bool,
}

impl ProfileArgs {
    /// Normalize the raw flags into a [`DeviceProfile`].
    pub fn to_profile(&self) -> DeviceProfile {
        RawProfile {
            api_level: self.api_level.clone(),
            android_version: self.android.clone(),
            abi: self.abi.clone(),
            dpi: self.dpi.clone(),
            model: self.model.clone(),
            manufacturer: self.manufacturer.clone(),
            older: self.older,
        }
        .parse()
    }
}
