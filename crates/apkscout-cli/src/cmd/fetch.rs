//! Fetch command - resolve, then stream the artifact to disk.
//!
//! This is the streaming-proxy role: some catalog CDNs refuse direct
//! links without a browser UA and catalog Referer, so the bytes are
//! relayed through us instead.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tokio::fs::File;

use apkscout_core::fetch::{FetchPolicy, stream_to};

use crate::{Cli, ProfileArgs};

/// Resolve a package and download the artifact to `out`.
pub async fn fetch(cli: &Cli, package: &str, out: &Path, args: &ProfileArgs) -> Result<()> {
    let resolver = super::build_resolver(cli)?;
    let profile = args.to_profile();
    let result = resolver.resolve(package, &profile).await;

    let Some(url) = result.download_url.as_deref() else {
        if let Some(fallback) = &result.manual_fallback {
            eprintln!("No direct download found. Try searching manually:");
            for link in &fallback.links {
                eprintln!("  {:<8} {}", link.catalog, link.search_url);
            }
        }
        bail!("could not resolve a download for '{package}'");
    };

    println!(
        "Downloading {} {} ({}) ...",
        result.display_name,
        result.version.as_deref().unwrap_or("latest"),
        result.source_tag
    );

    let mut file = File::create(out)
        .await
        .with_context(|| format!("Failed to create {}", out.display()))?;
    let policy = FetchPolicy {
        referer: Some(cli.mirror_url.clone()),
        ..FetchPolicy::default()
    };
    let client = reqwest::Client::new();
    let written = stream_to(&client, url, &mut file, &policy)
        .await
        .with_context(|| format!("Download failed from {url}"))?;

    println!(
        "Saved {:.1} MB to {}",
        written as f64 / 1_048_576.0,
        out.display()
    );
    Ok(())
}
