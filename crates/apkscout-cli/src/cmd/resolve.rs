//! Resolve command

use anyhow::Result;

use apkscout_schema::ResolutionResult;

use crate::{Cli, ProfileArgs};

/// Run the pipeline for one package and print the outcome.
///
/// Ordinary upstream flakiness is not a process failure: the command
/// exits zero either way and reports the structured result.
pub async fn resolve(cli: &Cli, package: &str, args: &ProfileArgs, json: bool) -> Result<()> {
    let resolver = super::build_resolver(cli)?;
    let profile = args.to_profile();
    let result = resolver.resolve(package, &profile).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    print_human(&result);
    Ok(())
}

fn print_human(result: &ResolutionResult) {
    println!();
    if result.success {
        println!("  {} [{}]", result.display_name, result.package_id);
        if let Some(version) = &result.version {
            println!("  Version:  {version}");
        }
        if let Some(format) = result.format {
            println!("  Format:   {format}");
        }
        if let Some(api) = result.min_api_level {
            println!("  Min API:  {api}");
        }
        println!("  Source:   {}", result.source_tag);
        if result.is_older_version {
            println!("  Note:     older version selected for compatibility");
        }
        if result.can_retry_with_older {
            println!("  Note:     retry with --older if installation fails");
        }
        println!();
        println!("  {}", result.download_url.as_deref().unwrap_or_default());
    } else {
        if result.compatible == Some(false) {
            println!("  No compatible version found for {}", result.package_id);
        } else {
            println!("  No download could be confirmed for {}", result.package_id);
        }
        if let Some(fallback) = &result.manual_fallback {
            println!("  Try searching manually:");
            for link in &fallback.links {
                println!("    {:<8} {}", link.catalog, link.search_url);
            }
        }
    }
    println!();
}
