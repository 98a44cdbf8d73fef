//! Versions command - ranked candidate dump, for debugging catalogs.

use anyhow::Result;
use serde_json::json;

use apkscout_schema::{ScoreWeights, rank_candidates};

use crate::{Cli, ProfileArgs};

/// List every candidate the catalogs can see for a package, with its
/// compatibility score against the given profile.
pub async fn versions(cli: &Cli, package: &str, args: &ProfileArgs, json_out: bool) -> Result<()> {
    let catalogs = super::build_catalogs(cli)?;
    let profile = args.to_profile();
    let weights = ScoreWeights::default();

    let mut rows = Vec::new();
    for catalog in &catalogs {
        let Some(page) = catalog.find_app_page(package, None).await else {
            continue;
        };
        let candidates = catalog.list_versions(&page).await;
        let ranked = rank_candidates(candidates, &profile, &weights);
        for (candidate, score) in ranked.entries {
            rows.push((catalog.key(), candidate, score));
        }
    }

    if json_out {
        let entries: Vec<_> = rows
            .iter()
            .map(|(catalog, candidate, score)| {
                json!({ "catalog": catalog, "score": score, "candidate": candidate })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!("  No candidates found for '{package}'");
        println!();
        return Ok(());
    }

    println!();
    for (catalog, candidate, score) in &rows {
        let abi = candidate.abi.map_or("-", |a| a.as_str());
        let api = candidate
            .min_api_level
            .map_or_else(|| "-".to_string(), |a| a.to_string());
        println!(
            "  {:<8} {:>6}  {:<14} {:<6} api>={:<4} {:<12} {}",
            catalog,
            score,
            candidate.version,
            candidate.format,
            api,
            abi,
            candidate.download_url
        );
    }
    println!();
    println!("  {} candidate(s)", rows.len());
    Ok(())
}
