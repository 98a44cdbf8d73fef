//! Verify command - the dashboard's URL-probe surface.

use anyhow::Result;

use apkscout_core::LinkVerifier;

/// HEAD-probe a URL and report the verdict.
pub async fn verify(url: &str, json: bool) -> Result<()> {
    let verifier = LinkVerifier::default();
    let verdict = verifier.verify(url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    println!();
    println!("  Reachable:    {}", verdict.reachable);
    if let Some(status) = verdict.status {
        println!("  Status:       {status}");
    }
    if let Some(size) = verdict.size_bytes {
        println!("  Size:         {:.1} MB", size as f64 / 1_048_576.0);
    }
    if let Some(ct) = &verdict.content_type {
        println!("  Content-Type: {ct}");
    }
    println!(
        "  Plausible:    {}",
        verdict.plausible_binary(verifier.policy().min_binary_bytes)
    );
    for warning in &verdict.warnings {
        println!("  Warning:      {warning}");
    }
    println!();
    Ok(())
}
