//! Header-only link verification.
//!
//! A candidate URL is trusted only after a HEAD probe says it serves
//! something binary-shaped and big enough not to be a placeholder or
//! error page. The verifier never returns an error: an unreachable URL
//! yields a verdict with `reachable = false` and a warning.

use std::time::Duration;

use reqwest::{Client, header, redirect::Policy};

use apkscout_schema::VerifyVerdict;

/// Tunable verification thresholds and probe limits.
#[derive(Debug, Clone, Copy)]
pub struct VerifyPolicy {
    /// Generic "plausible binary" size floor.
    pub min_binary_bytes: u64,
    /// Stricter floor for telling a real APK from a catalog's
    /// placeholder page.
    pub min_apk_bytes: u64,
    /// Overall probe timeout.
    pub timeout: Duration,
    /// Redirect hops to follow.
    pub max_redirects: usize,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            min_binary_bytes: 1024 * 1024,
            min_apk_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_secs(15),
            max_redirects: 5,
        }
    }
}

/// Issues metadata-only probes against candidate URLs.
#[derive(Debug)]
pub struct LinkVerifier {
    client: Client,
    policy: VerifyPolicy,
}

impl LinkVerifier {
    /// Build a verifier with the given policy.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be constructed (TLS backend
    /// initialization failure).
    pub fn new(policy: VerifyPolicy) -> Self {
        let client = Client::builder()
            .timeout(policy.timeout)
            .redirect(Policy::limited(policy.max_redirects))
            .user_agent(crate::BROWSER_USER_AGENT)
            .build()
            .expect("HTTP client construction failed");
        Self { client, policy }
    }

    /// The active policy (the pipeline reads the size floors off it).
    pub fn policy(&self) -> &VerifyPolicy {
        &self.policy
    }

    /// HEAD the URL and classify what it would serve. Never errors.
    pub async fn verify(&self, url: &str) -> VerifyVerdict {
        let mut verdict = VerifyVerdict::default();

        let resp = match self.client.head(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(url, error = %e, "verification probe failed");
                verdict.warnings.push(format!("request failed: {e}"));
                return verdict;
            }
        };

        let status = resp.status();
        verdict.status = Some(status.as_u16());
        verdict.reachable = status.is_success();
        verdict.final_url = Some(resp.url().to_string());
        verdict.size_bytes = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        verdict.content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        if !verdict.reachable {
            verdict.warnings.push(format!("http status {status}"));
        } else if verdict.size_bytes.is_none() {
            verdict.warnings.push("no content-length declared".to_string());
        }
        verdict
    }
}

impl Default for LinkVerifier {
    fn default() -> Self {
        Self::new(VerifyPolicy::default())
    }
}
