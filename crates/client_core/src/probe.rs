use std::{collections::HashSet, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info};
use url::Url;

/// Per-probe deadline applied when none is configured.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(6000);
/// Bound on how many candidates a single validation pass will probe.
pub const DEFAULT_PROBE_MAX_CHECK: usize = 500;

/// Terminal state of a single candidate probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

/// Seam for issuing one candidate load attempt.
///
/// Implementations do not enforce a deadline of their own; the validator
/// wraps every probe in its per-item timeout.
#[async_trait]
pub trait CandidateProber: Send + Sync {
    async fn probe(&self, uri: &str) -> Result<()>;
}

/// Probes candidates over HTTP: a fetchable resource is any URI that parses
/// and answers with a success status.
pub struct HttpProber {
    http: reqwest::Client,
}

impl HttpProber {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CandidateProber for HttpProber {
    async fn probe(&self, uri: &str) -> Result<()> {
        let url = Url::parse(uri).with_context(|| format!("unparsable candidate uri '{uri}'"))?;
        self.http.get(url).send().await?.error_for_status()?;
        Ok(())
    }
}

/// Filters a candidate list down to the entries that are actually loadable.
pub struct ShowcaseValidator {
    prober: Arc<dyn CandidateProber>,
    timeout: Duration,
    max_check: usize,
}

impl ShowcaseValidator {
    pub fn new(prober: Arc<dyn CandidateProber>) -> Self {
        Self::with_limits(prober, DEFAULT_PROBE_TIMEOUT, DEFAULT_PROBE_MAX_CHECK)
    }

    pub fn with_limits(
        prober: Arc<dyn CandidateProber>,
        timeout: Duration,
        max_check: usize,
    ) -> Self {
        Self {
            prober,
            timeout,
            max_check,
        }
    }

    /// Probe the candidates and keep the ones that loaded in time.
    ///
    /// The probe set is the first `max_check` entries of the de-duplicated
    /// input (dedupe happens before truncation); nothing past that bound is
    /// ever probed. All probes start together and the call joins on the last
    /// of them. Survivors keep their input order. When not a single probe
    /// succeeds the original input comes back unchanged, so a non-empty
    /// candidate list never produces an empty showcase.
    pub async fn validate(&self, uris: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let probe_set: Vec<&String> = uris
            .iter()
            .filter(|uri| seen.insert(uri.as_str()))
            .take(self.max_check)
            .collect();

        let outcomes = join_all(probe_set.iter().map(|uri| self.probe_one(uri))).await;

        let validated: Vec<String> = probe_set
            .iter()
            .zip(&outcomes)
            .filter(|(_, outcome)| **outcome == ProbeOutcome::Succeeded)
            .map(|(uri, _)| (**uri).clone())
            .collect();

        if validated.is_empty() {
            // Fallback invariant: an all-failed batch keeps the raw list.
            info!(
                candidates = uris.len(),
                "no candidate survived probing, keeping the raw list"
            );
            return uris.to_vec();
        }

        debug!(
            probed = probe_set.len(),
            validated = validated.len(),
            "candidate probing finished"
        );
        validated
    }

    /// One probe: resolves when the load completes, errors, or the deadline
    /// fires. Timing out drops the in-flight load, so a late completion has
    /// nothing left to touch.
    async fn probe_one(&self, uri: &str) -> ProbeOutcome {
        match tokio::time::timeout(self.timeout, self.prober.probe(uri)).await {
            Ok(Ok(())) => ProbeOutcome::Succeeded,
            Ok(Err(err)) => {
                debug!(uri, "candidate probe failed: {err:#}");
                ProbeOutcome::Failed
            }
            Err(_) => {
                debug!(
                    uri,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "candidate probe timed out"
                );
                ProbeOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/probe_tests.rs"]
mod tests;
