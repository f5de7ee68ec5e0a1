//! Bootstrap release source and reactive selection tracking
//!
//! Releases are fetched once per session from the GitHub releases API and
//! published on a watch channel so the gate never blocks on the fetch. The
//! tracker replaces its list wholesale on every update and keeps the first
//! ("latest") entry selected unless the operator picked one explicitly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::watch;

/// A single bootstrap release as reported by the release source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Release {
    pub name: String,
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub prerelease: bool,
}

pub trait ReleaseSource {
    fn fetch_releases(&self) -> impl Future<Output = Result<Vec<Release>>> + Send;
}

/// GitHub releases API source
pub struct GithubReleaseSource {
    repo: String,
    api_base: String,
    client: reqwest::Client,
}

impl GithubReleaseSource {
    pub fn new(repo: &str, api_base: &str) -> Self {
        GithubReleaseSource {
            repo: repo.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

impl ReleaseSource for GithubReleaseSource {
    async fn fetch_releases(&self) -> Result<Vec<Release>> {
        let url = format!("{}/repos/{}/releases", self.api_base, self.repo);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "octostrap-cli")
            .send()
            .await
            .with_context(|| format!("Failed to reach release source: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Release listing failed: HTTP {} from {}", status, url);
        }

        response
            .json::<Vec<Release>>()
            .await
            .context("Failed to decode release listing")
    }
}

/// Spawn the release fetch and publish the result without blocking the
/// caller. A failed fetch only logs; the channel keeps its previous value.
pub fn spawn_fetch<S>(source: S) -> watch::Receiver<Vec<Release>>
where
    S: ReleaseSource + Send + Sync + 'static,
{
    let (tx, rx) = watch::channel(Vec::new());

    tokio::spawn(async move {
        match source.fetch_releases().await {
            Ok(releases) => {
                tracing::debug!(count = releases.len(), "release fetch finished");
                let _ = tx.send(releases);
            }
            Err(err) => {
                tracing::warn!("release fetch failed: {:#}", err);
            }
        }
    });

    rx
}

/// Extract a semantic version from a release name or tag
/// Handles "1.0.1", "v1.0.1", "bootstrap-1.0.1" and similar forms
pub fn extract_version(name: &str) -> Option<semver::Version> {
    let re = regex::Regex::new(r"v?(\d+\.\d+\.\d+)").ok()?;
    let captured = re.captures(name)?.get(1)?.as_str();
    semver::Version::parse(captured).ok()
}

/// Reactive view over the asynchronously fetched release list
#[derive(Debug, Default)]
pub struct ReleaseTracker {
    releases: Vec<Release>,
    selected: Option<String>,
    explicit: bool,
}

impl ReleaseTracker {
    pub fn new() -> Self {
        ReleaseTracker::default()
    }

    /// Replace the list wholesale. Entries are ordered newest-first by
    /// parsed version; unparsable names keep their incoming order at the
    /// end. Unless the operator selected explicitly (and that selection
    /// survived the refresh), selection falls back to the first entry.
    pub fn update(&mut self, mut releases: Vec<Release>) {
        releases.sort_by(|a, b| match (extract_version(&a.name), extract_version(&b.name)) {
            (Some(va), Some(vb)) => vb.cmp(&va),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        self.releases = releases;

        let survived = self
            .selected
            .as_ref()
            .is_some_and(|name| self.releases.iter().any(|r| &r.name == name));

        if !self.explicit || !survived {
            self.selected = self.releases.first().map(|r| r.name.clone());
            self.explicit = false;
        }
    }

    /// Explicit selection event from the operator
    pub fn select(&mut self, name: &str) -> Result<()> {
        if !self.releases.iter().any(|r| r.name == name) {
            anyhow::bail!("Unknown release: {}", name);
        }

        self.selected = Some(name.to_string());
        self.explicit = true;
        Ok(())
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    /// Display labels, marking the first entry as latest
    pub fn display_labels(&self) -> Vec<String> {
        self.releases
            .iter()
            .enumerate()
            .map(|(i, r)| {
                if i == 0 {
                    format!("latest ({})", r.name)
                } else {
                    r.name.clone()
                }
            })
            .collect()
    }
}
