// src/platforms/mod.rs
//! Bug bounty platform strategies for scope harvesting
//!
//! Every platform is driven through the same four steps: fetch a listing
//! page, resolve a program to its scope document, fetch that document, and
//! extract target strings from it. What differs per platform (endpoints,
//! auth headers, document layout, accepted categories) lives in the
//! implementation, not in the harvester.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::config::PlatformsConfig;
use crate::error::{HarvestError, Result};
use crate::scope::{self, AcceptedCategories, ScopeLayout};

pub mod bugcrowd;
pub mod hackerone;

pub use bugcrowd::BugcrowdPlatform;
pub use hackerone::HackerOnePlatform;

/// A program as listed on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSummary {
    /// Display name (or handle when the platform has no separate name)
    pub name: String,

    /// Platform-relative path of the program page, e.g. "/engagements/acme"
    pub brief_url: String,
}

/// Resolved location of a program's scope document
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeRef {
    pub url: String,

    /// Request body for platforms that fetch the document with a POST
    pub body: Option<Value>,
}

impl ScopeRef {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            body: Some(body),
        }
    }
}

/// One decoded listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub programs: Vec<ProgramSummary>,

    /// Response body exactly as received, kept as the page checkpoint
    pub raw: String,
}

impl ListingPage {
    /// An empty page is the end-of-data signal
    pub fn is_exhausted(&self) -> bool {
        self.programs.is_empty()
    }
}

/// Platform strategy trait
#[async_trait]
pub trait Platform: Send + Sync {
    /// Human-readable platform name (e.g. "Bugcrowd")
    fn name(&self) -> &str;

    /// Prefix for checkpoint files, unique per platform and listing order
    fn checkpoint_namespace(&self) -> String;

    /// Fetch and decode listing page `page` (1-based)
    async fn fetch_listing_page(&self, page: u32) -> Result<ListingPage>;

    /// Locate a program's scope document. `Ok(None)` means the program has
    /// no visible scope document, which is an expected outcome.
    async fn resolve_scope_ref(&self, program: &ProgramSummary) -> Result<Option<ScopeRef>>;

    /// Fetch a scope document previously located by [`Platform::resolve_scope_ref`]
    async fn fetch_scope_document(&self, scope_ref: &ScopeRef) -> Result<Value>;

    /// Where scope items live in this platform's scope documents
    fn scope_layout(&self) -> &ScopeLayout;

    /// Categories whose items are harvested
    fn accepted_categories(&self) -> &AcceptedCategories;

    /// Extract target strings from a fetched scope document
    fn extract_targets(&self, document: &Value) -> Result<Vec<String>> {
        scope::extract_targets(document, self.scope_layout(), self.accepted_categories())
    }
}

/// Which platforms a run harvests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformSelection {
    pub bugcrowd: bool,
    pub hackerone: bool,
}

/// Build the platform instances for a run, in harvest order.
///
/// HackerOne yields one instance per configured sort order. A selected
/// platform without a config section is an error; a disabled one is skipped.
pub fn build_platforms(
    selection: PlatformSelection,
    config: &PlatformsConfig,
) -> anyhow::Result<Vec<Box<dyn Platform>>> {
    let mut platforms: Vec<Box<dyn Platform>> = Vec::new();

    if selection.bugcrowd {
        let bc = config
            .bugcrowd
            .as_ref()
            .context("Bugcrowd selected but [platforms.bugcrowd] is missing from the config")?;

        if bc.enabled {
            check_endpoint(&bc.base_url).context("Invalid Bugcrowd base_url")?;
            let platform = BugcrowdPlatform::new(bc)?;
            warn_if_nothing_accepted(&platform);
            info!(
                "Initializing Bugcrowd harvesting ({} accepted categories)",
                platform.accepted_categories().len()
            );
            platforms.push(Box::new(platform));
        } else {
            warn!("Bugcrowd is disabled in the config, skipping");
        }
    }

    if selection.hackerone {
        let h1 = config
            .hackerone
            .as_ref()
            .context("HackerOne selected but [platforms.hackerone] is missing from the config")?;

        if h1.enabled {
            check_endpoint(&h1.graphql_url).context("Invalid HackerOne graphql_url")?;
            if h1.sort_orders.is_empty() {
                anyhow::bail!("HackerOne needs at least one sort order");
            }
            info!(
                "Initializing HackerOne harvesting over {} sort orders",
                h1.sort_orders.len()
            );
            for sort in &h1.sort_orders {
                let platform = HackerOnePlatform::new(h1, sort.clone())?;
                warn_if_nothing_accepted(&platform);
                platforms.push(Box::new(platform));
            }
        } else {
            warn!("HackerOne is disabled in the config, skipping");
        }
    }

    Ok(platforms)
}

fn warn_if_nothing_accepted(platform: &dyn Platform) {
    if platform.accepted_categories().is_empty() {
        warn!(
            "{} has no accepted categories configured; no targets will be harvested",
            platform.name()
        );
    }
}

/// Reject endpoints that are not absolute http(s) URLs
fn check_endpoint(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("Not a URL: {}", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => anyhow::bail!("Unsupported scheme {} in {}", other, raw),
    }
}

/// Build an HTTP client with the platform's default headers
pub(crate) fn http_client(headers: HeaderMap) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .gzip(true)
        .build()
        .context("Failed to create HTTP client")
}

/// Send a request and return its body, mapping failures onto the
/// harvest error taxonomy
pub(crate) async fn send_for_text(request: reqwest::RequestBuilder, url: &str) -> Result<String> {
    let response = request.send().await.map_err(|source| HarvestError::Transport {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::Fetch {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|source| HarvestError::Transport {
        url: url.to_string(),
        source,
    })
}

/// Parse a response body as JSON
pub(crate) fn decode_json(body: &str, url: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| HarvestError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BugcrowdConfig, HackerOneConfig, SortDirection, SortOrder};

    fn bugcrowd_config(enabled: bool) -> BugcrowdConfig {
        BugcrowdConfig {
            enabled,
            cookie: "_bugcrowd_session=test".to_string(),
            base_url: "https://bugcrowd.com".to_string(),
            listing_query: "category=bug_bounty".to_string(),
            user_agent: "scope-harvest-test".to_string(),
            accepted_categories: vec!["website".to_string()],
        }
    }

    fn hackerone_config(sort_orders: Vec<SortOrder>) -> HackerOneConfig {
        HackerOneConfig {
            enabled: true,
            api_token: "token".to_string(),
            graphql_url: "https://hackerone.com/graphql".to_string(),
            page_size: 100,
            accepted_categories: vec!["Domain".to_string()],
            sort_orders,
        }
    }

    #[test]
    fn test_build_platforms_one_hackerone_per_sort_order() {
        let config = PlatformsConfig {
            bugcrowd: Some(bugcrowd_config(true)),
            hackerone: Some(hackerone_config(vec![
                SortOrder::new("launched_at", SortDirection::Desc),
                SortOrder::new("launched_at", SortDirection::Asc),
            ])),
        };
        let selection = PlatformSelection {
            bugcrowd: true,
            hackerone: true,
        };

        let platforms = build_platforms(selection, &config).unwrap();
        let namespaces: Vec<String> = platforms.iter().map(|p| p.checkpoint_namespace()).collect();
        assert_eq!(
            namespaces,
            vec!["bugcrowd", "hackerone_launched_at_desc", "hackerone_launched_at_asc"]
        );
    }

    #[test]
    fn test_build_platforms_skips_disabled() {
        let config = PlatformsConfig {
            bugcrowd: Some(bugcrowd_config(false)),
            hackerone: None,
        };
        let selection = PlatformSelection {
            bugcrowd: true,
            hackerone: false,
        };
        assert!(build_platforms(selection, &config).unwrap().is_empty());
    }

    #[test]
    fn test_build_platforms_missing_section() {
        let selection = PlatformSelection {
            bugcrowd: false,
            hackerone: true,
        };
        assert!(build_platforms(selection, &PlatformsConfig::default()).is_err());
    }

    #[test]
    fn test_build_platforms_rejects_bad_endpoint() {
        let mut bc = bugcrowd_config(true);
        bc.base_url = "bugcrowd.com".to_string();
        let config = PlatformsConfig {
            bugcrowd: Some(bc),
            hackerone: None,
        };
        let selection = PlatformSelection {
            bugcrowd: true,
            hackerone: false,
        };
        assert!(build_platforms(selection, &config).is_err());
    }

    #[test]
    fn test_empty_listing_is_exhausted() {
        let page = ListingPage {
            programs: vec![],
            raw: "{}".to_string(),
        };
        assert!(page.is_exhausted());
    }

    #[test]
    fn test_scope_ref_constructors() {
        let get = ScopeRef::get("https://bugcrowd.com/x/changelog/1.json");
        assert!(get.body.is_none());

        let post = ScopeRef::post("https://hackerone.com/graphql", serde_json::json!({"q": 1}));
        assert!(post.body.is_some());
    }

    #[test]
    fn test_decode_json_reports_url() {
        let err = decode_json("<html>", "https://example.com/list").unwrap_err();
        match err {
            HarvestError::Decode { url, .. } => assert_eq!(url, "https://example.com/list"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
