// src/platforms/bugcrowd.rs
//! Bugcrowd engagement listing and changelog scope documents

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{decode_json, http_client, send_for_text, ListingPage, Platform, ProgramSummary, ScopeRef};
use crate::config::BugcrowdConfig;
use crate::error::{HarvestError, Result};
use crate::scope::{AcceptedCategories, ScopeLayout};

/// Changelog documents keep the in-scope targets in the first scope group
const CHANGELOG_LAYOUT: ScopeLayout = ScopeLayout {
    items_pointer: "/data/scope/0/targets",
    name_field: "name",
    uri_field: "uri",
    category_field: "category",
    eligibility_field: None,
};

const CHANGELOG_MARKER: &str = "/changelog/";

#[derive(Debug, Deserialize)]
struct EngagementsPage {
    #[serde(default, alias = "programs")]
    engagements: Vec<Engagement>,
}

#[derive(Debug, Deserialize)]
struct Engagement {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "briefUrl")]
    brief_url: Option<String>,
}

/// Bugcrowd client
pub struct BugcrowdPlatform {
    client: reqwest::Client,
    base_url: String,
    listing_query: String,
    accepted: AcceptedCategories,
}

impl BugcrowdPlatform {
    /// Create new Bugcrowd client from its config section
    pub fn new(config: &BugcrowdConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        if !config.cookie.is_empty() {
            let mut cookie =
                HeaderValue::from_str(&config.cookie).context("Invalid Bugcrowd cookie")?;
            cookie.set_sensitive(true);
            headers.insert(COOKIE, cookie);
        }

        Ok(Self {
            client: http_client(headers)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            listing_query: config.listing_query.clone(),
            accepted: AcceptedCategories::new(&config.accepted_categories),
        })
    }

    fn listing_url(&self, page: u32) -> String {
        format!(
            "{}/engagements.json?{}&page={}",
            self.base_url, self.listing_query, page
        )
    }

    fn brief_page_url(&self, brief_url: &str) -> String {
        format!("{}{}", self.base_url, brief_url)
    }
}

/// Find the first changelog reference embedded in a program page and
/// normalize it to a JSON resource path
pub fn find_changelog_path(html: &str) -> Option<String> {
    let start = html.find(CHANGELOG_MARKER)?;
    let rest = &html[start..];

    let end = rest.find('"').unwrap_or(rest.len());
    // HTML-escaped attributes continue with "&quot;" or "&amp;"
    let path = rest[..end].split('&').next().unwrap_or_default();

    if path.len() <= CHANGELOG_MARKER.len() {
        return None;
    }

    if path.ends_with(".json") {
        Some(path.to_string())
    } else {
        Some(format!("{}.json", path))
    }
}

/// Absolute changelog URL for a program's brief URL and changelog path
pub fn changelog_url(base_url: &str, brief_url: &str, changelog_path: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        brief_url.trim_matches('/'),
        changelog_path.trim_start_matches('/')
    )
}

/// Decode an engagements listing body
pub fn decode_listing(raw: &str, url: &str) -> Result<Vec<ProgramSummary>> {
    let page: EngagementsPage = serde_json::from_str(raw).map_err(|e| HarvestError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(page
        .engagements
        .into_iter()
        .map(|e| {
            let brief_url = e.brief_url.unwrap_or_default();
            let name = e
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| brief_url.clone());
            ProgramSummary { name, brief_url }
        })
        .collect())
}

#[async_trait]
impl Platform for BugcrowdPlatform {
    fn name(&self) -> &str {
        "Bugcrowd"
    }

    fn checkpoint_namespace(&self) -> String {
        "bugcrowd".to_string()
    }

    async fn fetch_listing_page(&self, page: u32) -> Result<ListingPage> {
        let url = self.listing_url(page);
        debug!("Fetching Bugcrowd listing page {}: {}", page, url);

        let raw = send_for_text(self.client.get(&url), &url).await?;
        let programs = decode_listing(&raw, &url)?;

        Ok(ListingPage { programs, raw })
    }

    async fn resolve_scope_ref(&self, program: &ProgramSummary) -> Result<Option<ScopeRef>> {
        if program.brief_url.is_empty() {
            return Ok(None);
        }

        let url = self.brief_page_url(&program.brief_url);
        let html = send_for_text(self.client.get(&url), &url).await?;

        Ok(find_changelog_path(&html).map(|path| {
            ScopeRef::get(changelog_url(&self.base_url, &program.brief_url, &path))
        }))
    }

    async fn fetch_scope_document(&self, scope_ref: &ScopeRef) -> Result<Value> {
        let body = send_for_text(self.client.get(&scope_ref.url), &scope_ref.url).await?;
        decode_json(&body, &scope_ref.url)
    }

    fn scope_layout(&self) -> &ScopeLayout {
        &CHANGELOG_LAYOUT
    }

    fn accepted_categories(&self) -> &AcceptedCategories {
        &self.accepted
    }
}
