// src/platforms/hackerone.rs
//! HackerOne opportunity discovery and structured scopes over GraphQL

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::debug;

use super::{decode_json, http_client, send_for_text, ListingPage, Platform, ProgramSummary, ScopeRef};
use crate::config::{HackerOneConfig, SortOrder};
use crate::error::{HarvestError, Result};
use crate::scope::{AcceptedCategories, ScopeLayout};

/// Structured scope nodes carry the asset class in `display_name`
const SCOPE_LAYOUT: ScopeLayout = ScopeLayout {
    items_pointer: "/data/team/structured_scopes_search/nodes",
    name_field: "identifier",
    uri_field: "identifier",
    category_field: "display_name",
    eligibility_field: Some("eligible_for_submission"),
};

/// Where listing nodes may live, newest schema first
const LISTING_POINTERS: [&str; 2] = ["/data/opportunities_search/nodes", "/data/search/nodes"];

const DISCOVERY_QUERY: &str = r#"query DiscoveryQuery($query: OpportunitiesQuery!, $filter: QueryInput!, $from: Int, $size: Int, $sort: [SortInput!], $post_filters: OpportunitiesFilterInput) {
  opportunities_search(query: $query, filter: $filter, from: $from, size: $size, sort: $sort, post_filters: $post_filters) {
    nodes {
      ... on OpportunityDocument {
        id
        handle
        name
      }
    }
  }
}"#;

const SCOPES_QUERY: &str = r#"query PolicySearchStructuredScopesQuery($handle: String!, $from: Int, $size: Int) {
  team(handle: $handle) {
    structured_scopes_search(from: $from, size: $size) {
      nodes {
        ... on StructuredScopeDocument {
          identifier
          display_name
          eligible_for_submission
        }
      }
    }
  }
}"#;

/// HackerOne client for one listing order
pub struct HackerOnePlatform {
    client: reqwest::Client,
    graphql_url: String,
    page_size: u32,
    sort: SortOrder,
    accepted: AcceptedCategories,
}

impl HackerOnePlatform {
    /// Create new HackerOne client walking the listing in `sort` order
    pub fn new(config: &HackerOneConfig, sort: SortOrder) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_token))
            .context("Invalid HackerOne API token")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            client: http_client(headers)?,
            graphql_url: config.graphql_url.clone(),
            page_size: config.page_size.max(1),
            sort,
            accepted: AcceptedCategories::new(&config.accepted_categories),
        })
    }

    /// Request body for listing page `page` (1-based)
    pub fn discovery_request(&self, page: u32) -> Value {
        let from = page.saturating_sub(1).saturating_mul(self.page_size);

        json!({
            "operationName": "DiscoveryQuery",
            "query": DISCOVERY_QUERY,
            "variables": {
                "from": from,
                "size": self.page_size,
                "query": {},
                "filter": {
                    "bool": {
                        "filter": [
                            {
                                "bool": {
                                    "must_not": { "term": { "team_type": "Engagements::Assessment" } },
                                    "should": [ { "term": { "offers_bounties": true } } ]
                                }
                            },
                            {
                                "bool": {
                                    "should": [
                                        { "exists": { "field": "structured_scope_stats.URL" } },
                                        { "exists": { "field": "structured_scope_stats.WILDCARD" } },
                                        { "exists": { "field": "structured_scope_stats.API" } }
                                    ]
                                }
                            },
                            { "range": { "minimum_low": { "gte": 1 } } }
                        ]
                    }
                },
                "sort": [ { "field": self.sort.field, "direction": self.sort.direction.as_graphql() } ],
                "post_filters": {
                    "my_programs": false,
                    "bookmarked": false,
                    "campaign_teams": false
                },
                "product_area": "opportunity_discovery",
                "product_feature": "search"
            }
        })
    }

    /// Request body for the structured scopes of `handle`
    pub fn scopes_request(handle: &str) -> Value {
        json!({
            "operationName": "PolicySearchStructuredScopesQuery",
            "query": SCOPES_QUERY,
            "variables": {
                "handle": handle,
                "from": 0,
                "size": 500
            }
        })
    }
}

/// Decode a discovery response body into program summaries
pub fn decode_listing(raw: &str, url: &str) -> Result<Vec<ProgramSummary>> {
    let body = decode_json(raw, url)?;

    let nodes = LISTING_POINTERS
        .iter()
        .find_map(|pointer| body.pointer(pointer))
        .and_then(Value::as_array)
        .ok_or_else(|| HarvestError::Decode {
            url: url.to_string(),
            reason: match body.get("errors") {
                Some(errors) => format!("GraphQL errors: {}", errors),
                None => "no opportunities_search nodes in response".to_string(),
            },
        })?;

    Ok(nodes
        .iter()
        .filter_map(|node| node.get("handle").and_then(Value::as_str))
        .map(str::trim)
        .filter(|handle| !handle.is_empty())
        .map(|handle| ProgramSummary {
            name: handle.to_string(),
            brief_url: format!("/{}", handle),
        })
        .collect())
}

#[async_trait]
impl Platform for HackerOnePlatform {
    fn name(&self) -> &str {
        "HackerOne"
    }

    fn checkpoint_namespace(&self) -> String {
        format!("hackerone_{}", self.sort.label())
    }

    async fn fetch_listing_page(&self, page: u32) -> Result<ListingPage> {
        debug!(
            "Fetching HackerOne listing page {} sorted by {}",
            page,
            self.sort.label()
        );

        let request = self.client.post(&self.graphql_url).json(&self.discovery_request(page));
        let raw = send_for_text(request, &self.graphql_url).await?;
        let programs = decode_listing(&raw, &self.graphql_url)?;

        Ok(ListingPage { programs, raw })
    }

    async fn resolve_scope_ref(&self, program: &ProgramSummary) -> Result<Option<ScopeRef>> {
        let handle = program.brief_url.trim_start_matches('/');
        if handle.is_empty() {
            return Ok(None);
        }

        Ok(Some(ScopeRef::post(
            self.graphql_url.clone(),
            Self::scopes_request(handle),
        )))
    }

    async fn fetch_scope_document(&self, scope_ref: &ScopeRef) -> Result<Value> {
        let request = match &scope_ref.body {
            Some(body) => self.client.post(&scope_ref.url).json(body),
            None => self.client.get(&scope_ref.url),
        };
        let body = send_for_text(request, &scope_ref.url).await?;
        decode_json(&body, &scope_ref.url)
    }

    fn scope_layout(&self) -> &ScopeLayout {
        &SCOPE_LAYOUT
    }

    fn accepted_categories(&self) -> &AcceptedCategories {
        &self.accepted
    }
}
