// src/config.rs

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File locations and pacing shared by every pipeline stage
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PipelineConfig {
    #[serde(default = "default_working_file")]
    pub working_file: PathBuf,
    #[serde(default = "default_wildcards_file")]
    pub wildcards_file: PathBuf,
    #[serde(default = "default_invalid_file")]
    pub invalid_file: PathBuf,
    #[serde(default = "default_domains_file")]
    pub domains_file: PathBuf,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    #[serde(default = "default_inter_page_delay_ms")]
    pub inter_page_delay_ms: u64,
    /// Also add cleaned wildcard roots ("*.example.com" -> "example.com") to the domain list.
    ///
    /// Off, a wildcard only reaches the domain list when its cleaned form
    /// still ends in `*`. Turn it on to have `*.example.com` end up as
    /// `https://example.com` in the final domain file.
    #[serde(default)]
    pub wildcard_roots_as_domains: bool,
}

fn default_working_file() -> PathBuf { PathBuf::from("targets.txt") }
fn default_wildcards_file() -> PathBuf { PathBuf::from("wildcards.txt") }
fn default_invalid_file() -> PathBuf { PathBuf::from("invalid_urls.txt") }
fn default_domains_file() -> PathBuf { PathBuf::from("domains.txt") }
fn default_backup_dir() -> PathBuf { PathBuf::from("domain_trash") }
fn default_checkpoint_dir() -> PathBuf { PathBuf::from("checkpoints") }
fn default_inter_page_delay_ms() -> u64 { 200 }

impl PipelineConfig {
    pub fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_ms)
    }

    /// Same layout with every file placed under `dir`
    pub fn rooted_at(dir: &Path) -> Self {
        Self {
            working_file: dir.join(default_working_file()),
            wildcards_file: dir.join(default_wildcards_file()),
            invalid_file: dir.join(default_invalid_file()),
            domains_file: dir.join(default_domains_file()),
            backup_dir: dir.join(default_backup_dir()),
            checkpoint_dir: dir.join(default_checkpoint_dir()),
            inter_page_delay_ms: 0,
            wildcard_roots_as_domains: false,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            working_file: default_working_file(),
            wildcards_file: default_wildcards_file(),
            invalid_file: default_invalid_file(),
            domains_file: default_domains_file(),
            backup_dir: default_backup_dir(),
            checkpoint_dir: default_checkpoint_dir(),
            inter_page_delay_ms: default_inter_page_delay_ms(),
            wildcard_roots_as_domains: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BugcrowdConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Full `Cookie` header value of a logged-in session
    pub cookie: String,
    #[serde(default = "default_bugcrowd_base_url")]
    pub base_url: String,
    #[serde(default = "default_bugcrowd_listing_query")]
    pub listing_query: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_bugcrowd_categories")]
    pub accepted_categories: Vec<String>,
}

fn default_bugcrowd_base_url() -> String { "https://bugcrowd.com".to_string() }
fn default_bugcrowd_listing_query() -> String {
    "category=bug_bounty&sort_by=promoted&sort_direction=desc".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0".to_string()
}
fn default_bugcrowd_categories() -> Vec<String> {
    vec!["website".to_string(), "api".to_string()]
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_graphql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One ordering of the HackerOne opportunity listing
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field: String,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(field: &str, direction: SortDirection) -> Self {
        Self {
            field: field.to_string(),
            direction,
        }
    }

    /// Short label, e.g. "launched_at_desc"
    pub fn label(&self) -> String {
        format!("{}_{}", self.field, self.direction.as_graphql().to_ascii_lowercase())
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HackerOneConfig {
    #[serde(default)]
    pub enabled: bool,
    pub api_token: String,
    #[serde(default = "default_hackerone_graphql_url")]
    pub graphql_url: String,
    #[serde(default = "default_hackerone_page_size")]
    pub page_size: u32,
    #[serde(default = "default_hackerone_categories")]
    pub accepted_categories: Vec<String>,
    #[serde(default = "default_hackerone_sort_orders")]
    pub sort_orders: Vec<SortOrder>,
}

fn default_hackerone_graphql_url() -> String { "https://hackerone.com/graphql".to_string() }
fn default_hackerone_page_size() -> u32 { 100 }
fn default_hackerone_categories() -> Vec<String> {
    vec!["Domain".to_string(), "Url".to_string(), "Wildcard".to_string()]
}
fn default_hackerone_sort_orders() -> Vec<SortOrder> {
    ["launched_at", "minimum_bounty_table_value", "resolved_report_count"]
        .iter()
        .flat_map(|field| {
            [
                SortOrder::new(field, SortDirection::Desc),
                SortOrder::new(field, SortDirection::Asc),
            ]
        })
        .collect()
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PlatformsConfig {
    #[serde(default)]
    pub bugcrowd: Option<BugcrowdConfig>,
    #[serde(default)]
    pub hackerone: Option<HackerOneConfig>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub platforms: PlatformsConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(cfg)
    }
}
