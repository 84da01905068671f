// Test configuration loading
use scope_harvest::config::{Config, SortDirection, SortOrder};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[test]
fn test_load_test_config() {
    let config_path = Path::new("tests/test_config.toml");
    let config = Config::from_file(config_path).expect("Failed to load test config");

    // Verify logging config
    assert_eq!(config.logging.level, "debug");

    // Verify pipeline config, with unset paths falling back to defaults
    assert_eq!(config.pipeline.working_file, PathBuf::from("out/targets.txt"));
    assert_eq!(config.pipeline.domains_file, PathBuf::from("out/domains.txt"));
    assert_eq!(config.pipeline.wildcards_file, PathBuf::from("wildcards.txt"));
    assert_eq!(config.pipeline.invalid_file, PathBuf::from("invalid_urls.txt"));
    assert_eq!(config.pipeline.checkpoint_dir, PathBuf::from("checkpoints"));
    assert_eq!(config.pipeline.inter_page_delay(), Duration::from_millis(500));
    assert!(config.pipeline.wildcard_roots_as_domains);

    // Verify Bugcrowd config
    let bc = config.platforms.bugcrowd.as_ref().expect("bugcrowd section");
    assert!(bc.enabled);
    assert_eq!(bc.cookie, "_bugcrowd_session=test_session");
    assert_eq!(bc.base_url, "https://bugcrowd.com");
    assert!(bc.listing_query.contains("category=bug_bounty"));
    assert_eq!(bc.accepted_categories.len(), 3);

    // Verify HackerOne config
    let h1 = config.platforms.hackerone.as_ref().expect("hackerone section");
    assert!(!h1.enabled);
    assert_eq!(h1.page_size, 25);
    assert_eq!(h1.graphql_url, "https://hackerone.com/graphql");
    assert_eq!(
        h1.sort_orders,
        vec![
            SortOrder::new("launched_at", SortDirection::Desc),
            SortOrder::new("resolved_report_count", SortDirection::Asc),
        ]
    );
    assert_eq!(h1.accepted_categories, vec!["Domain", "Url", "Wildcard"]);
}

#[test]
fn test_missing_config_file() {
    let result = Config::from_file(Path::new("tests/does_not_exist.toml"));
    assert!(result.is_err());
}
