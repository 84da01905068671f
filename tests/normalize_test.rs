// End-to-end normalization over real files
use scope_harvest::config::PipelineConfig;
use scope_harvest::events::{MemoryEvents, PipelineEvent, Stage};
use scope_harvest::normalize::Normalizer;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const RAW_TARGETS: &str = "*.example.com\nexample.org\nnot a url\nftp://10.0.0.1/x\n";

fn setup(roots_as_domains: bool) -> (TempDir, PipelineConfig, Normalizer, MemoryEvents) {
    let temp = TempDir::new().unwrap();
    let mut config = PipelineConfig::rooted_at(temp.path());
    config.wildcard_roots_as_domains = roots_as_domains;
    fs::write(&config.working_file, RAW_TARGETS).unwrap();

    let events = MemoryEvents::new();
    let normalizer = Normalizer::new(config.clone(), Arc::new(events.clone()));
    (temp, config, normalizer, events)
}

#[test]
fn test_worked_example_with_wildcard_roots() {
    let (_temp, config, normalizer, events) = setup(true);

    let report = normalizer.run_all();
    assert!(report.is_success());
    assert_eq!(report.completed.len(), 4);

    assert_eq!(
        fs::read_to_string(&config.domains_file).unwrap(),
        "ftp://10.0.0.1/x\nhttps://example.com\nhttps://example.org\n"
    );
    assert_eq!(fs::read_to_string(&config.wildcards_file).unwrap(), "example.com\n");

    // The working file is an input only
    assert_eq!(fs::read_to_string(&config.working_file).unwrap(), RAW_TARGETS);

    let completed: Vec<Stage> = events
        .events()
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StageCompleted { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(completed, Stage::ALL.to_vec());
}

#[test]
fn test_worked_example_literal_wildcard_rule() {
    let (_temp, config, normalizer, _) = setup(false);

    let report = normalizer.run_all();
    assert!(report.is_success());

    // Without the option, a cleaned wildcard root stays a wildcard
    assert_eq!(
        fs::read_to_string(&config.domains_file).unwrap(),
        "ftp://10.0.0.1/x\nhttps://example.org\n"
    );
    assert_eq!(fs::read_to_string(&config.wildcards_file).unwrap(), "example.com\n");

    // Classify found nothing to back up on a fresh run; every later stage
    // snapshotted its input and the domain file
    assert_eq!(normalizer.backups().snapshots().unwrap().len(), 5);
}

#[test]
fn test_rerun_is_stable_and_backups_restore() {
    let (_temp, config, normalizer, _) = setup(true);

    normalizer.run_all();
    let first = fs::read_to_string(&config.domains_file).unwrap();

    normalizer.run_all();
    let second = fs::read_to_string(&config.domains_file).unwrap();
    assert_eq!(first, second);

    // The domain file as classify left it on the first run can be brought back
    let store = normalizer.backups();
    let snapshot = store
        .dir()
        .join("domains_clean_wildcards_original.txt");
    assert_eq!(fs::read_to_string(&snapshot).unwrap(), "ftp://10.0.0.1/x\n");

    store.restore(&snapshot, &config.domains_file).unwrap();
    assert_eq!(
        fs::read_to_string(&config.domains_file).unwrap(),
        "ftp://10.0.0.1/x\n"
    );
}

#[test]
fn test_latin1_working_file() {
    let (_temp, config, normalizer, _) = setup(false);
    fs::write(&config.working_file, b"caf\xe9.example.com\nhttps://ok.example.com\n").unwrap();

    let report = normalizer.run_all();
    assert!(report.is_success());

    let invalid = fs::read_to_string(&config.invalid_file).unwrap();
    assert_eq!(invalid, "caf\u{e9}.example.com\n");
}
