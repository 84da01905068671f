// src/classify.rs
//! Target classification: wildcard, invalid or valid URL

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Absolute URL with an http/ftp/wss style scheme, a host (dotted name,
    /// localhost, IPv4 or IPv6), optional port and optional path or query.
    static ref URL_PATTERN: Regex = Regex::new(concat!(
        r"(?i)^(?:http|ftp|wss)s?://",
        r"(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,20}\.?|[A-Z0-9-]{2,}\.?)",
        r"|localhost",
        r"|[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}",
        r"|\[?[A-F0-9]*:[A-F0-9:]+\]?)",
        r"(?::[0-9]+)?",
        r"(?:/?|[/?]\S+)$",
    ))
    .expect("URL pattern is valid");
}

/// Returns true when `s` is a well-formed absolute URL.
///
/// Total over all inputs: anything that does not match is simply `false`.
pub fn is_valid_url(s: &str) -> bool {
    !s.is_empty() && URL_PATTERN.is_match(s)
}

/// The class a raw target falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Contains a literal `*`
    Wildcard,
    /// No `*`, but not a well-formed URL either
    Invalid,
    /// Passes [`is_valid_url`]
    Valid,
}

/// Classify one raw target line. Whitespace-only lines have no class.
pub fn classify(raw: &str) -> Option<Classification> {
    let target = raw.trim();
    if target.is_empty() {
        return None;
    }

    if target.contains('*') {
        Some(Classification::Wildcard)
    } else if is_valid_url(target) {
        Some(Classification::Valid)
    } else {
        Some(Classification::Invalid)
    }
}

/// Raw targets partitioned by class, each entry trimmed, input order kept
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partition {
    pub wildcards: Vec<String>,
    pub invalid: Vec<String>,
    pub valid: Vec<String>,
}

impl Partition {
    pub fn total(&self) -> usize {
        self.wildcards.len() + self.invalid.len() + self.valid.len()
    }
}

/// Partition raw targets into the three category lists
pub fn partition<I, S>(lines: I) -> Partition
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Partition::default();

    for line in lines {
        let target = line.as_ref().trim();
        match classify(target) {
            Some(Classification::Wildcard) => out.wildcards.push(target.to_string()),
            Some(Classification::Invalid) => out.invalid.push(target.to_string()),
            Some(Classification::Valid) => out.valid.push(target.to_string()),
            None => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_urls() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://www.example.com/path?q=1"));
        assert!(is_valid_url("HTTPS://API.EXAMPLE.IO/v1/"));
        assert!(is_valid_url("ftp://10.0.0.1/x"));
        assert!(is_valid_url("ftps://files.example.org"));
        assert!(is_valid_url("wss://stream.example.com:8443/socket"));
        assert!(is_valid_url("http://localhost:8080"));
        assert!(is_valid_url("http://[2001:db8::1]/"));
        assert!(is_valid_url("https://app.example.co.uk/"));
    }

    #[test]
    fn test_rejects_malformed_urls() {
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("example.org"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("https://exa mple.com"));
        assert!(!is_valid_url("gopher://example.com"));
        assert!(!is_valid_url("https://-bad-.com"));
        assert!(!is_valid_url("https://example.com/ path"));
    }

    #[test]
    fn test_never_panics_on_odd_input() {
        for input in ["://", "*", "\u{0}", "https://\u{212a}.com", "[::]", "http://[", "ß://ß"] {
            let _ = is_valid_url(input);
        }
    }

    #[test]
    fn test_star_always_wins() {
        assert_eq!(classify("*.example.com"), Some(Classification::Wildcard));
        assert_eq!(classify("https://*.example.com"), Some(Classification::Wildcard));
        assert_eq!(classify("https://example.com/*"), Some(Classification::Wildcard));
    }

    #[test]
    fn test_valid_iff_predicate_holds() {
        for target in ["https://example.com", "example.com", "ftp://10.0.0.1/x", "not a url"] {
            let expected = if is_valid_url(target) {
                Classification::Valid
            } else {
                Classification::Invalid
            };
            assert_eq!(classify(target), Some(expected), "{}", target);
        }
    }

    #[test]
    fn test_blank_lines_have_no_class() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("   \t"), None);
    }

    #[test]
    fn test_partition_trims_and_drops_blanks() {
        let raw = vec![
            "  *.example.com ",
            "example.org",
            "",
            "not a url",
            "ftp://10.0.0.1/x\r",
            "   ",
        ];

        let parts = partition(raw);
        assert_eq!(parts.wildcards, vec!["*.example.com"]);
        assert_eq!(parts.invalid, vec!["example.org", "not a url"]);
        assert_eq!(parts.valid, vec!["ftp://10.0.0.1/x"]);
        assert_eq!(parts.total(), 4);
    }
}
