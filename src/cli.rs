// src/cli.rs
use clap::Parser;

use crate::platforms::PlatformSelection;

/// scope-harvest: bug bounty scope harvester
///
/// Walks the program listing of a bug bounty platform, collects the in-scope
/// targets of every program into a working file, then normalizes them into a
/// de-duplicated domain list. Interrupted harvests resume from checkpoints.
#[derive(Parser, Debug, Clone)]
#[command(name = "scope-harvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // ===== Input & Configuration =====
    /// Path to TOML config file
    #[arg(short = 'c', long = "config", default_value = "config.toml")]
    pub config: String,

    // ===== Platform =====
    /// Harvest Bugcrowd (default when no platform is given)
    #[arg(long = "bc")]
    pub bugcrowd: bool,

    /// Harvest HackerOne, once per configured sort order
    #[arg(long = "h1")]
    pub hackerone: bool,

    // ===== Stages =====
    /// Only harvest; leave the category and domain files untouched
    #[arg(long = "harvest-only")]
    pub harvest_only: bool,

    /// Only run normalization over the existing working file
    #[arg(long = "normalize-only")]
    pub normalize_only: bool,

    // ===== Display =====
    /// Disable progress indicator
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    // ===== Logging =====
    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.harvest_only && self.normalize_only {
            anyhow::bail!(
                "Cannot specify both --harvest-only and --normalize-only: nothing would run"
            );
        }

        // Verbose and quiet are mutually exclusive
        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        Ok(())
    }

    /// Platforms to harvest; Bugcrowd when none is named
    pub fn platforms(&self) -> PlatformSelection {
        if !self.bugcrowd && !self.hackerone {
            return PlatformSelection {
                bugcrowd: true,
                hackerone: false,
            };
        }

        PlatformSelection {
            bugcrowd: self.bugcrowd,
            hackerone: self.hackerone,
        }
    }

    pub fn should_harvest(&self) -> bool {
        !self.normalize_only
    }

    pub fn should_normalize(&self) -> bool {
        !self.harvest_only
    }

    /// Check if progress indicator should be enabled
    pub fn should_show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }

    /// Log level forced by flags, if any
    pub fn log_level_override(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let cli = Cli::parse_from(["scope-harvest"]);
        assert_eq!(cli.config, "config.toml");
    }

    #[test]
    fn test_custom_config_path() {
        let cli = Cli::parse_from(["scope-harvest", "--config", "custom.toml"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_bugcrowd_is_default_platform() {
        let cli = Cli::parse_from(["scope-harvest"]);
        assert_eq!(
            cli.platforms(),
            PlatformSelection {
                bugcrowd: true,
                hackerone: false
            }
        );
    }

    #[test]
    fn test_hackerone_only() {
        let cli = Cli::parse_from(["scope-harvest", "--h1"]);
        assert_eq!(
            cli.platforms(),
            PlatformSelection {
                bugcrowd: false,
                hackerone: true
            }
        );
    }

    #[test]
    fn test_both_platforms() {
        let cli = Cli::parse_from(["scope-harvest", "--bc", "--h1"]);
        let selection = cli.platforms();
        assert!(selection.bugcrowd);
        assert!(selection.hackerone);
    }

    #[test]
    fn test_stage_flags() {
        let cli = Cli::parse_from(["scope-harvest"]);
        assert!(cli.should_harvest());
        assert!(cli.should_normalize());

        let cli = Cli::parse_from(["scope-harvest", "--normalize-only"]);
        assert!(!cli.should_harvest());
        assert!(cli.should_normalize());

        let cli = Cli::parse_from(["scope-harvest", "--harvest-only"]);
        assert!(cli.should_harvest());
        assert!(!cli.should_normalize());
    }

    #[test]
    fn test_harvest_only_and_normalize_only_invalid() {
        let cli = Cli::parse_from(["scope-harvest", "--harvest-only", "--normalize-only"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_verbose_and_quiet_invalid() {
        let cli = Cli::parse_from(["scope-harvest", "--verbose", "--quiet"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_valid_combination() {
        let cli = Cli::parse_from(["scope-harvest", "--h1", "--harvest-only", "-v"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_progress_enabled_by_default() {
        let cli = Cli::parse_from(["scope-harvest"]);
        assert!(cli.should_show_progress());

        let cli = Cli::parse_from(["scope-harvest", "--no-progress"]);
        assert!(!cli.should_show_progress());
    }

    #[test]
    fn test_log_level_override() {
        assert_eq!(Cli::parse_from(["scope-harvest", "-v"]).log_level_override(), Some("debug"));
        assert_eq!(Cli::parse_from(["scope-harvest", "-q"]).log_level_override(), Some("warn"));
        assert_eq!(Cli::parse_from(["scope-harvest"]).log_level_override(), None);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from(["scope-harvest", "-c", "test.toml", "-v"]);
        assert_eq!(cli.config, "test.toml");
        assert!(cli.verbose);
    }
}
