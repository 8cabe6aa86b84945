//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::constants::{DB_PATH, LIST_ID_SALT};
use crate::config::list::RawListConfig;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Where source lists are read from and generated lists are written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// Local directory tree under `--storage-root`
    Local,
    /// S3 buckets (requires the `s3` feature)
    S3,
}

/// Command-line configuration.
///
/// Every option can also be supplied through the environment (or a `.env` file).
#[derive(Debug, Clone, Parser)]
#[command(
    name = "domain_rankings",
    version,
    about = "Combine daily domain top lists into one reproducible ranking"
)]
pub struct AppConfig {
    /// Log level
    #[arg(long, value_enum, default_value = "info", env = "DOMAIN_RANKINGS_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain", env = "DOMAIN_RANKINGS_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// SQLite database holding list configurations
    #[arg(long, default_value = DB_PATH, env = "DOMAIN_RANKINGS_DB_PATH")]
    pub db_path: PathBuf,

    /// Salt of the list identifier encoding. Changing it changes every identifier.
    #[arg(long, default_value = LIST_ID_SALT, env = "DOMAIN_RANKINGS_ID_SALT")]
    pub id_salt: String,

    /// Storage backend for source and generated lists
    #[arg(long, value_enum, default_value = "local", env = "DOMAIN_RANKINGS_BACKEND")]
    pub backend: StorageBackend,

    /// Root directory of the local backend.
    /// Source lists live under `<root>/archive`, generated lists next to it.
    #[arg(long, default_value = ".", env = "DOMAIN_RANKINGS_STORAGE_ROOT")]
    pub storage_root: PathBuf,

    /// Bucket holding the daily source lists (S3 backend)
    #[arg(long, env = "DOMAIN_RANKINGS_SOURCE_BUCKET")]
    pub source_bucket: Option<String>,

    /// Bucket receiving generated lists and archives (S3 backend)
    #[arg(long, env = "DOMAIN_RANKINGS_OUTPUT_BUCKET")]
    pub output_bucket: Option<String>,

    /// Key prefix applied inside both buckets (S3 backend)
    #[arg(long, default_value = "", env = "DOMAIN_RANKINGS_S3_PREFIX")]
    pub s3_prefix: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate a list from a JSON request form or from flags
    Generate {
        /// JSON file with the list request (web form field names)
        #[arg(long, conflicts_with = "request")]
        config: Option<PathBuf>,

        #[command(flatten)]
        request: RequestArgs,

        /// Compute the list and print it without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate the canonical daily list
    Daily {
        /// `today`, `yesterday` or a `YYYY-MM-DD` date
        #[arg(default_value = "yesterday")]
        day: String,
    },
    /// Show the lifecycle state of a list
    Status {
        /// List identifier
        list_id: String,
    },
    /// Print the stored configuration of a list
    Config {
        /// List identifier
        list_id: String,
    },
    /// Print (or save) a generated list, optionally truncated
    Download {
        /// List identifier
        list_id: String,

        /// `full`, a row count, or a count with a `K` suffix
        #[arg(default_value = "full")]
        size: String,

        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// List request given as `generate` flags instead of a JSON file.
///
/// Values are passed through the same validation as the web form.
#[derive(Debug, Clone, Default, Args)]
#[group(id = "request", multiple = true)]
pub struct RequestArgs {
    /// First day of the window (`YYYY-MM-DD`)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Last day of the window (`YYYY-MM-DD`)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Window length in days, counted from the start date or back from the end date
    #[arg(long)]
    pub nb_days: Option<String>,

    /// Providers to combine, in order (repeat or separate with commas)
    #[arg(long = "provider", value_delimiter = ',')]
    pub providers: Vec<String>,

    /// `borda` or `dowdall`
    #[arg(long)]
    pub method: Option<String>,

    /// Rows read from each source list: `full` or a number
    #[arg(long)]
    pub prefix: Option<String>,

    /// Keep only registrable domains
    #[arg(long)]
    pub filter_pld: bool,

    /// Allowed top-level labels, comma separated
    #[arg(long, value_delimiter = ',')]
    pub filter_tlds: Vec<String>,

    /// Keep only the first row per organization
    #[arg(long)]
    pub filter_organization: bool,

    /// Allowed subdomain labels, comma separated
    #[arg(long, value_delimiter = ',')]
    pub filter_subdomains: Vec<String>,

    /// Minimum number of days a domain must appear on
    #[arg(long)]
    pub inclusion_days: Option<usize>,

    /// Minimum number of providers a domain must appear on
    #[arg(long)]
    pub inclusion_lists: Option<usize>,

    /// `retain` or `dense`
    #[arg(long)]
    pub rank_mode: Option<String>,
}

impl From<RequestArgs> for RawListConfig {
    fn from(args: RequestArgs) -> Self {
        let on = |enabled: bool| enabled.then(|| "on".to_string());
        let joined = |values: &[String]| (!values.is_empty()).then(|| values.join(","));
        RawListConfig {
            start_date: args.start_date,
            end_date: args.end_date,
            nb_days: args.nb_days,
            combination_method: args.method,
            list_prefix: args.prefix,
            filter_pld: on(args.filter_pld),
            filter_tld: on(!args.filter_tlds.is_empty()),
            filter_tld_value: joined(&args.filter_tlds),
            filter_organization: on(args.filter_organization),
            filter_subdomain: on(!args.filter_subdomains.is_empty()),
            filter_subdomain_value: joined(&args.filter_subdomains),
            inclusion_days: on(args.inclusion_days.is_some()),
            inclusion_days_value: args.inclusion_days.map(|n| n.to_string()),
            inclusion_lists: on(args.inclusion_lists.is_some()),
            inclusion_lists_value: args.inclusion_lists.map(|n| n.to_string()),
            rank_mode: args.rank_mode,
            providers: args.providers,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::list::{CombinationMethod, ListConfig, ListPrefix};

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_parse_generate_command() {
        let config = AppConfig::try_parse_from([
            "domain_rankings",
            "--storage-root",
            "/data",
            "generate",
            "--config",
            "request.json",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/data"));
        assert_eq!(config.backend, StorageBackend::Local);
        match config.command {
            Command::Generate {
                config, dry_run, ..
            } => {
                assert_eq!(config, Some(PathBuf::from("request.json")));
                assert!(dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_generate_from_flags() {
        let config = AppConfig::try_parse_from([
            "domain_rankings",
            "generate",
            "--start-date",
            "2024-01-01",
            "--nb-days",
            "7",
            "--provider",
            "alexa,umbrella",
            "--provider",
            "majestic",
            "--method",
            "dowdall",
            "--prefix",
            "10000",
            "--filter-tlds",
            "com,org",
            "--inclusion-days",
            "3",
        ])
        .unwrap();
        let request = match config.command {
            Command::Generate {
                config, request, ..
            } => {
                assert!(config.is_none());
                request
            }
            other => panic!("unexpected command: {:?}", other),
        };

        let list = ListConfig::try_from(RawListConfig::from(request)).unwrap();
        assert_eq!(list.start_date.to_string(), "2024-01-01");
        assert_eq!(list.end_date.to_string(), "2024-01-07");
        assert_eq!(list.providers, vec!["alexa", "umbrella", "majestic"]);
        assert_eq!(list.combination_method, CombinationMethod::Dowdall);
        assert_eq!(list.list_prefix, ListPrefix::Top(10_000));
        assert_eq!(
            list.filter_tlds,
            Some(vec!["com".to_string(), "org".to_string()])
        );
        assert_eq!(list.inclusion_days, Some(3));
        assert_eq!(list.inclusion_lists, None);
        assert!(!list.filter_pld);
    }

    #[test]
    fn test_generate_config_file_conflicts_with_flags() {
        let result = AppConfig::try_parse_from([
            "domain_rankings",
            "generate",
            "--config",
            "request.json",
            "--provider",
            "alexa",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_s3_prefix() {
        let config = AppConfig::try_parse_from([
            "domain_rankings",
            "--backend",
            "s3",
            "--s3-prefix",
            "lists/v2",
            "daily",
        ])
        .unwrap();
        assert_eq!(config.backend, StorageBackend::S3);
        assert_eq!(config.s3_prefix, "lists/v2");
    }

    #[test]
    fn test_parse_daily_defaults_to_yesterday() {
        let config = AppConfig::try_parse_from(["domain_rankings", "daily"]).unwrap();
        match config.command {
            Command::Daily { day } => assert_eq!(day, "yesterday"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_download_size() {
        let config =
            AppConfig::try_parse_from(["domain_rankings", "download", "Z2BJ", "10K"]).unwrap();
        match config.command {
            Command::Download { list_id, size, output } => {
                assert_eq!(list_id, "Z2BJ");
                assert_eq!(size, "10K");
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
