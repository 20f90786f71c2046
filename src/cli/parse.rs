//! CLI parse: clap types for apmz. No behavior; definitions only.

use crate::telemetry::SeverityLevel;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// apmz - command line interface for Azure Application Insights and instance metadata
#[derive(Parser, Debug)]
#[command(name = "apmz")]
#[command(about = "Command line interface for Azure Application Insights and the instance metadata service")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Comma separated Application Insights keys to send to; eg 'key1,key2,key3'
    #[arg(long, global = true, value_delimiter = ',')]
    pub api_keys: Vec<String>,

    /// Print events to stdout as json instead of sending them to Application Insights
    #[arg(short = 'o', long = "output", global = true)]
    pub output: bool,

    /// Configuration file path (layered over the global config file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a trace (traces table) to Application Insights
    Trace {
        /// Trace message
        #[arg(short = 'n', long)]
        name: String,
        /// Severity level: 0 verbose, 1 information, 2 warning, 3 error, 4 critical
        #[arg(short = 'l', long, default_value_t = 0, value_parser = parse_severity)]
        level: u8,
        /// Custom properties formatted as key=value, comma separated or repeated
        #[arg(short = 't', long, value_delimiter = ',', value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },
    /// Send a metric (customMetrics table) to Application Insights
    Metric {
        /// Metric name
        #[arg(short = 'n', long)]
        name: String,
        /// Metric value
        #[arg(short = 'v', long, default_value_t = 0.0, allow_negative_numbers = true, value_parser = parse_metric_value)]
        value: f64,
        /// Custom properties formatted as key=value, comma separated or repeated
        #[arg(short = 't', long, value_delimiter = ',', value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },
    /// Upload newline delimited json events to Application Insights
    Batch {
        /// File of json events; stdin is read when omitted
        #[arg(short = 'f', long = "file-path")]
        file: Option<PathBuf>,
    },
    /// Print a bash library to source for tracing and timing from scripts
    Bash {
        /// Define the script functions without collecting any events
        #[arg(short = 'd', long)]
        disabled: bool,
        /// Script name used for the exit trace and duration metric
        #[arg(short = 'n', long, default_value = crate::shell::DEFAULT_SCRIPT_NAME)]
        name: String,
        /// Default tags for every event formatted as key=value
        #[arg(short = 't', long = "default-tags", value_delimiter = ',', value_parser = parse_tag)]
        default_tags: Vec<(String, String)>,
    },
    /// Time helpers
    Time {
        #[command(subcommand)]
        command: TimeCommands,
    },
    /// Print a random v4 uuid
    Uuid,
    /// Print the version and build commit
    Version,
    /// Azure instance metadata service commands
    Metadata {
        #[command(subcommand)]
        command: MetadataCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TimeCommands {
    /// Current time in unix nanoseconds
    Unixnano,
    /// Absolute difference between two unixnano times
    Diff {
        /// First time in unixnano format
        #[arg(short = 'a', long = "first", allow_negative_numbers = true)]
        first: i64,
        /// Second time in unixnano format
        #[arg(short = 'b', long = "second", allow_negative_numbers = true)]
        second: i64,
        /// Time resolution
        #[arg(short = 'r', long, value_enum, default_value_t = Resolution::Sec)]
        resolution: Resolution,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Nano,
    Micro,
    Ms,
    Sec,
}

#[derive(Subcommand, Debug)]
pub enum MetadataCommands {
    /// Fetch the instance information
    Instance,
    /// Request a signed attestation document
    Attest {
        /// Optional nonce of at most 10 digits; eg '1234567890'
        #[arg(short = 'n', long, default_value = "")]
        nonce: String,
    },
    /// Scheduled events
    Events {
        #[command(subcommand)]
        command: EventsCommands,
    },
    /// Request a token for the system assigned or a user assigned managed identity
    Token {
        /// App ID URI of the target resource, eg https://management.azure.com/
        #[arg(short = 'r', long)]
        resource: String,
        /// Azure resource id of the user assigned managed identity
        #[arg(short = 'm', long = "mi-res")]
        mi_res: Option<String>,
        /// Object ID of the managed identity
        #[arg(long)]
        object_id: Option<String>,
        /// Client ID of the managed identity
        #[arg(long)]
        client_id: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EventsCommands {
    /// Fetch the scheduled events for this machine
    Get {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Acknowledge outstanding events so they may start early
    ///
    /// Acknowledging an event lets it proceed for every resource in the event, not only
    /// this machine.
    Ack {
        /// Event ids to acknowledge (-e 'id1,id2,...')
        #[arg(short = 'e', long = "event-ids", value_delimiter = ',', required = true)]
        event_ids: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

/// `key=value`; the value may itself contain '='.
pub fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("{:?} must be formatted as key=value", raw)),
    }
}

fn parse_metric_value(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("{:?} is not a number", raw))?;
    if !value.is_finite() {
        return Err(format!("{:?} is not a finite number", raw));
    }
    Ok(value)
}

fn parse_severity(raw: &str) -> Result<u8, String> {
    let level: u8 = raw
        .parse()
        .map_err(|_| format!("{:?} is not a severity level", raw))?;
    SeverityLevel::try_from(level)?;
    Ok(level)
}
