//! Command-name contract used in logs.

use crate::cli::parse::{Commands, EventsCommands, MetadataCommands, TimeCommands};

/// Dotted command name (e.g. "trace", "metadata.events.ack").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Trace { .. } => "trace".to_string(),
        Commands::Metric { .. } => "metric".to_string(),
        Commands::Batch { .. } => "batch".to_string(),
        Commands::Bash { .. } => "bash".to_string(),
        Commands::Time { command } => format!("time.{}", time_command_name(command)),
        Commands::Uuid => "uuid".to_string(),
        Commands::Version => "version".to_string(),
        Commands::Metadata { command } => format!("metadata.{}", metadata_command_name(command)),
    }
}

pub fn time_command_name(command: &TimeCommands) -> &'static str {
    match command {
        TimeCommands::Unixnano => "unixnano",
        TimeCommands::Diff { .. } => "diff",
    }
}

pub fn metadata_command_name(command: &MetadataCommands) -> &'static str {
    match command {
        MetadataCommands::Instance => "instance",
        MetadataCommands::Attest { .. } => "attest",
        MetadataCommands::Events { command } => match command {
            EventsCommands::Get { .. } => "events.get",
            EventsCommands::Ack { .. } => "events.ack",
        },
        MetadataCommands::Token { .. } => "token",
    }
}

/// Whether the command sends telemetry and therefore needs the APMer.
pub fn tracks_telemetry(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Trace { .. } | Commands::Metric { .. } | Commands::Batch { .. }
    )
}
