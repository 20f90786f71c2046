//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, tracks_telemetry};
pub use output::map_error;
pub use parse::{
    parse_tag, Cli, Commands, EventsCommands, MetadataCommands, OutputFormat, Resolution,
    TimeCommands,
};
pub use presentation::{
    format_batch_summary, format_scheduled_events_text, format_time_diff, format_version,
    to_pretty_json,
};
pub use route::RunContext;
