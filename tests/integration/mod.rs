//! Integration tests for apmz

mod appinsights_channel;
mod batch_upload;
mod cli_commands;
mod codec_roundtrip;
mod metadata_http;
mod test_utils;
