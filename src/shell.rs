//! Bash helper library printed by `apmz bash`.
//!
//! Sourcing the enabled script defines `trace_err`, `trace_info`, `time_metric` and
//! `time_metric_with_tags`, which append dry-run envelopes to a temp batch file. An EXIT
//! trap records the exit trace and the script duration, then uploads the file with
//! `apmz batch`. The disabled script defines the same functions as no-ops.

use std::collections::BTreeMap;

const ENABLED: &str = include_str!("../assets/bash/enabled.sh");
const DISABLED: &str = include_str!("../assets/bash/disabled.sh");

pub const DEFAULT_SCRIPT_NAME: &str = "script";

/// Printed to stderr when the enabled script is requested without any API key.
pub const MISSING_KEYS_WARNING: &str = "Warning: apmz event collection is enabled, but --api-keys is not specified. You must override the __APP_INSIGHTS_KEYS env var or events will not be sent to Application Insights on script exit.";

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOptions {
    pub disabled: bool,
    pub script_name: String,
    pub default_tags: BTreeMap<String, String>,
    pub api_keys: Vec<String>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            disabled: false,
            script_name: DEFAULT_SCRIPT_NAME.to_string(),
            default_tags: BTreeMap::new(),
            api_keys: Vec::new(),
        }
    }
}

impl ScriptOptions {
    /// Whether rendering should come with [`MISSING_KEYS_WARNING`].
    pub fn needs_key_warning(&self) -> bool {
        !self.disabled && self.api_keys.is_empty()
    }
}

/// Render the script for `options`.
pub fn render(options: &ScriptOptions) -> String {
    if options.disabled {
        return DISABLED.to_string();
    }

    let tags = options
        .default_tags
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");

    ENABLED
        .replace("{{script_name}}", &escape(&options.script_name))
        .replace("{{api_keys}}", &escape(&options.api_keys.join(",")))
        .replace("{{default_tags}}", &escape(&tags))
}

/// Escape for use inside a double-quoted bash parameter expansion default.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
