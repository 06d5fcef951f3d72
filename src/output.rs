//! Output rendering for one-shot mode.
//!
//! Renders one login command per credential. The line shape comes from a
//! built-in format or from a format file named by `TEMPLATE`; substitution
//! is plain placeholder replacement, no template engine. A JSON mode dumps
//! the whole batch for scripting.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::fetcher::Credential;

/// Built-in line format, one rendered line per credential.
pub const DEFAULT_FORMAT: &str = "docker login -u {user} -p {password} -e none {endpoint}";

/// One-shot output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One login command per line.
    #[default]
    Lines,
    /// The whole batch as a JSON array.
    Json,
}

/// Parse a `--output` argument.
pub fn parse_format(raw: &str) -> Result<OutputFormat> {
    match raw {
        "lines" => Ok(OutputFormat::Lines),
        "json" => Ok(OutputFormat::Json),
        other => anyhow::bail!("unknown output format `{other}` (expected `lines` or `json`)"),
    }
}

/// Render the batch for printing to stdout.
pub fn render(batch: &[Credential], config: &Config, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Lines => {
            let line = load_format(config.template.as_deref())?;
            Ok(render_lines(batch, &line))
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(batch)?;
            Ok(format!("{json}\n"))
        }
    }
}

/// Load the line format from a file, or fall back to the built-in one.
fn load_format(template: Option<&Path>) -> Result<String> {
    match template {
        Some(path) => {
            let format = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read format file {}", path.display()))?;
            Ok(format.trim_end().to_string())
        }
        None => Ok(DEFAULT_FORMAT.to_string()),
    }
}

/// Substitute credential fields into the line format.
///
/// Recognized placeholders: `{user}`, `{password}`, `{token}`,
/// `{endpoint}`, `{expires_at}`.
fn render_lines(batch: &[Credential], line_format: &str) -> String {
    let mut out = String::new();
    for credential in batch {
        let line = line_format
            .replace("{user}", &credential.principal)
            .replace("{password}", &credential.secret)
            .replace("{token}", &credential.raw_token)
            .replace("{endpoint}", &credential.endpoint)
            .replace("{expires_at}", &credential.expires_at.to_rfc3339());
        out.push_str(&line);
        out.push('\n');
    }
    out
}
