//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fmt::Write as _;
use std::path::Path;

use log::info;

use super::script::{replay, ReplayOptions, ReplayReport, Script};
use super::OutputFormat;
use crate::error::Result;

/// Replay a script file and print the report.
///
/// Returns the report so the caller can decide the exit status.
pub fn replay_script(
    path: &Path,
    options: &ReplayOptions,
    format: OutputFormat,
) -> Result<ReplayReport> {
    info!("Replaying script: {}", path.display());

    let script = Script::load(path)?;
    let report = replay(&script, options);
    println!("{}", render(&report, format)?);

    Ok(report)
}

/// Replay the built-in walkthrough and print the report.
pub fn demo(format: OutputFormat) -> Result<ReplayReport> {
    info!("Replaying demo script");

    let report = replay(&Script::demo(), &ReplayOptions::default());
    println!("{}", render(&report, format)?);

    Ok(report)
}

/// Format a report for output
pub fn render(report: &ReplayReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => Ok(render_text(report)),
    }
}

fn render_text(report: &ReplayReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Base: {}", report.base);
    let _ = writeln!(out, "{:-<60}", "");

    for step in &report.steps {
        let _ = write!(out, "{:>3}  {:<9} perceived={}", step.index, step.op, step.perceived);
        if let Some(top) = step.top {
            let _ = write!(out, " top={}", top);
        }
        if !step.notifications.is_empty() {
            let notified: Vec<String> = step.notifications.iter().map(|v| v.to_string()).collect();
            let _ = write!(out, " notified=[{}]", notified.join(", "));
        }
        if let Some(error) = &step.error {
            let _ = write!(out, " error: {}", error);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{:-<60}", "");
    let _ = write!(out, "Perceived: {}", report.perceived);
    if report.failed_steps() > 0 {
        let _ = write!(out, " ({} step(s) rejected)", report.failed_steps());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text() {
        let report = replay(&Script::demo(), &ReplayOptions::default());
        let text = render(&report, OutputFormat::Text).unwrap();

        assert!(text.starts_with("Base: 10"));
        assert!(text.contains("set       perceived=30 notified=[30]"));
        assert!(text.ends_with("Perceived: 10"));
    }

    #[test]
    fn test_render_json() {
        let report = replay(&Script::demo(), &ReplayOptions::default());
        let text = render(&report, OutputFormat::Json).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["perceived"], serde_json::json!(10));
        assert_eq!(parsed["steps"].as_array().unwrap().len(), 5);
        assert!(parsed["steps"][0].get("error").is_none());
    }
}
