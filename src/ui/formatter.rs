//! Pure formatting functions for UI output.
//!
//! Everything here returns a `String`; printing happens in the parent
//! module. Styling goes through `console`, which drops the escape codes
//! when the stream is not a terminal (CI logs stay readable).

use console::style;

use crate::boundary::BoundaryWarning;
use crate::domain::Version;
use crate::manifest::{split_requirement, Dependencies};

pub fn format_error(message: &str) -> String {
    format!("{} {}", style("ERROR:").red().bold(), message)
}

pub fn format_success(message: &str) -> String {
    format!("{} {}", style("✓").green(), message)
}

pub fn format_status(message: &str) -> String {
    format!("{} {}", style("→").yellow(), message)
}

pub fn format_boundary_warning(warning: &BoundaryWarning) -> String {
    format!("{} {}", style("⚠ WARNING:").yellow(), warning)
}

/// Describe the move from the previous release tag to the new one.
///
/// Shows either:
/// - If a release exists: "From: old_tag / To: new_tag"
/// - If this is the first release: "Initial Tag: new_tag"
pub fn format_proposed_tag(old_tag: Option<&str>, new_tag: &str) -> String {
    match old_tag {
        Some(old) => format!(
            "{}\n  From: {}\n  To:   {}",
            style("Proposed Tag Change:").bold(),
            style(old).red(),
            style(new_tag).green()
        ),
        None => format!(
            "{}\n  New tag: {}",
            style("Initial Tag:").bold(),
            style(new_tag).green()
        ),
    }
}

pub fn format_version_change(manifest: &str, from: &Version, to: &Version) -> String {
    format!(
        "{}: version {} -> {}",
        manifest,
        style(from).red(),
        style(to).green()
    )
}

/// Two sections, one requirement per line as `name  specifier`
pub fn format_dependencies(deps: &Dependencies) -> String {
    let mut out = String::new();
    for (title, list) in [("Dependencies:", &deps.runtime), ("Dev Dependencies:", &deps.dev)] {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&style(title).bold().to_string());
        out.push('\n');
        if list.is_empty() {
            out.push_str("  (none)\n");
            continue;
        }
        let width = list
            .iter()
            .map(|req| split_requirement(req).0.len())
            .max()
            .unwrap_or(0);
        for requirement in list {
            let (name, spec) = split_requirement(requirement);
            let line = format!("  {:<width$}  {}", name, spec, width = width);
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}

pub fn format_manual_push_instruction(tag: &str, remote: &str) -> String {
    format!(
        "{} To push this tag later, run:\n  {}",
        style("→").yellow(),
        style(format!("git push {} {}", remote, tag)).cyan()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_contains_message() {
        let msg = format_error("manifest missing");
        assert!(msg.contains("ERROR:"));
        assert!(msg.contains("manifest missing"));
    }

    #[test]
    fn test_format_proposed_tag_initial() {
        let msg = format_proposed_tag(None, "v0.1.0");
        assert!(msg.contains("Initial Tag:"));
        assert!(msg.contains("v0.1.0"));
    }

    #[test]
    fn test_format_proposed_tag_change() {
        let msg = format_proposed_tag(Some("v0.1.0"), "v0.1.1");
        assert!(msg.contains("From:"));
        assert!(msg.contains("v0.1.0"));
        assert!(msg.contains("v0.1.1"));
    }

    #[test]
    fn test_format_dependencies() {
        let deps = Dependencies {
            runtime: vec!["httpx>=0.27.0".to_string(), "pydantic-settings>=2.2".to_string()],
            dev: vec![],
        };
        let out = format_dependencies(&deps);
        assert!(out.contains("Dependencies:"));
        assert!(out.contains("  httpx              >=0.27.0"));
        assert!(out.contains("  pydantic-settings  >=2.2"));
        assert!(out.contains("Dev Dependencies:"));
        assert!(out.contains("(none)"));
    }

    #[test]
    fn test_format_manual_push_instruction() {
        let out = format_manual_push_instruction("v0.1.1", "origin");
        assert!(out.contains("git push origin v0.1.1"));
    }
}
