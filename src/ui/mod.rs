//! User interface module.
//!
//! - `formatter` - Pure formatting functions
//! - This module - Writing formatted output to the right stream
//!
//! Errors and warnings go to stderr so that stdout stays clean for
//! commands whose output is consumed by scripts.

pub mod formatter;

use crate::boundary::BoundaryWarning;
use crate::domain::Version;
use crate::manifest::Dependencies;

pub fn display_error(message: &str) {
    eprintln!("{}", formatter::format_error(message));
}

pub fn display_success(message: &str) {
    println!("{}", formatter::format_success(message));
}

pub fn display_status(message: &str) {
    println!("{}", formatter::format_status(message));
}

pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{}", formatter::format_boundary_warning(warning));
}

pub fn display_boundary_warnings(warnings: &[BoundaryWarning]) {
    for warning in warnings {
        display_boundary_warning(warning);
    }
}

pub fn display_proposed_tag(old_tag: Option<&str>, new_tag: &str) {
    println!("\n{}\n", formatter::format_proposed_tag(old_tag, new_tag));
}

pub fn display_version_change(manifest: &str, from: &Version, to: &Version) {
    display_success(&formatter::format_version_change(manifest, from, to));
}

pub fn display_dependencies(deps: &Dependencies) {
    print!("{}", formatter::format_dependencies(deps));
}

pub fn display_manual_push_instruction(tag: &str, remote: &str) {
    println!("\n{}", formatter::format_manual_push_instruction(tag, remote));
}
