//! Multi-line summary of a validation pass, logged before aborting.

use std::fmt::Write;

use super::ValidationResult;

/// Renders errors first, then warnings, then a count line.
pub fn format_report(result: &ValidationResult) -> String {
    let errors = result.error_count();
    let warnings = result.warnings().count();
    if errors == 0 && warnings == 0 {
        return "No issues found.".to_string();
    }

    let mut out = String::from("Invalid invocation:\n");
    for issue in result.errors().chain(result.warnings()) {
        let _ = writeln!(out, "  {}", issue);
    }
    let _ = write!(out, "{} error(s), {} warning(s)", errors, warnings);
    out
}
