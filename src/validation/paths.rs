//! Validation of the input file, output directory and cut window.

use std::path::Path;

use crate::media::TimeWindow;

use super::{ValidationIssue, ValidationResult};

/// Validates the paths and window of one invocation.
pub fn validate_invocation(
    input: &Path,
    output_dir: &Path,
    cut: Option<&TimeWindow>,
) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_input_file(input, "INPUT", &mut result);
    validate_directory_writable(output_dir, "--output-dir", &mut result);

    if let Some(window) = cut {
        if !window.is_valid() {
            result.add(
                ValidationIssue::error(
                    "--cut",
                    format!(
                        "Cut end must come after its start ({} -> {})",
                        window.start,
                        window.end.map(|e| e.to_string()).unwrap_or_default()
                    ),
                )
                .with_suggestion("Pass the earlier timestamp first"),
            );
        }
    }

    result
}

/// Validates that a path is a readable regular file.
fn validate_input_file(path: &Path, arg: &str, result: &mut ValidationResult) {
    if !path.exists() {
        result.add(ValidationIssue::error(
            arg,
            format!("File does not exist: '{}'", path.display()),
        ));
        return;
    }

    if !path.is_file() {
        result.add(ValidationIssue::error(
            arg,
            format!("Path is not a file: '{}'", path.display()),
        ));
        return;
    }

    if let Err(e) = std::fs::File::open(path) {
        result.add(
            ValidationIssue::error(
                arg,
                format!("File is not readable '{}': {}", path.display(), e),
            )
            .with_suggestion("Check file permissions"),
        );
    }
}

/// Validates that a directory exists (creating it if needed) and is writable.
fn validate_directory_writable(path: &Path, arg: &str, result: &mut ValidationResult) {
    if !path.exists() {
        if let Err(e) = std::fs::create_dir_all(path) {
            result.add(
                ValidationIssue::error(
                    arg,
                    format!("Cannot create directory '{}': {}", path.display(), e),
                )
                .with_suggestion("Check parent directory permissions"),
            );
        }
        return;
    }

    if !path.is_dir() {
        result.add(ValidationIssue::error(
            arg,
            format!("Path is not a directory: '{}'", path.display()),
        ));
        return;
    }

    match tempfile::tempfile_in(path) {
        Ok(_) => {}
        Err(e) => {
            result.add(
                ValidationIssue::error(
                    arg,
                    format!("Directory is not writable '{}': {}", path.display(), e),
                )
                .with_suggestion("Check directory permissions"),
            );
        }
    }
}
