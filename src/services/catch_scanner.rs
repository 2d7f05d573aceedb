//! Heuristic scanner extracting failure locations from raw Catch output.
//!
//! Only output that self-identifies with the Catch host-application banner
//! is scanned; any other runner's output yields no locations.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::FailureLocation;

/// Banner line Catch binaries print at startup, used as the activation gate.
static CATCH_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"is a Catch .* host application\.").expect("valid regex"));

/// Failure marker: `<file>:<line>: FAILED:` on most platforms.
static MARKER_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*):(\d+): FAILED:").expect("valid regex"));

/// Failure marker: `<file>(<line>): FAILED:` as MSVC-style toolchains print it.
static MARKER_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\((\d+)\): FAILED:").expect("valid regex"));

/// Which failure-marker convention to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStyle {
    /// `src/foo.cpp:42: FAILED:`
    Colon,
    /// `src\foo.cpp(42): FAILED:`
    Paren,
}

impl MarkerStyle {
    /// Marker convention of the platform this engine runs on.
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Paren
        } else {
            Self::Colon
        }
    }

    fn regex(&self) -> &'static Regex {
        match self {
            Self::Colon => &MARKER_COLON,
            Self::Paren => &MARKER_PAREN,
        }
    }
}

/// Scan captured test output for failure locations.
///
/// Returns an empty sequence when the output lacks the Catch signature
/// line; other runner formats are not scanned.
pub fn scan_test_output(output: &str) -> Vec<FailureLocation> {
    if !CATCH_SIGNATURE.is_match(output) {
        return Vec::new();
    }
    scan_catch_output(output, MarkerStyle::host())
}

/// Scan output already known to come from a Catch binary.
///
/// One [`FailureLocation`] per marker, in encounter order, no
/// deduplication. The message block runs from the marker line to the first
/// section-delimiter line (`======`/`------`) or to end of input, whichever
/// comes first.
pub fn scan_catch_output(output: &str, style: MarkerStyle) -> Vec<FailureLocation> {
    let raw_lines: Vec<&str> = output.split('\n').collect();
    let marker = style.regex();
    let mut locations = Vec::new();

    for (cursor, raw) in raw_lines.iter().enumerate() {
        let Some(caps) = marker.captures(raw.trim()) else {
            continue;
        };
        let file_name = caps[1].to_string();
        let Ok(display_line) = caps[2].parse::<u32>() else {
            continue;
        };

        let mut message = String::from("~~~c++\n");
        for expr_line in &raw_lines[cursor..] {
            if expr_line.starts_with("======") || expr_line.starts_with("------") {
                break;
            }
            message.push_str(expr_line);
            message.push('\n');
        }

        locations.push(FailureLocation {
            file_name,
            line_number: display_line.saturating_sub(1),
            hover_message: format!("{}\n~~~", message),
        });
    }

    locations
}
