//! CLI command implementations.

pub mod cache;
pub mod check;
pub mod resolve;

use imgcache::ResolveOutcome;

/// Short human-readable description of a resolution outcome.
pub fn describe_outcome(outcome: &ResolveOutcome) -> String {
    match outcome {
        ResolveOutcome::Hit => "cached".to_string(),
        ResolveOutcome::Succeeded { attempts: 1 } => "downloaded".to_string(),
        ResolveOutcome::Succeeded { attempts } => {
            format!("downloaded after {} attempts", attempts)
        }
        ResolveOutcome::ExhaustedFallback { attempts } => {
            format!("original URL, caching failed after {} attempts", attempts)
        }
        ResolveOutcome::SkippedAfterGateFailure => "original URL, cache unavailable".to_string(),
    }
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
