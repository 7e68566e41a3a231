//! X11 idle time via the `xprintidle` tool
//!
//! `xprintidle` prints the `XScreenSaver` idle counter in milliseconds.

use std::process::Command;
use tracing::debug;

use super::IdleSource;
use crate::error::{Error, Result};

/// Polling idle source backed by `xprintidle`
#[derive(Debug, Default)]
pub struct XprintidleSource;

impl XprintidleSource {
    /// Check that `xprintidle` runs and produces a reading
    ///
    /// # Errors
    /// Returns [`Error::DependencyMissing`] if the tool is missing or cannot
    /// reach an X display.
    pub fn probe() -> Result<Self> {
        match query() {
            Some(_) => Ok(Self),
            None => Err(Error::DependencyMissing {
                missing: vec!["xprintidle".to_string()],
                hint: "Install xprintidle and make sure DISPLAY points at a running X server."
                    .to_string(),
            }),
        }
    }
}

impl IdleSource for XprintidleSource {
    fn idle_millis(&self) -> u64 {
        query().unwrap_or_else(|| {
            debug!("xprintidle query failed, treating as active");
            0
        })
    }

    fn name(&self) -> &'static str {
        "xprintidle"
    }
}

fn query() -> Option<u64> {
    let output = Command::new("xprintidle").output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_output(&output.stdout)
}

/// Parse the millisecond counter printed by `xprintidle`
fn parse_output(stdout: &[u8]) -> Option<u64> {
    std::str::from_utf8(stdout).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_with_newline() {
        assert_eq!(parse_output(b"15342\n"), Some(15342));
    }

    #[test]
    fn test_parse_output_zero() {
        assert_eq!(parse_output(b"0"), Some(0));
    }

    #[test]
    fn test_parse_output_rejects_garbage() {
        assert_eq!(parse_output(b"couldn't open display\n"), None);
        assert_eq!(parse_output(b""), None);
        assert_eq!(parse_output(b"-5"), None);
    }
}
