//! Target resolution
//!
//! Runs once at startup: finds the playback device whose display name
//! contains the configured substring. Ambiguous queries pick the first match
//! in directory order so repeated runs against the same device list always
//! choose the same device.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directory::PlaybackDevice;
use crate::error::{Error, Result};
use crate::events::SwitchEvent;
use crate::machine::TargetDevice;

/// Case policy for substring matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCase {
    Sensitive,
    Insensitive,
}

impl MatchCase {
    /// Build from the `match_case` config flag
    #[must_use]
    pub fn from_flag(match_case: bool) -> Self {
        if match_case {
            Self::Sensitive
        } else {
            Self::Insensitive
        }
    }

    /// Whether `name` contains `query` under this policy
    #[must_use]
    pub fn contains(self, name: &str, query: &str) -> bool {
        match self {
            Self::Sensitive => name.contains(query),
            Self::Insensitive => name.to_lowercase().contains(&query.to_lowercase()),
        }
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub target: TargetDevice,
    /// Set when more than one device matched
    pub warning: Option<SwitchEvent>,
}

/// Resolve `query` against `devices`
///
/// # Errors
/// Returns [`Error::DeviceNotFound`] listing every available device name when
/// nothing matches.
pub fn resolve_target(
    devices: &[PlaybackDevice],
    query: &str,
    match_case: MatchCase,
) -> Result<Resolution> {
    let matches: Vec<&PlaybackDevice> = devices
        .iter()
        .filter(|d| match_case.contains(&d.name, query))
        .collect();

    let Some(first) = matches.first() else {
        return Err(Error::DeviceNotFound {
            query: query.to_string(),
            available: devices.iter().map(|d| d.name.clone()).collect(),
        });
    };

    let target = TargetDevice {
        id: first.id.clone(),
        name: first.name.clone(),
    };

    let warning = (matches.len() > 1).then(|| {
        let candidates: Vec<String> = matches.iter().map(|d| d.name.clone()).collect();
        warn!(
            "'{}' matches {} devices, using the first: {}",
            query,
            candidates.len(),
            target.name
        );
        SwitchEvent::AmbiguousTarget {
            query: query.to_string(),
            chosen: target.name.clone(),
            candidates,
        }
    });

    debug!("Resolved target '{}' → {} ({})", query, target.name, target.id);
    Ok(Resolution { target, warning })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::device;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn devices() -> Vec<PlaybackDevice> {
        vec![
            device("alsa_output.hdmi", "HDMI Output"),
            device("alsa_output.usb-a", "USB Headset A"),
            device("alsa_output.usb-b", "USB Headset B"),
            device("alsa_output.speakers", "Speakers"),
        ]
    }

    #[test_case("Speakers", MatchCase::Sensitive, "alsa_output.speakers" ; "exact name")]
    #[test_case("HDMI", MatchCase::Sensitive, "alsa_output.hdmi" ; "prefix substring")]
    #[test_case("hdmi", MatchCase::Insensitive, "alsa_output.hdmi" ; "case insensitive")]
    #[test_case("eakers", MatchCase::Sensitive, "alsa_output.speakers" ; "inner substring")]
    fn test_single_match_resolves(query: &str, match_case: MatchCase, expected_id: &str) {
        let resolution = resolve_target(&devices(), query, match_case).unwrap();
        assert_eq!(resolution.target.id, expected_id);
        assert_eq!(resolution.warning, None);
    }

    #[test]
    fn test_case_sensitive_rejects_wrong_case() {
        let err = resolve_target(&devices(), "hdmi", MatchCase::Sensitive).unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound { .. }));
    }

    #[test]
    fn test_zero_matches_lists_every_device() {
        let err = resolve_target(&devices(), "Bluetooth", MatchCase::Insensitive).unwrap_err();
        assert_eq!(
            err,
            Error::DeviceNotFound {
                query: "Bluetooth".to_string(),
                available: vec![
                    "HDMI Output".to_string(),
                    "USB Headset A".to_string(),
                    "USB Headset B".to_string(),
                    "Speakers".to_string(),
                ],
            }
        );
    }

    #[test]
    fn test_empty_device_list_is_not_found() {
        let err = resolve_target(&[], "Speakers", MatchCase::Sensitive).unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound { available, .. } if available.is_empty()));
    }

    #[test]
    fn test_multiple_matches_pick_first_and_warn() {
        let resolution = resolve_target(&devices(), "headset", MatchCase::Insensitive).unwrap();

        assert_eq!(resolution.target.id, "alsa_output.usb-a");
        assert_eq!(
            resolution.warning,
            Some(SwitchEvent::AmbiguousTarget {
                query: "headset".to_string(),
                chosen: "USB Headset A".to_string(),
                candidates: vec!["USB Headset A".to_string(), "USB Headset B".to_string()],
            })
        );
    }

    #[test]
    fn test_multiple_matches_are_deterministic() {
        let list = devices();
        let first = resolve_target(&list, "USB", MatchCase::Sensitive).unwrap();
        for _ in 0..10 {
            let again = resolve_target(&list, "USB", MatchCase::Sensitive).unwrap();
            assert_eq!(again.target, first.target);
        }
    }
}
