//! Desktop notifications
//!
//! Handles sending notifications via notify-rust and icon detection
//! using `FreeDesktop` standard icon names.

use color_eyre::eyre::{Context, Result};
use notify_rust::Notification;

/// Send a desktop notification
///
/// # Errors
/// Returns an error if the notification cannot be sent (e.g., no notification daemon running).
pub fn send_notification(summary: &str, body: &str, icon: Option<&str>) -> Result<()> {
    let icon = icon.unwrap_or("audio-card");

    Notification::new()
        .summary(summary)
        .body(body)
        .appname("IDLESW")
        .icon(icon)
        .timeout(3000)
        .show()
        .context("Failed to show notification")?;

    Ok(())
}

/// Pick a `FreeDesktop` icon name from a device's display name and node name
#[must_use]
pub fn device_icon(name: &str, id: &str) -> &'static str {
    let name = name.to_lowercase();
    let id = id.to_lowercase();

    if ["hdmi", "tv", "display"].iter().any(|k| name.contains(k)) || id.contains("hdmi") {
        "video-display"
    } else if ["headphone", "headset", "bluetooth"]
        .iter()
        .any(|k| name.contains(k))
        || id.contains("bluez")
    {
        "audio-headphones"
    } else {
        // Speakers, optical, digital, etc.
        "audio-speakers"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("HDMI Output", "alsa_output.pci.stereo", "video-display" ; "hdmi in name")]
    #[test_case("Living Room TV", "alsa_output.pci.stereo", "video-display" ; "tv in name")]
    #[test_case("Digital", "alsa_output.pci.hdmi-stereo", "video-display" ; "hdmi in node name")]
    #[test_case("USB Headset", "alsa_output.usb.analog", "audio-headphones" ; "headset")]
    #[test_case("WH-1000XM4", "bluez_output.00_11_22", "audio-headphones" ; "bluez node")]
    #[test_case("Analog Stereo", "alsa_output.pci.analog", "audio-speakers" ; "speakers fallback")]
    fn test_device_icon(name: &str, id: &str, expected: &str) {
        assert_eq!(device_icon(name, id), expected);
    }
}
