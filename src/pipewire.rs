//! `PipeWire` integration
//!
//! Implements the [`DeviceDirectory`] on top of `PipeWire` native tools:
//! - `pw-dump`: JSON queries for sink nodes and the default-sink metadata
//! - `pw-metadata`: setting the default audio sink
//!
//! Device identifiers are node names, which are stable across reboots
//! (unlike numeric object IDs). Both tools must be present in `PATH`.

use serde::Deserialize;
use std::process::Command;
use tracing::{debug, trace};

use crate::directory::{DeviceDirectory, PlaybackDevice};
use crate::error::{Error, Result};

/// Tools the directory shells out to
const REQUIRED_TOOLS: [&str; 2] = ["pw-dump", "pw-metadata"];

// ============================================================================
// PipeWire JSON Structures (from pw-dump)
// ============================================================================

/// Top-level `PipeWire` object from `pw-dump` output
#[derive(Debug, Deserialize)]
pub struct PwObject {
    pub id: u32,
    #[serde(rename = "type")]
    pub obj_type: String,
    #[serde(default)]
    pub info: Option<PwInfo>,
    #[serde(default)]
    pub props: Option<PwProps>,
    #[serde(default)]
    pub metadata: Option<Vec<PwMetadataEntry>>,
}

impl PwObject {
    /// Get props from either info.props or top-level props (metadata objects use top-level)
    #[must_use]
    pub fn get_props(&self) -> Option<&PwProps> {
        self.info
            .as_ref()
            .and_then(|i| i.props.as_ref())
            .or(self.props.as_ref())
    }
}

#[derive(Debug, Deserialize)]
pub struct PwInfo {
    #[serde(default)]
    pub props: Option<PwProps>,
}

/// `PipeWire` object properties - uses permissive deserialization
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PwProps {
    #[serde(rename = "node.name")]
    pub node_name: Option<String>,
    #[serde(rename = "node.description")]
    pub node_description: Option<String>,
    #[serde(rename = "node.nick")]
    pub node_nick: Option<String>,
    #[serde(rename = "media.class")]
    pub media_class: Option<String>,
    #[serde(rename = "metadata.name")]
    pub metadata_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PwMetadataEntry {
    pub key: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl PwMetadataEntry {
    /// Extract sink name from metadata value (handles multiple formats)
    #[must_use]
    pub fn get_name(&self) -> Option<String> {
        let value = self.value.as_ref()?;
        if let Some(obj) = value.as_object()
            && let Some(name_val) = obj.get("name")
        {
            return name_val.as_str().map(String::from);
        }
        value.as_str().map(String::from)
    }
}

// ============================================================================
// PipeWire Interface
// ============================================================================

/// `PipeWire` device directory
#[derive(Debug, Default, Clone, Copy)]
pub struct PipeWire;

impl PipeWire {
    /// Validate that all required `PipeWire` tools are available in `PATH`
    ///
    /// # Errors
    /// Returns [`Error::DependencyMissing`] with installation hints if any tool is missing.
    pub fn validate_tools() -> Result<()> {
        let missing: Vec<String> = REQUIRED_TOOLS
            .iter()
            .filter(|tool| {
                !Command::new(tool)
                    .arg("--version")
                    .output()
                    .is_ok_and(|out| out.status.success())
            })
            .map(ToString::to_string)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        Err(Error::DependencyMissing {
            missing,
            hint: "Please install the PipeWire utilities package for your distribution:\n\
                   - Arch/Manjaro: pacman -S pipewire\n\
                   - Fedora: dnf install pipewire-utils\n\
                   - Debian/Ubuntu: apt install pipewire-bin\n\
                   - openSUSE: zypper install pipewire-tools"
                .to_string(),
        })
    }

    /// Get all `PipeWire` objects via `pw-dump`
    ///
    /// Errors are returned as plain messages so callers can classify them
    /// (enumeration vs. query).
    fn dump() -> std::result::Result<Vec<PwObject>, String> {
        let output = Command::new("pw-dump")
            .output()
            .map_err(|e| format!("PipeWire tool 'pw-dump' not found or failed: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("pw-dump failed: {}", stderr.trim()));
        }

        let objects: Vec<PwObject> = serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("Failed to parse pw-dump JSON: {e}"))?;

        trace!("pw-dump returned {} objects", objects.len());
        Ok(objects)
    }

    /// Collect `Audio/Sink` nodes in dump order
    #[must_use]
    pub fn playback_devices_from_objects(objects: &[PwObject]) -> Vec<PlaybackDevice> {
        let default_name = Self::default_sink_name_from_objects(objects);

        objects
            .iter()
            .filter(|obj| obj.obj_type == "PipeWire:Interface:Node")
            .filter_map(|obj| {
                let props = obj.get_props()?;

                if props.media_class.as_deref() != Some("Audio/Sink") {
                    return None;
                }

                let id = props.node_name.clone()?;
                let name = props
                    .node_description
                    .clone()
                    .or_else(|| props.node_nick.clone())
                    .unwrap_or_else(|| id.clone());
                let is_default = default_name.as_ref() == Some(&id);

                Some(PlaybackDevice {
                    id,
                    name,
                    is_default,
                })
            })
            .collect()
    }

    /// Extract default sink name from metadata objects
    #[must_use]
    pub fn default_sink_name_from_objects(objects: &[PwObject]) -> Option<String> {
        objects
            .iter()
            .filter(|obj| obj.obj_type == "PipeWire:Interface:Metadata")
            .filter(|obj| {
                obj.get_props()
                    .is_some_and(|p| p.metadata_name.as_deref() == Some("default"))
            })
            .filter_map(|obj| obj.metadata.as_ref())
            .flatten()
            .find(|entry| entry.key == "default.audio.sink")
            .and_then(PwMetadataEntry::get_name)
    }

    /// Set the default audio sink via `pw-metadata`
    fn set_default_sink(node_name: &str) -> std::result::Result<(), String> {
        // JSON serialization avoids quoting issues in node names
        let value = serde_json::json!({ "name": node_name }).to_string();

        let output = Command::new("pw-metadata")
            .args(["0", "default.audio.sink", &value, "Spa:String:JSON"])
            .output()
            .map_err(|e| format!("PipeWire tool 'pw-metadata' not found or failed: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(stderr.trim().to_string());
        }

        debug!("Set default sink: {}", node_name);
        Ok(())
    }
}

impl DeviceDirectory for PipeWire {
    fn list_playback_devices(&self) -> Result<Vec<PlaybackDevice>> {
        let objects = Self::dump().map_err(Error::Enumeration)?;
        Ok(Self::playback_devices_from_objects(&objects))
    }

    fn current_default(&self) -> Result<String> {
        let objects = Self::dump().map_err(Error::Query)?;
        Self::default_sink_name_from_objects(&objects)
            .ok_or_else(|| Error::Query("No default sink found in PipeWire metadata".to_string()))
    }

    fn set_default(&self, id: &str) -> Result<()> {
        // pw-metadata accepts unknown names silently, so check the node exists first
        let objects = Self::dump().map_err(|reason| Error::Switch {
            id: id.to_string(),
            reason,
        })?;
        if !Self::playback_devices_from_objects(&objects)
            .iter()
            .any(|d| d.id == id)
        {
            return Err(Error::Switch {
                id: id.to_string(),
                reason: "sink is not currently available".to_string(),
            });
        }

        Self::set_default_sink(id).map_err(|reason| Error::Switch {
            id: id.to_string(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL_SINK_JSON: &str = r#"[
        {
            "id": 42,
            "type": "PipeWire:Interface:Node",
            "info": {
                "props": {
                    "node.name": "alsa_output.test.stereo",
                    "node.description": "Test Speakers",
                    "media.class": "Audio/Sink"
                }
            }
        }
    ]"#;

    const METADATA_OBJECT_FORMAT_JSON: &str = r#"[
        {
            "id": 0,
            "type": "PipeWire:Interface:Metadata",
            "props": {
                "metadata.name": "default"
            },
            "metadata": [
                {
                    "key": "default.audio.sink",
                    "value": {"name": "alsa_output.test.stereo"}
                }
            ]
        }
    ]"#;

    const METADATA_STRING_FORMAT_JSON: &str = r#"[
        {
            "id": 0,
            "type": "PipeWire:Interface:Metadata",
            "props": {
                "metadata.name": "default"
            },
            "metadata": [
                {
                    "key": "default.audio.sink",
                    "value": "alsa_output.test.stereo"
                }
            ]
        }
    ]"#;

    const FULL_GRAPH_JSON: &str = r#"[
        {
            "id": 0,
            "type": "PipeWire:Interface:Metadata",
            "props": { "metadata.name": "default" },
            "metadata": [
                { "key": "default.audio.source", "value": {"name": "alsa_input.mic"} },
                { "key": "default.audio.sink", "value": {"name": "alsa_output.speakers"} }
            ]
        },
        {
            "id": 1,
            "type": "PipeWire:Interface:Node",
            "info": {
                "props": {
                    "node.name": "alsa_output.hdmi",
                    "node.description": "HDMI Output",
                    "media.class": "Audio/Sink"
                }
            }
        },
        {
            "id": 2,
            "type": "PipeWire:Interface:Node",
            "info": {
                "props": {
                    "node.name": "alsa_output.speakers",
                    "node.description": "Speakers",
                    "media.class": "Audio/Sink"
                }
            }
        },
        {
            "id": 3,
            "type": "PipeWire:Interface:Node",
            "info": {
                "props": {
                    "node.name": "alsa_input.mic",
                    "node.description": "Microphone",
                    "media.class": "Audio/Source"
                }
            }
        }
    ]"#;

    #[test]
    fn test_metadata_get_name_object_format() {
        let objects: Vec<PwObject> = serde_json::from_str(METADATA_OBJECT_FORMAT_JSON).unwrap();
        let metadata = &objects[0].metadata.as_ref().unwrap()[0];
        assert_eq!(
            metadata.get_name(),
            Some("alsa_output.test.stereo".to_string())
        );
    }

    #[test]
    fn test_metadata_get_name_string_format() {
        let objects: Vec<PwObject> = serde_json::from_str(METADATA_STRING_FORMAT_JSON).unwrap();
        let metadata = &objects[0].metadata.as_ref().unwrap()[0];
        assert_eq!(
            metadata.get_name(),
            Some("alsa_output.test.stereo".to_string())
        );
    }

    #[test]
    fn test_metadata_get_name_null_returns_none() {
        let entry = PwMetadataEntry {
            key: "test".to_string(),
            value: None,
        };
        assert_eq!(entry.get_name(), None);
    }

    #[test]
    fn test_get_props_from_toplevel() {
        let json = r#"[{
            "id": 0,
            "type": "PipeWire:Interface:Metadata",
            "props": {
                "metadata.name": "default"
            }
        }]"#;
        let objects: Vec<PwObject> = serde_json::from_str(json).unwrap();
        let props = objects[0].get_props().unwrap();
        assert_eq!(props.metadata_name.as_deref(), Some("default"));
    }

    #[test]
    fn test_playback_devices_filters_audio_sink() {
        let objects: Vec<PwObject> = serde_json::from_str(MINIMAL_SINK_JSON).unwrap();
        let devices = PipeWire::playback_devices_from_objects(&objects);
        assert_eq!(
            devices,
            vec![PlaybackDevice {
                id: "alsa_output.test.stereo".to_string(),
                name: "Test Speakers".to_string(),
                is_default: false,
            }]
        );
    }

    #[test]
    fn test_playback_devices_keep_dump_order_and_mark_default() {
        let objects: Vec<PwObject> = serde_json::from_str(FULL_GRAPH_JSON).unwrap();
        let devices = PipeWire::playback_devices_from_objects(&objects);

        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["HDMI Output", "Speakers"]);
        assert!(!devices[0].is_default);
        assert!(devices[1].is_default);
    }

    #[test]
    fn test_playback_devices_use_nick_fallback() {
        let json = r#"[{
            "id": 1,
            "type": "PipeWire:Interface:Node",
            "info": {
                "props": {
                    "node.name": "test_sink",
                    "node.nick": "Test Nick",
                    "media.class": "Audio/Sink"
                }
            }
        }]"#;
        let objects: Vec<PwObject> = serde_json::from_str(json).unwrap();
        let devices = PipeWire::playback_devices_from_objects(&objects);
        assert_eq!(devices[0].name, "Test Nick");
    }

    #[test]
    fn test_default_sink_ignores_source_metadata() {
        let objects: Vec<PwObject> = serde_json::from_str(FULL_GRAPH_JSON).unwrap();
        assert_eq!(
            PipeWire::default_sink_name_from_objects(&objects),
            Some("alsa_output.speakers".to_string())
        );
    }

    #[test]
    fn test_default_sink_missing() {
        let json = r#"[{
            "id": 0,
            "type": "PipeWire:Interface:Metadata",
            "props": {
                "metadata.name": "default"
            },
            "metadata": []
        }]"#;
        let objects: Vec<PwObject> = serde_json::from_str(json).unwrap();
        assert_eq!(PipeWire::default_sink_name_from_objects(&objects), None);
    }
}
