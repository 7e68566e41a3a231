//! Test helpers shared by unit tests across modules
#![allow(dead_code)]

use std::ffi::OsString;
use std::sync::Mutex;

use crate::directory::{DeviceDirectory, PlaybackDevice};
use crate::error::{Error, Result};

/// RAII helper: set `XDG_CONFIG_HOME` to a tempdir for the lifetime of this guard.
pub(crate) struct XdgTemp {
    prev: Option<OsString>,
    dir: tempfile::TempDir,
}

impl XdgTemp {
    /// Create and activate a temporary `XDG_CONFIG_HOME`.
    ///
    /// # Panics
    ///
    /// Panics if a temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir for XDG_CONFIG_HOME");
        let prev = std::env::var_os("XDG_CONFIG_HOME");
        // SAFETY: Test-only code; callers serialize env access through ENV_LOCK
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", dir.path());
        }
        Self { prev, dir }
    }

    /// Path to the temporary `XDG_CONFIG_HOME` directory.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

impl Drop for XdgTemp {
    fn drop(&mut self) {
        // SAFETY: Test-only code; callers serialize env access through ENV_LOCK
        unsafe {
            if let Some(ref val) = self.prev {
                std::env::set_var("XDG_CONFIG_HOME", val);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }
}

/// Serializes tests that mutate process environment variables
pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug)]
struct FakeState {
    devices: Vec<PlaybackDevice>,
    default_id: String,
    switch_calls: usize,
    failures_left: usize,
    listing_fails: bool,
}

/// In-memory device directory that records switch calls
pub(crate) struct FakeDirectory {
    state: Mutex<FakeState>,
}

impl FakeDirectory {
    pub fn new(default_id: &str) -> Self {
        Self::with_devices(default_id, Vec::new())
    }

    pub fn with_devices(default_id: &str, devices: Vec<PlaybackDevice>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                devices,
                default_id: default_id.to_string(),
                switch_calls: 0,
                failures_left: 0,
                listing_fails: false,
            }),
        }
    }

    pub fn default_id(&self) -> String {
        self.state.lock().unwrap().default_id.clone()
    }

    pub fn set_default_id(&self, id: &str) {
        self.state.lock().unwrap().default_id = id.to_string();
    }

    pub fn switch_calls(&self) -> usize {
        self.state.lock().unwrap().switch_calls
    }

    /// Make the next `n` calls to `set_default` fail
    pub fn fail_next_switches(&self, n: usize) {
        self.state.lock().unwrap().failures_left = n;
    }

    /// Make every `list_playback_devices` call fail
    pub fn fail_listing(&self) {
        self.state.lock().unwrap().listing_fails = true;
    }
}

impl DeviceDirectory for FakeDirectory {
    fn list_playback_devices(&self) -> Result<Vec<PlaybackDevice>> {
        let state = self.state.lock().unwrap();
        if state.listing_fails {
            return Err(Error::Enumeration("pw-dump exited with status 1".to_string()));
        }
        Ok(state.devices.clone())
    }

    fn current_default(&self) -> Result<String> {
        Ok(self.default_id())
    }

    fn set_default(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.switch_calls += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(Error::Switch {
                id: id.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        state.default_id = id.to_string();
        Ok(())
    }
}

/// Shorthand for building a playback device in tests
pub(crate) fn device(id: &str, name: &str) -> PlaybackDevice {
    PlaybackDevice {
        id: id.to_string(),
        name: name.to_string(),
        is_default: false,
    }
}
