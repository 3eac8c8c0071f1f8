//! # Device Locator Module
//!
//! Finds the gamepad among the evdev nodes by its advertised name.
//!
//! ## Controller Detection
//!
//! Every `event*` node under the device directory (normally `/dev/input`) is
//! opened and its name compared against a target substring, by default
//! `"Xbox Wireless Controller"`. The first match in path order wins.
//! Finding nothing is not an error: the controller may simply be asleep.

use evdev::Device;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{BridgeError, Result};

/// Default directory holding evdev nodes.
pub const DEFAULT_DEVICE_DIR: &str = "/dev/input";

/// Default substring matched against the device name.
pub const DEFAULT_TARGET_NAME: &str = "Xbox Wireless Controller";

/// Scans a directory of evdev nodes for a device by name.
#[derive(Debug, Clone)]
pub struct DeviceLocator {
    device_dir: PathBuf,
    target_name: String,
}

impl Default for DeviceLocator {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_DIR, DEFAULT_TARGET_NAME)
    }
}

impl DeviceLocator {
    pub fn new(device_dir: impl Into<PathBuf>, target_name: impl Into<String>) -> Self {
        Self {
            device_dir: device_dir.into(),
            target_name: target_name.into(),
        }
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    /// Returns the path of the first matching device, or `None`.
    ///
    /// # Errors
    ///
    /// Returns `Controller` if the device directory cannot be listed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rnbo_bridge::controller::locator::DeviceLocator;
    ///
    /// let locator = DeviceLocator::default();
    /// if let Some(path) = locator.locate()? {
    ///     println!("Controller at {}", path.display());
    /// }
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn locate(&self) -> Result<Option<PathBuf>> {
        let candidates = self.candidate_paths()?;

        let found = self.first_match(candidates.into_iter().map(|path| {
            let name = match Device::open(&path) {
                Ok(device) => device.name().map(str::to_string),
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                    None
                }
            };
            (path, name)
        }));

        if let Some(path) = &found {
            info!("Found {} at {}", self.target_name, path.display());
        }
        Ok(found)
    }

    /// Lists `event*` nodes in the device directory, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns `Controller` if the directory cannot be read.
    pub fn candidate_paths(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.device_dir).map_err(|e| {
            BridgeError::Controller(format!(
                "Failed to read {}: {}",
                self.device_dir.display(),
                e
            ))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("event"))
                    .unwrap_or(false)
            })
            .collect();

        // Sort for deterministic selection when several devices match
        paths.sort();
        Ok(paths)
    }

    /// Picks the first candidate whose name contains the target substring.
    ///
    /// Candidates without a readable name are skipped.
    pub fn first_match<I>(&self, candidates: I) -> Option<PathBuf>
    where
        I: IntoIterator<Item = (PathBuf, Option<String>)>,
    {
        candidates.into_iter().find_map(|(path, name)| {
            let name = name?;
            debug!("Found input device: {} ({})", path.display(), name);
            name.contains(&self.target_name).then_some(path)
        })
    }
}
