// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dispatcher configuration.
//!
//! Built in code with the setter chain, or loaded from YAML when the
//! `config-loaders` feature is enabled:
//!
//! ```yaml
//! # statecast.yaml
//! dispatcher:
//!   self_id: 7
//!   isolate_panics: true
//!   catch_up: true
//! ```

use crate::types::PeerId;

/// Runtime switches of a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-loaders",
    derive(serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct DispatcherConfig {
    /// Peer id of this process; events sent under it report `is_from_myself`.
    pub self_id: Option<PeerId>,
    /// Catch handler panics and route them to the error handler.
    /// When `false`, a panicking handler unwinds through `dispatch` once the
    /// dispatcher has closed the passes it was running.
    pub isolate_panics: bool,
    /// Replay cached entries to handlers added for a non-empty container.
    pub catch_up: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            self_id: None,
            isolate_panics: true,
            catch_up: true,
        }
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn self_id(mut self, id: PeerId) -> Self {
        self.self_id = Some(id);
        self
    }

    pub fn isolate_panics(mut self, enabled: bool) -> Self {
        self.isolate_panics = enabled;
        self
    }

    pub fn catch_up(mut self, enabled: bool) -> Self {
        self.catch_up = enabled;
        self
    }
}

#[cfg(feature = "config-loaders")]
mod loader {
    use super::DispatcherConfig;
    use crate::error::{Error, Result};
    use serde::Deserialize;
    use std::fs;
    use std::path::Path;

    /// Root YAML document.
    #[derive(Debug, Deserialize, Default)]
    #[serde(default, deny_unknown_fields)]
    struct ConfigDocument {
        dispatcher: DispatcherConfig,
    }

    impl DispatcherConfig {
        /// Load the `dispatcher` section of a YAML file.
        ///
        /// Missing keys keep their defaults; unknown keys are rejected.
        pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
            let path = path.as_ref();
            log::debug!("[DispatcherConfig] loading {}", path.display());
            let content = fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            Self::parse_yaml(&content)
        }

        /// Parse YAML content.
        pub fn parse_yaml(content: &str) -> Result<Self> {
            if content.trim().is_empty() {
                return Ok(Self::default());
            }
            serde_yaml::from_str::<ConfigDocument>(content)
                .map(|doc| doc.dispatcher)
                .map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_setters() {
        let config = DispatcherConfig::default();
        assert_eq!(config.self_id, None);
        assert!(config.isolate_panics);
        assert!(config.catch_up);

        let config = DispatcherConfig::new().self_id(3).catch_up(false);
        assert_eq!(config.self_id, Some(3));
        assert!(!config.catch_up);
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_parse_yaml() {
        let config = DispatcherConfig::parse_yaml("dispatcher:\n  self_id: 9\n  catch_up: false\n")
            .expect("valid yaml");
        assert_eq!(config, DispatcherConfig::new().self_id(9).catch_up(false));

        assert_eq!(
            DispatcherConfig::parse_yaml("").expect("empty"),
            DispatcherConfig::default()
        );

        let err = DispatcherConfig::parse_yaml("dispatcher:\n  bogus: 1\n")
            .expect_err("unknown key");
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
