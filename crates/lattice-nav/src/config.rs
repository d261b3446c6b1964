//! Navigator configuration.
//!
//! Configuration can be built in code with the builder-style setters or
//! loaded from TOML:
//!
//! ```toml
//! [pages]
//! max_pending_transitions = 16
//!
//! [modals]
//! max_pending_transitions = 4
//! skip_enter_when_pop_queued = false
//! ```
//!
//! Missing tables and fields fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::screen::ContainerKind;

/// Settings for one navigation container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Maximum number of transitions waiting behind the one in flight.
    ///
    /// Requests beyond this are rejected at dispatch time.
    pub max_pending_transitions: usize,
    /// When a pop for a freshly initialized entry is already queued, go
    /// straight from initialization to exit without playing the enter phase.
    pub skip_enter_when_pop_queued: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_pending_transitions: 32,
            skip_enter_when_pop_queued: true,
        }
    }
}

impl ContainerConfig {
    /// Create a container configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pending-transition limit.
    pub fn max_pending_transitions(mut self, limit: usize) -> Self {
        self.max_pending_transitions = limit;
        self
    }

    /// Enable or disable skipping the enter phase when a pop is queued.
    pub fn skip_enter_when_pop_queued(mut self, enabled: bool) -> Self {
        self.skip_enter_when_pop_queued = enabled;
        self
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.max_pending_transitions == 0 {
            return Err(ConfigError::InvalidValue {
                field,
                message: "max_pending_transitions must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Settings for the whole navigator: one block per container kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// The page stack.
    pub pages: ContainerConfig,
    /// The modal stack.
    pub modals: ContainerConfig,
    /// The sheet slot.
    pub sheets: ContainerConfig,
}

impl NavigatorConfig {
    /// Create a navigator configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the page stack settings.
    pub fn pages(mut self, config: ContainerConfig) -> Self {
        self.pages = config;
        self
    }

    /// Replace the modal stack settings.
    pub fn modals(mut self, config: ContainerConfig) -> Self {
        self.modals = config;
        self
    }

    /// Replace the sheet slot settings.
    pub fn sheets(mut self, config: ContainerConfig) -> Self {
        self.sheets = config;
        self
    }

    /// Settings for a container kind.
    pub fn container(&self, kind: ContainerKind) -> &ContainerConfig {
        match kind {
            ContainerKind::Page => &self.pages,
            ContainerKind::Modal => &self.modals,
            ContainerKind::Sheet => &self.sheets,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pages.validate("pages.max_pending_transitions")?;
        self.modals.validate("modals.max_pending_transitions")?;
        self.sheets.validate("sheets.max_pending_transitions")?;
        Ok(())
    }
}
