//! Cache generations and their lifecycle.
//!
//! A generation is one versioned snapshot of cached resources. Its lifecycle
//! is driven only by deploying a new version string:
//!
//! ```text
//! absent -> installing -> installed -> active -> superseded -> deleted
//!              |
//!              +-> absent        (install failed, nothing persisted)
//! ```
//!
//! Only `installed` and `active` are ever persisted; `superseded` and
//! `deleted` happen inside the single activation transaction.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Name of a generation: `<prefix>-<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenerationName {
    name: String,
    version: String,
}

impl GenerationName {
    pub fn new(prefix: &str, version: &str) -> Result<Self, Error> {
        let (prefix, version) = (prefix.trim(), version.trim());
        if prefix.is_empty() || version.is_empty() {
            return Err(Error::InvalidInput("cache prefix and version must not be empty".into()));
        }
        Ok(Self { name: format!("{prefix}-{version}"), version: version.to_string() })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for GenerationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Lifecycle state of a single generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationState {
    Absent,
    Installing,
    Installed,
    Active,
    Superseded,
    Deleted,
}

impl GenerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationState::Absent => "absent",
            GenerationState::Installing => "installing",
            GenerationState::Installed => "installed",
            GenerationState::Active => "active",
            GenerationState::Superseded => "superseded",
            GenerationState::Deleted => "deleted",
        }
    }

    /// Whether `self -> next` is a legal lifecycle step.
    ///
    /// Reinstalling an installed or active generation refreshes its entries,
    /// so `installed/active -> installing` is allowed. An install that fails
    /// falls back to `absent`.
    pub fn can_transition_to(self, next: GenerationState) -> bool {
        use GenerationState::*;
        matches!(
            (self, next),
            (Absent, Installing)
                | (Installing, Installed)
                | (Installing, Absent)
                | (Installed, Installing)
                | (Installed, Active)
                | (Active, Installing)
                | (Active, Active)
                | (Active, Superseded)
                | (Installed, Superseded)
                | (Superseded, Deleted)
        )
    }

    /// Checked transition.
    pub fn transition(self, next: GenerationState) -> Result<GenerationState, Error> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition { from: self.to_string(), to: next.to_string() })
        }
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absent" => Ok(GenerationState::Absent),
            "installing" => Ok(GenerationState::Installing),
            "installed" => Ok(GenerationState::Installed),
            "active" => Ok(GenerationState::Active),
            "superseded" => Ok(GenerationState::Superseded),
            "deleted" => Ok(GenerationState::Deleted),
            other => Err(Error::CorruptEntry(format!("unknown generation state: {other}"))),
        }
    }
}

/// A persisted generation row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub name: String,
    pub version: String,
    pub state: GenerationState,
    pub created_at: String,
    pub activated_at: Option<String>,
}
