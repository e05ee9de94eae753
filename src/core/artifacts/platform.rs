//! Host markers and fixed-availability artifacts
//!
//! Marker artifacts have no build step. Depending on one ties an artifact to
//! a host OS (`mac`, `linux`, `windows`) or to a declared switch (`opt`).

use std::fmt;

use crate::core::dependency::Optional;

/// Operating systems a marker can stand for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Mac,
    Linux,
    Windows,
}

impl HostOs {
    /// Value of `std::env::consts::OS` for this system
    pub fn os_name(self) -> &'static str {
        match self {
            Self::Mac => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }

    /// Whether the running host is this OS
    pub fn is_current(self) -> bool {
        std::env::consts::OS == self.os_name()
    }

    /// Marker kind name, as written in a manifest
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "mac" => Some(Self::Mac),
            "linux" => Some(Self::Linux),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Mac => "mac",
            Self::Linux => "linux",
            Self::Windows => "windows",
        };
        f.write_str(kind)
    }
}

/// Available only on one host OS; decided once, at construction
#[derive(Debug, Clone, Copy)]
pub struct HostMarker {
    os: HostOs,
    available: bool,
}

impl HostMarker {
    pub fn new(os: HostOs) -> Self {
        let available = os.is_current();
        tracing::debug!(os = %os, available, "host marker");
        Self { os, available }
    }

    pub fn os(&self) -> HostOs {
        self.os
    }
}

impl Optional for HostMarker {
    fn is_available(&self) -> bool {
        self.available
    }
}

/// Availability fixed by configuration
#[derive(Debug, Clone, Copy)]
pub struct FixedAvailability(pub bool);

impl Optional for FixedAvailability {
    fn is_available(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_marker_matches_known_hosts() {
        let matching: Vec<HostOs> = [HostOs::Mac, HostOs::Linux, HostOs::Windows]
            .into_iter()
            .filter(|os| HostMarker::new(*os).is_available())
            .collect();

        if ["macos", "linux", "windows"].contains(&std::env::consts::OS) {
            assert_eq!(matching.len(), 1);
        } else {
            assert!(matching.is_empty());
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_marker_on_linux() {
        assert!(HostMarker::new(HostOs::Linux).is_available());
        assert!(!HostMarker::new(HostOs::Mac).is_available());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(HostOs::from_kind("mac"), Some(HostOs::Mac));
        assert_eq!(HostOs::from_kind("windows"), Some(HostOs::Windows));
        assert_eq!(HostOs::from_kind("solaris"), None);
        assert_eq!(HostOs::Linux.to_string(), "linux");
    }

    #[test]
    fn test_fixed_availability() {
        assert!(FixedAvailability(true).is_available());
        assert!(!FixedAvailability(false).is_available());
    }
}
