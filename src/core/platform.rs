//! Platform identifiers - WHICH system an environment is evaluated for.
//!
//! A platform is an opaque `<arch>-<os>` key such as `x86_64-linux`. Berth never
//! interprets it beyond equality and ordering; it only has to be a usable map key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A target platform identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Platform(String);

/// Error returned for malformed platform identifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid platform identifier `{0}`: must be non-empty with no whitespace or `/`")]
pub struct InvalidPlatform(pub String);

impl Platform {
    /// Create a platform identifier, validating its shape.
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidPlatform> {
        let s = s.into();
        if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(InvalidPlatform(s));
        }
        Ok(Platform(s))
    }

    /// The platform berth is currently running on.
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "arm" => "armv7l",
            other => other,
        };
        Platform(format!("{}-{}", arch, os))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Platform {
    type Err = InvalidPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::new(s)
    }
}

impl AsRef<str> for Platform {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Platform::new(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_validation() {
        assert!(Platform::new("x86_64-linux").is_ok());
        assert!(Platform::new("").is_err());
        assert!(Platform::new("x86_64 linux").is_err());
        assert!(Platform::new("x86_64/linux").is_err());
    }

    #[test]
    fn test_host_platform_shape() {
        let host = Platform::host();
        assert!(host.as_str().contains('-'));
        assert!(!host.as_str().contains("macos"));
    }

    #[test]
    fn test_platform_deserialize_rejects_invalid() {
        #[derive(Deserialize)]
        struct Doc {
            #[allow(dead_code)]
            systems: Vec<Platform>,
        }

        assert!(toml::from_str::<Doc>(r#"systems = ["aarch64-darwin"]"#).is_ok());
        assert!(toml::from_str::<Doc>(r#"systems = [""]"#).is_err());
    }
}
