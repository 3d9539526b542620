//! Per-platform query dialects.
//!
//! Each supported recon platform speaks its own query language: field names,
//! how values are quoted and which token joins two clauses. The registry keeps
//! those facts as static data so consumers look them up instead of branching
//! on platform keys.

mod registry;

pub use registry::{
    connector_for, dialect_for, dialects, placeholder_for, Connector, FieldStyle, LocationFields,
    PlatformDialect, SyntaxHint,
};

use crate::error::AssetMapError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A supported recon platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Hunter,
    Fofa,
    Quake,
    DayDayMap,
}

impl Platform {
    /// Every platform, in registry order.
    pub const ALL: [Platform; 4] = [
        Platform::Hunter,
        Platform::Fofa,
        Platform::Quake,
        Platform::DayDayMap,
    ];

    /// The lowercase key used on the wire and in history records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Hunter => "hunter",
            Platform::Fofa => "fofa",
            Platform::Quake => "quake",
            Platform::DayDayMap => "daydaymap",
        }
    }

    /// Name shown to the operator.
    pub fn display_name(&self) -> &'static str {
        dialect_for(*self).display_name
    }

    /// FOFA credentials are a key plus the account email.
    pub fn requires_email(&self) -> bool {
        matches!(self, Platform::Fofa)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Hunter
    }
}

impl FromStr for Platform {
    type Err = AssetMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hunter" => Ok(Platform::Hunter),
            "fofa" => Ok(Platform::Fofa),
            "quake" => Ok(Platform::Quake),
            "daydaymap" => Ok(Platform::DayDayMap),
            _ => Err(AssetMapError::UnknownPlatform(s.to_string())),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_roundtrip() {
        for platform in Platform::ALL {
            let parsed: Platform = platform.as_str().parse().expect("Should parse");
            assert_eq!(platform, parsed);
        }
    }

    #[test]
    fn test_platform_parse_is_case_insensitive() {
        assert_eq!("FOFA".parse::<Platform>().unwrap(), Platform::Fofa);
        assert_eq!(" DayDayMap ".parse::<Platform>().unwrap(), Platform::DayDayMap);
    }

    #[test]
    fn test_unknown_platform_is_an_error() {
        let err = "shodan".parse::<Platform>().unwrap_err();
        assert!(matches!(err, AssetMapError::UnknownPlatform(ref key) if key == "shodan"));
    }

    #[test]
    fn test_platform_serializes_as_key() {
        let json = serde_json::to_string(&Platform::DayDayMap).unwrap();
        assert_eq!(json, "\"daydaymap\"");
        let parsed: Platform = serde_json::from_str("\"quake\"").unwrap();
        assert_eq!(parsed, Platform::Quake);
    }

    #[test]
    fn test_only_fofa_requires_email() {
        let needing: Vec<_> = Platform::ALL
            .into_iter()
            .filter(Platform::requires_email)
            .collect();
        assert_eq!(needing, vec![Platform::Fofa]);
    }
}
