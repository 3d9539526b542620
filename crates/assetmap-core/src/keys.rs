//! API key management for the recon platforms.
//!
//! Keys are stored by the backend. FOFA credentials are a key plus the
//! account email, so every FOFA call must carry one; the other platforms take
//! the key alone.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{ApiKeyEntry, KeyValidation, SharedBackend};
use crate::dialect::Platform;
use crate::error::{AssetMapError, Result};

/// Counts from a batch add. Failures do not stop the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// A key together with its validation result.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCheck {
    pub entry: ApiKeyEntry,
    /// `Err` holds the transport or backend failure message.
    pub outcome: std::result::Result<KeyValidation, String>,
}

/// Split pasted text into keys: one per line, trimmed, blanks dropped.
pub fn parse_batch(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Key operations for one backend.
#[derive(Clone)]
pub struct KeyManager {
    backend: SharedBackend,
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager").finish_non_exhaustive()
    }
}

fn checked_email(platform: Platform, email: Option<&str>) -> Result<Option<&str>> {
    let email = email.map(str::trim).filter(|e| !e.is_empty());
    if platform.requires_email() && email.is_none() {
        return Err(AssetMapError::Validation {
            field: "email".into(),
            message: format!("{} keys require the account email", platform.display_name()),
        });
    }
    Ok(if platform.requires_email() { email } else { None })
}

fn checked_key(api_key: &str) -> Result<&str> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err(AssetMapError::empty("api key"));
    }
    Ok(key)
}

impl KeyManager {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    pub async fn list(&self, platform: Platform) -> Result<Vec<ApiKeyEntry>> {
        let keys = self.backend.get_api_keys(platform).await?;
        debug!("{} has {} key(s)", platform, keys.api_keys.len());
        Ok(keys.entries())
    }

    pub async fn add(&self, platform: Platform, api_key: &str, email: Option<&str>) -> Result<()> {
        let key = checked_key(api_key)?;
        let email = checked_email(platform, email)?;
        self.backend.add_api_key(platform, key, email).await
    }

    /// Add every key in newline-separated `text`.
    ///
    /// Each key is added independently; the outcome counts both results.
    pub async fn add_batch(
        &self,
        platform: Platform,
        text: &str,
        email: Option<&str>,
    ) -> Result<BatchOutcome> {
        let keys = parse_batch(text);
        if keys.is_empty() {
            return Err(AssetMapError::empty("key batch"));
        }
        let email = checked_email(platform, email)?;

        let mut outcome = BatchOutcome::default();
        for key in keys {
            match self.backend.add_api_key(platform, key, email).await {
                Ok(()) => outcome.succeeded += 1,
                Err(err) => {
                    warn!("Adding {} key failed: {}", platform, err);
                    outcome.failed += 1;
                }
            }
        }
        info!(
            "Batch add for {}: {} succeeded, {} failed",
            platform, outcome.succeeded, outcome.failed
        );
        Ok(outcome)
    }

    pub async fn delete(&self, platform: Platform, api_key: &str, email: Option<&str>) -> Result<()> {
        let key = checked_key(api_key)?;
        let email = checked_email(platform, email)?;
        self.backend.delete_api_key(platform, key, email).await
    }

    pub async fn validate(
        &self,
        platform: Platform,
        api_key: &str,
        email: Option<&str>,
    ) -> Result<KeyValidation> {
        let key = checked_key(api_key)?;
        let email = checked_email(platform, email)?;
        self.backend.validate_api_key(platform, key, email).await
    }

    /// Validate every configured key of a platform, one after another.
    pub async fn validate_all(&self, platform: Platform) -> Result<Vec<KeyCheck>> {
        let entries = self.list(platform).await?;
        let mut checks = Vec::with_capacity(entries.len());
        for entry in entries {
            let outcome = self
                .validate(platform, &entry.key, entry.email.as_deref())
                .await
                .map_err(|err| err.user_message());
            checks.push(KeyCheck { entry, outcome });
        }
        Ok(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_trims_and_drops_blanks() {
        let text = "  key-one \n\n\tkey-two\r\n   \nkey-three";
        assert_eq!(parse_batch(text), vec!["key-one", "key-two", "key-three"]);
        assert!(parse_batch(" \n \n").is_empty());
    }

    #[test]
    fn test_fofa_requires_email() {
        assert!(matches!(
            checked_email(Platform::Fofa, None),
            Err(AssetMapError::Validation { .. })
        ));
        assert!(matches!(
            checked_email(Platform::Fofa, Some("  ")),
            Err(AssetMapError::Validation { .. })
        ));
        assert_eq!(
            checked_email(Platform::Fofa, Some(" a@example.com ")).unwrap(),
            Some("a@example.com")
        );
    }

    #[test]
    fn test_email_dropped_for_other_platforms() {
        assert_eq!(checked_email(Platform::Hunter, Some("a@example.com")).unwrap(), None);
        assert_eq!(checked_email(Platform::Quake, None).unwrap(), None);
    }

    #[test]
    fn test_batch_outcome() {
        let outcome = BatchOutcome {
            succeeded: 2,
            failed: 1,
        };
        assert_eq!(outcome.total(), 3);
        assert!(!outcome.all_succeeded());
    }
}
