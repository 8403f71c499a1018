use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::member::normalize_email;

/// Tag written to a member at creation so a repeat submission carrying the
/// same token is recognised. Write-once per member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Deterministic in (provenance, normalized email, salt). The same salt
    /// reproduces the same token; a new salt (next season's renewal, a new
    /// order) yields a distinct one.
    pub fn derive(provenance: &str, email: &str, salt: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize_email(email).as_bytes());
        hasher.update(b"\n");
        hasher.update(salt.as_bytes());
        let digest = hex::encode(hasher.finalize());

        Self(format!("{}_{}", provenance_slug(provenance), &digest[..32]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn provenance_slug(provenance: &str) -> String {
    let slug = provenance
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// The service was asked to create the member and send its welcome notification.
    Created,
    /// A matching member was already there; nothing was written.
    AlreadyExisted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentResult {
    pub member_id: String,
    pub status: EnrollmentStatus,
    pub idempotency_token: IdempotencyToken,
    pub pass_url: Option<String>,
}

impl EnrollmentResult {
    pub fn is_new(&self) -> bool {
        self.status == EnrollmentStatus::Created
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentFailure {
    pub email: String,
    pub reason: String,
}

/// Outcome of enrolling several people in one go (a multi-membership order,
/// a manual batch).
#[derive(Debug, Clone, Serialize, Default)]
pub struct BatchEnrollmentSummary {
    pub created: usize,
    pub already_existed: usize,
    pub failed: Vec<EnrollmentFailure>,
    pub results: Vec<EnrollmentResult>,
}

impl BatchEnrollmentSummary {
    pub fn total(&self) -> usize {
        self.created + self.already_existed + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic_and_case_insensitive() {
        let a = IdempotencyToken::derive("manual", "Jamie@Example.com", "order-1");
        let b = IdempotencyToken::derive("manual", "jamie@example.com ", "order-1");
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("manual_"));
        assert_eq!(a.as_str().len(), "manual_".len() + 32);
    }

    #[test]
    fn test_derive_distinguishes_salt_and_source() {
        let base = IdempotencyToken::derive("manual", "a@x.com", "2025");
        assert_ne!(base, IdempotencyToken::derive("manual", "a@x.com", "2026"));
        assert_ne!(base, IdempotencyToken::derive("csv-backfill", "a@x.com", "2025"));
        assert_ne!(base, IdempotencyToken::derive("manual", "b@x.com", "2025"));
    }

    #[test]
    fn test_provenance_slug() {
        assert_eq!(provenance_slug("Squarespace Webhook"), "squarespace-webhook");
        assert_eq!(provenance_slug("webhook-order"), "webhook-order");
        assert_eq!(provenance_slug("  "), "unknown");
    }
}
