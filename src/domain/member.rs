use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Free-form annotations stored on the remote record (e.g. `nextMatch`).
pub type Metadata = BTreeMap<String, String>;

/// Lower-cased, trimmed email used for every comparison. The stored value
/// keeps whatever casing the person typed.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A member as the membership service holds it. Never cached beyond one
/// operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: String,
    pub external_id: Option<String>,
    pub status: MemberStatus,
    pub profile: Profile,
    #[serde(default)]
    pub metadata: Metadata,
    pub created: Option<DateTime<Utc>>,
}

impl Member {
    pub fn display_name(&self) -> &str {
        &self.profile.display_name
    }

    pub fn has_email(&self, email: &str) -> bool {
        normalize_email(&self.profile.email) == normalize_email(email)
    }
}

/// Identity fields embedded in a member record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Profile {
    pub forename: String,
    pub surname: String,
    pub display_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemberStatus {
    Enrolled,
    CheckedIn,
    CheckedOut,
    /// Any status the service reports that this crate does not act on.
    Other(String),
}

impl MemberStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MemberStatus::Enrolled => "ENROLLED",
            MemberStatus::CheckedIn => "CHECKED_IN",
            MemberStatus::CheckedOut => "CHECKED_OUT",
            MemberStatus::Other(s) => s.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ENROLLED" => MemberStatus::Enrolled,
            "CHECKED_IN" => MemberStatus::CheckedIn,
            "CHECKED_OUT" => MemberStatus::CheckedOut,
            _ => MemberStatus::Other(s.to_string()),
        }
    }
}

impl From<String> for MemberStatus {
    fn from(s: String) -> Self {
        MemberStatus::parse(&s)
    }
}

impl From<MemberStatus> for String {
    fn from(status: MemberStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate member handed to the enrollment service. Transient.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Person {
    pub given_name: String,
    pub family_name: String,
    pub display_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub membership_type: Option<String>,
    /// Where the request came from: "manual", "webhook-order", "csv-backfill"...
    pub provenance: String,
    /// Caller-supplied token; derived from provenance/email/salt when absent.
    pub idempotency_token: Option<String>,
    /// Uniqueness salt picked by the caller (order id, submission time).
    pub salt: Option<String>,
}

impl Person {
    pub fn new(
        given_name: impl Into<String>,
        family_name: impl Into<String>,
        email: impl Into<String>,
        provenance: impl Into<String>,
    ) -> Self {
        Self {
            given_name: given_name.into(),
            family_name: family_name.into(),
            email: email.into(),
            provenance: provenance.into(),
            ..Default::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.idempotency_token = Some(token.into());
        self
    }

    pub fn display_name(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{} {}", self.given_name.trim(), self.family_name.trim())
                .trim()
                .to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let email = self.email.trim();
        let valid_email = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'))
            .unwrap_or(false);
        if !valid_email {
            return Err(AppError::Validation(format!("Invalid email address: {}", self.email)));
        }

        if self.given_name.trim().is_empty() && self.family_name.trim().is_empty() {
            return Err(AppError::Validation(format!("A name is required for {}", self.email)));
        }

        Ok(())
    }

    pub fn profile(&self) -> Profile {
        Profile {
            forename: self.given_name.trim().to_string(),
            surname: self.family_name.trim().to_string(),
            display_name: self.display_name(),
            email: self.email.trim().to_string(),
            phone: self.phone.clone().filter(|p| !p.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(MemberStatus::CheckedIn.as_str(), "CHECKED_IN");
        assert_eq!(MemberStatus::parse("checked_out"), MemberStatus::CheckedOut);
        assert_eq!(
            MemberStatus::parse("SUSPENDED"),
            MemberStatus::Other("SUSPENDED".to_string())
        );
    }

    #[test]
    fn test_display_name_derivation() {
        let person = Person::new("Jamie", "Laughlin", "jamie@example.com", "manual");
        assert_eq!(person.display_name(), "Jamie Laughlin");

        let person = Person {
            display_name: Some("  ".into()),
            ..Person::new("Jamie", "", "jamie@example.com", "manual")
        };
        assert_eq!(person.display_name(), "Jamie");

        let person = Person {
            display_name: Some("JL".into()),
            ..Person::new("Jamie", "Laughlin", "jamie@example.com", "manual")
        };
        assert_eq!(person.display_name(), "JL");
    }

    #[test]
    fn test_validate() {
        assert!(Person::new("A", "B", "a@b.com", "manual").validate().is_ok());
        assert!(Person::new("A", "B", "nope", "manual").validate().is_err());
        assert!(Person::new("A", "B", "@b.com", "manual").validate().is_err());
        assert!(Person::new("", " ", "a@b.com", "manual").validate().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
    }
}
