use chrono::{DateTime, Utc};
use serde::Serialize;

use super::member::{Member, MemberStatus};

/// Metadata keys that may record when a member entered their current
/// status, most specific first.
const ENTERED_AT_KEYS: &[&str] = &["lastCheckIn", "checkedInAt", "checkInTime"];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemberFailure {
    pub member_id: String,
    pub display_name: String,
    pub reason: String,
}

/// One line of the pre-transition snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub member_id: String,
    pub display_name: String,
    pub email: String,
    pub entered_status_at: Option<DateTime<Utc>>,
}

impl AuditEntry {
    pub fn from_member(member: &Member) -> Self {
        let entered_status_at = ENTERED_AT_KEYS.iter().find_map(|key| {
            member
                .metadata
                .get(*key)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
                .map(|dt| dt.with_timezone(&Utc))
        });

        Self {
            member_id: member.id.clone(),
            display_name: member.display_name().to_string(),
            email: member.profile.email.clone(),
            entered_status_at,
        }
    }
}

/// Result of one bulk status run. Built once, never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionReport {
    pub source: MemberStatus,
    pub target: MemberStatus,
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<MemberFailure>,
    pub audit: Vec<AuditEntry>,
    pub generated_at: DateTime<Utc>,
}

impl TransitionReport {
    pub fn empty(source: MemberStatus, target: MemberStatus) -> Self {
        Self {
            source,
            target,
            total: 0,
            succeeded: 0,
            failures: Vec::new(),
            audit: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of pushing one metadata patch to many members.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastReport {
    pub total: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failures: Vec<MemberFailure>,
    pub generated_at: DateTime<Utc>,
}

impl BroadcastReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Headcount {
    pub status: MemberStatus,
    pub count: usize,
    pub members: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Metadata, Profile};

    fn member_with(metadata: Metadata) -> Member {
        Member {
            id: "m1".into(),
            external_id: None,
            status: MemberStatus::CheckedIn,
            profile: Profile {
                display_name: "Ada".into(),
                email: "ada@example.com".into(),
                ..Default::default()
            },
            metadata,
            created: None,
        }
    }

    #[test]
    fn test_entered_at_from_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("checkInTime".into(), "garbage".into());
        metadata.insert("checkedInAt".into(), "2025-03-01T19:30:00Z".into());
        let entry = AuditEntry::from_member(&member_with(metadata));
        assert_eq!(
            entry.entered_status_at.map(|dt| dt.to_rfc3339()),
            Some("2025-03-01T19:30:00+00:00".to_string())
        );
    }

    #[test]
    fn test_entered_at_absent() {
        let entry = AuditEntry::from_member(&member_with(Metadata::new()));
        assert!(entry.entered_status_at.is_none());
        assert_eq!(entry.display_name, "Ada");
    }
}
