use std::sync::Arc;

use chrono::Utc;

use crate::{
    directory::MemberDirectory,
    domain::*,
    error::Result,
};

pub const NEXT_MATCH_KEY: &str = "nextMatch";

/// Only touch members whose metadata `key` currently equals `value`.
#[derive(Debug, Clone)]
pub struct MetadataCondition {
    pub key: String,
    pub value: String,
}

/// Pushes one metadata patch (typically the next-match display string) to
/// every member, tolerating per-member failures.
pub struct MetadataBroadcastService {
    directory: Arc<dyn MemberDirectory>,
    placeholder_next_match: String,
}

impl MetadataBroadcastService {
    pub fn new(directory: Arc<dyn MemberDirectory>, placeholder_next_match: String) -> Self {
        Self {
            directory,
            placeholder_next_match,
        }
    }

    pub async fn broadcast(
        &self,
        patch: Metadata,
        only_if: Option<MetadataCondition>,
    ) -> Result<BroadcastReport> {
        let members = self.directory.list_all().await?;
        let listed = members.len();

        let targets: Vec<Member> = match &only_if {
            Some(condition) => members
                .into_iter()
                .filter(|m| m.metadata.get(&condition.key) == Some(&condition.value))
                .collect(),
            None => members,
        };

        let mut report = BroadcastReport {
            total: targets.len(),
            updated: 0,
            skipped: listed - targets.len(),
            failures: Vec::new(),
            generated_at: Utc::now(),
        };

        for member in &targets {
            match self.directory.update_metadata(&member.id, patch.clone()).await {
                Ok(_) => report.updated += 1,
                Err(e) => {
                    tracing::warn!("Failed to update {} ({}): {}", member.display_name(), member.id, e);
                    report.failures.push(MemberFailure {
                        member_id: member.id.clone(),
                        display_name: member.display_name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Metadata broadcast: {}/{} updated, {} skipped, {} failed",
            report.updated,
            report.total,
            report.skipped,
            report.failed()
        );
        Ok(report)
    }

    /// Sets `nextMatch` on every member, or only on those still showing the
    /// enrollment placeholder.
    pub async fn update_next_match(&self, display: &str, only_placeholders: bool) -> Result<BroadcastReport> {
        let mut patch = Metadata::new();
        patch.insert(NEXT_MATCH_KEY.to_string(), display.to_string());

        let condition = only_placeholders.then(|| MetadataCondition {
            key: NEXT_MATCH_KEY.to_string(),
            value: self.placeholder_next_match.clone(),
        });

        self.broadcast(patch, condition).await
    }
}
