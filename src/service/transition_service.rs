use std::sync::Arc;

use chrono::Utc;

use crate::{
    directory::MemberDirectory,
    domain::*,
    error::Result,
};

/// Moves a cohort of members from one status to another, one member at a
/// time, and reports exactly what happened to each.
pub struct TransitionService {
    directory: Arc<dyn MemberDirectory>,
}

impl TransitionService {
    pub fn new(directory: Arc<dyn MemberDirectory>) -> Self {
        Self { directory }
    }

    /// Members currently in `status`, fully materialised.
    pub async fn snapshot(&self, status: &MemberStatus) -> Result<Vec<Member>> {
        self.directory.list_by_status(status).await
    }

    /// Lists the source cohort and transitions it. Only a failed listing
    /// fails the run.
    pub async fn run(&self, source: &MemberStatus, target: &MemberStatus) -> Result<TransitionReport> {
        let snapshot = self.snapshot(source).await?;
        tracing::info!("Found {} members in {}", snapshot.len(), source);
        Ok(self.run_on(source, target, snapshot).await)
    }

    /// Transitions an already-taken snapshot, in order. Every member is
    /// attempted exactly once.
    pub async fn run_on(
        &self,
        source: &MemberStatus,
        target: &MemberStatus,
        snapshot: Vec<Member>,
    ) -> TransitionReport {
        if snapshot.is_empty() {
            return TransitionReport::empty(source.clone(), target.clone());
        }

        let audit: Vec<AuditEntry> = snapshot.iter().map(AuditEntry::from_member).collect();
        let total = snapshot.len();
        let mut succeeded = 0;
        let mut failures = Vec::new();

        for (index, member) in snapshot.iter().enumerate() {
            match self.directory.transition_status(&member.id, target).await {
                Ok(()) => {
                    succeeded += 1;
                    tracing::debug!("{}/{}: {} -> {}", index + 1, total, member.display_name(), target);
                }
                Err(e) => {
                    tracing::warn!(
                        "{}/{}: failed to move {} ({}) to {}: {}",
                        index + 1,
                        total,
                        member.display_name(),
                        member.id,
                        target,
                        e
                    );
                    failures.push(MemberFailure {
                        member_id: member.id.clone(),
                        display_name: member.display_name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Moved {}/{} members from {} to {} ({} failed)",
            succeeded,
            total,
            source,
            target,
            failures.len()
        );

        TransitionReport {
            source: source.clone(),
            target: target.clone(),
            total,
            succeeded,
            failures,
            audit,
            generated_at: Utc::now(),
        }
    }

    /// Nightly sweep: everyone still checked in gets checked out.
    pub async fn check_out_all(&self) -> Result<TransitionReport> {
        self.run(&MemberStatus::CheckedIn, &MemberStatus::CheckedOut).await
    }

    pub async fn headcount(&self, status: &MemberStatus) -> Result<Headcount> {
        let members = self.snapshot(status).await?;
        Ok(Headcount {
            status: status.clone(),
            count: members.len(),
            members: members.iter().map(|m| m.display_name().to_string()).collect(),
            updated_at: Utc::now(),
        })
    }
}
