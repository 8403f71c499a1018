use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::EnrollmentConfig,
    directory::{MemberDirectory, NewMember},
    domain::*,
    error::{AppError, Result},
    service::email_locks::EmailLocks,
};

/// Creates each person's member record at most once, however many times the
/// same enrollment is submitted.
pub struct EnrollmentService {
    directory: Arc<dyn MemberDirectory>,
    defaults: EnrollmentConfig,
    locks: EmailLocks,
}

impl EnrollmentService {
    pub fn new(directory: Arc<dyn MemberDirectory>, defaults: EnrollmentConfig) -> Self {
        Self {
            directory,
            defaults,
            locks: EmailLocks::new(),
        }
    }

    /// The token this person would be tagged with. Without a caller salt the
    /// submission time is used, so only the email check catches a repeated
    /// manual entry.
    pub fn token_for(&self, person: &Person) -> IdempotencyToken {
        if let Some(token) = person.idempotency_token.as_deref().filter(|t| !t.trim().is_empty()) {
            return IdempotencyToken::new(token.trim());
        }

        let salt = person
            .salt
            .clone()
            .unwrap_or_else(|| Utc::now().timestamp().to_string());
        IdempotencyToken::derive(&person.provenance, &person.email, &salt)
    }

    pub async fn enroll(&self, person: Person) -> Result<EnrollmentResult> {
        person.validate()?;
        let token = self.token_for(&person);

        let _guard = self.locks.lock(&person.email).await;

        // A lookup we could not complete is not a miss: creating blind is how
        // duplicates happen.
        if let Some(existing) = self.find_existing(&person, &token).await? {
            tracing::info!(
                "Member already exists for {} ({}), nothing created",
                person.email,
                existing.id
            );
            return Ok(self.already_existed(existing, token));
        }

        let new_member = NewMember {
            external_id: token.clone(),
            profile: person.profile(),
            metadata: self.initial_metadata(&person),
            send_welcome_email: true,
        };

        match self.directory.create(new_member).await {
            Ok(member) => {
                tracing::info!("Enrolled {} as member {}", person.email, member.id);
                Ok(EnrollmentResult {
                    pass_url: self.directory.pass_url(&member.id),
                    member_id: member.id,
                    status: EnrollmentStatus::Created,
                    idempotency_token: token,
                })
            }
            Err(e) if e.is_email_conflict() => self.resolve_conflict(&person, token, e).await,
            Err(e) => {
                tracing::error!("Enrollment failed for {}: {}", person.email, e);
                Err(e)
            }
        }
    }

    /// Enrolls everyone in order. One person's failure is recorded and the
    /// rest still go ahead.
    pub async fn enroll_batch(&self, people: Vec<Person>) -> BatchEnrollmentSummary {
        let mut summary = BatchEnrollmentSummary::default();

        for (position, person) in people.into_iter().enumerate() {
            let email = person.email.clone();
            match self.enroll(person).await {
                Ok(result) => {
                    match result.status {
                        EnrollmentStatus::Created => summary.created += 1,
                        EnrollmentStatus::AlreadyExisted => summary.already_existed += 1,
                    }
                    summary.results.push(result);
                }
                Err(e) => {
                    tracing::warn!("Batch entry {} ({}) failed: {}", position + 1, email, e);
                    summary.failed.push(EnrollmentFailure {
                        email,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Batch enrollment: {} created, {} already existed, {} failed",
            summary.created,
            summary.already_existed,
            summary.failed.len()
        );
        summary
    }

    async fn find_existing(&self, person: &Person, token: &IdempotencyToken) -> Result<Option<Member>> {
        if let Some(member) = self.directory.find_by_email(&person.email).await? {
            return Ok(Some(member));
        }
        self.directory.find_by_external_id(token.as_str()).await
    }

    /// Another writer created the record between our lookup and our create.
    async fn resolve_conflict(
        &self,
        person: &Person,
        token: IdempotencyToken,
        rejection: AppError,
    ) -> Result<EnrollmentResult> {
        tracing::warn!(
            "Create for {} rejected as a conflict, re-checking: {}",
            person.email,
            rejection
        );

        match self.directory.find_by_email(&person.email).await {
            Ok(Some(existing)) => Ok(self.already_existed(existing, token)),
            Ok(None) => Err(rejection),
            Err(e) => {
                tracing::warn!("Re-check for {} failed: {}", person.email, e);
                Err(rejection)
            }
        }
    }

    fn already_existed(&self, member: Member, token: IdempotencyToken) -> EnrollmentResult {
        EnrollmentResult {
            pass_url: self.directory.pass_url(&member.id),
            member_id: member.id,
            status: EnrollmentStatus::AlreadyExisted,
            idempotency_token: member
                .external_id
                .map(IdempotencyToken::new)
                .unwrap_or(token),
        }
    }

    fn initial_metadata(&self, person: &Person) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("nextMatch".to_string(), self.defaults.default_next_match.clone());
        metadata.insert(
            "membershipType".to_string(),
            person
                .membership_type
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| self.defaults.default_membership_type.clone()),
        );
        metadata.insert("joinDate".to_string(), Utc::now().format("%Y-%m-%d").to_string());
        metadata.insert("source".to_string(), person.provenance.clone());
        metadata
    }
}
