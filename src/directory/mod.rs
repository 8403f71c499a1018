use async_trait::async_trait;

use crate::domain::{IdempotencyToken, Member, MemberStatus, Metadata, Profile};
use crate::error::Result;

pub mod passkit;
pub mod wire;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use passkit::PassKitDirectory;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InMemoryDirectory, ScriptedFailure};

/// What the directory needs to create a member.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub external_id: IdempotencyToken,
    pub profile: Profile,
    pub metadata: Metadata,
    pub send_welcome_email: bool,
}

/// The remote membership service. It is the system of record; nothing
/// returned here should outlive the operation that asked for it.
///
/// Lookups return `Ok(None)` for "not found". Remote failures come back as
/// `AppError::RemoteRejected` or `AppError::RemoteUnavailable` and are never
/// retried here.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Most recently created member whose email matches case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<Member>>;

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Member>>;

    async fn get(&self, member_id: &str) -> Result<Option<Member>>;

    /// Fully materialised snapshot of members currently in `status`.
    async fn list_by_status(&self, status: &MemberStatus) -> Result<Vec<Member>>;

    async fn list_all(&self) -> Result<Vec<Member>>;

    async fn create(&self, member: NewMember) -> Result<Member>;

    /// Merges `patch` into the member's metadata.
    async fn update_metadata(&self, member_id: &str, patch: Metadata) -> Result<Member>;

    async fn transition_status(&self, member_id: &str, status: &MemberStatus) -> Result<()>;

    /// Where the member downloads their wallet pass, if the directory knows.
    fn pass_url(&self, _member_id: &str) -> Option<String> {
        None
    }
}
