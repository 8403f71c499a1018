//! In-memory directory for tests, with call counters and scripted failures.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    directory::{MemberDirectory, NewMember},
    domain::{Member, MemberStatus, Metadata, Person},
    error::{AppError, Result},
};

/// A failure the fake should produce instead of doing the work.
#[derive(Debug, Clone)]
pub enum ScriptedFailure {
    Rejected(u16, String),
    Unavailable(String),
}

impl ScriptedFailure {
    fn to_error(&self) -> AppError {
        match self {
            ScriptedFailure::Rejected(status, message) => AppError::rejected(*status, message.clone()),
            ScriptedFailure::Unavailable(message) => AppError::RemoteUnavailable(message.clone()),
        }
    }
}

#[derive(Default)]
struct State {
    members: Vec<Member>,
    create_calls: Vec<NewMember>,
    transition_calls: Vec<(String, MemberStatus)>,
    metadata_calls: Vec<(String, Metadata)>,
    lookup_calls: usize,
    lookup_failure: Option<ScriptedFailure>,
    list_failure: Option<ScriptedFailure>,
    create_failure: Option<ScriptedFailure>,
    /// Inserted right before a create is rejected, as if another process
    /// won the race.
    racing_member: Option<Person>,
    transition_failures: HashMap<String, ScriptedFailure>,
    metadata_failures: HashMap<String, ScriptedFailure>,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from the assertions.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds an existing member, newer than every member seeded before it.
    pub fn seed(&self, person: &Person, status: MemberStatus) -> Member {
        let mut state = self.state();
        let member = Self::build_member(&state, person.profile(), None, status, Metadata::new());
        state.members.push(member.clone());
        member
    }

    pub fn seed_with_metadata(&self, person: &Person, status: MemberStatus, metadata: Metadata) -> Member {
        let mut state = self.state();
        let member = Self::build_member(&state, person.profile(), None, status, metadata);
        state.members.push(member.clone());
        member
    }

    fn build_member(
        state: &State,
        profile: crate::domain::Profile,
        external_id: Option<String>,
        status: MemberStatus,
        metadata: Metadata,
    ) -> Member {
        let created = Utc::now() + Duration::seconds(state.members.len() as i64);
        Member {
            id: Uuid::new_v4().simple().to_string(),
            external_id,
            status,
            profile,
            metadata,
            created: Some(created),
        }
    }

    pub fn fail_lookups(&self, failure: ScriptedFailure) {
        self.state().lookup_failure = Some(failure);
    }

    pub fn fail_listing(&self, failure: ScriptedFailure) {
        self.state().list_failure = Some(failure);
    }

    pub fn fail_creates(&self, failure: ScriptedFailure) {
        self.state().create_failure = Some(failure);
    }

    /// Next create is rejected as a conflict after `winner` appears.
    pub fn lose_create_race_to(&self, winner: Person) {
        let mut state = self.state();
        state.racing_member = Some(winner);
        state.create_failure = Some(ScriptedFailure::Rejected(
            409,
            "member with this emailAddress already exists".to_string(),
        ));
    }

    pub fn fail_transition_for(&self, member_id: &str, failure: ScriptedFailure) {
        self.state().transition_failures.insert(member_id.to_string(), failure);
    }

    pub fn fail_metadata_update_for(&self, member_id: &str, failure: ScriptedFailure) {
        self.state().metadata_failures.insert(member_id.to_string(), failure);
    }

    pub fn members(&self) -> Vec<Member> {
        self.state().members.clone()
    }

    pub fn create_calls(&self) -> Vec<NewMember> {
        self.state().create_calls.clone()
    }

    pub fn transition_calls(&self) -> Vec<(String, MemberStatus)> {
        self.state().transition_calls.clone()
    }

    pub fn metadata_calls(&self) -> Vec<(String, Metadata)> {
        self.state().metadata_calls.clone()
    }

    pub fn lookup_calls(&self) -> usize {
        self.state().lookup_calls
    }

    fn newest_matching(state: &State, predicate: impl Fn(&Member) -> bool) -> Option<Member> {
        state
            .members
            .iter()
            .filter(|m| predicate(m))
            .max_by_key(|m| m.created)
            .cloned()
    }
}

#[async_trait]
impl MemberDirectory for InMemoryDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<Member>> {
        let mut state = self.state();
        state.lookup_calls += 1;
        if let Some(failure) = &state.lookup_failure {
            return Err(failure.to_error());
        }
        Ok(Self::newest_matching(&state, |m| m.has_email(email)))
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Member>> {
        let mut state = self.state();
        state.lookup_calls += 1;
        if let Some(failure) = &state.lookup_failure {
            return Err(failure.to_error());
        }
        Ok(Self::newest_matching(&state, |m| {
            m.external_id.as_deref() == Some(external_id)
        }))
    }

    async fn get(&self, member_id: &str) -> Result<Option<Member>> {
        Ok(self.state().members.iter().find(|m| m.id == member_id).cloned())
    }

    async fn list_by_status(&self, status: &MemberStatus) -> Result<Vec<Member>> {
        let state = self.state();
        if let Some(failure) = &state.list_failure {
            return Err(failure.to_error());
        }
        Ok(state.members.iter().filter(|m| &m.status == status).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<Member>> {
        let state = self.state();
        if let Some(failure) = &state.list_failure {
            return Err(failure.to_error());
        }
        Ok(state.members.clone())
    }

    async fn create(&self, member: NewMember) -> Result<Member> {
        let mut state = self.state();
        state.create_calls.push(member.clone());

        if let Some(failure) = state.create_failure.take() {
            if let Some(winner) = state.racing_member.take() {
                let racer = Self::build_member(
                    &state,
                    winner.profile(),
                    None,
                    MemberStatus::Enrolled,
                    Metadata::new(),
                );
                state.members.push(racer);
            }
            return Err(failure.to_error());
        }

        let created = Self::build_member(
            &state,
            member.profile,
            Some(member.external_id.to_string()),
            MemberStatus::Enrolled,
            member.metadata,
        );
        state.members.push(created.clone());
        Ok(created)
    }

    async fn update_metadata(&self, member_id: &str, patch: Metadata) -> Result<Member> {
        let mut state = self.state();
        state.metadata_calls.push((member_id.to_string(), patch.clone()));
        if let Some(failure) = state.metadata_failures.get(member_id) {
            return Err(failure.to_error());
        }

        let member = state
            .members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))?;
        member.metadata.extend(patch);
        Ok(member.clone())
    }

    async fn transition_status(&self, member_id: &str, status: &MemberStatus) -> Result<()> {
        let mut state = self.state();
        state.transition_calls.push((member_id.to_string(), status.clone()));
        if let Some(failure) = state.transition_failures.get(member_id) {
            return Err(failure.to_error());
        }

        let member = state
            .members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| AppError::rejected(404, format!("member {} not found", member_id)))?;
        member.status = status.clone();
        Ok(())
    }

    fn pass_url(&self, member_id: &str) -> Option<String> {
        Some(format!("memory://pass/{}", member_id))
    }
}
