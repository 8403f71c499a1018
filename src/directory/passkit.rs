use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::collections::HashSet;
use std::time::Duration;

use crate::{
    config::PassKitConfig,
    directory::{
        wire::{
            decode_listing, CreateMemberBody, CreatedId, FieldFilter, ListRequest, Listing,
            MemberIdBody, UpdateMemberBody, WireMember, WirePerson,
        },
        MemberDirectory, NewMember,
    },
    domain::{Member, MemberStatus, Metadata},
    error::{AppError, Result},
};

const PROJECT_KEY_HEADER: &str = "X-Project-Key";
/// Upper bound for the server-side filtered lookups; a filter that matches
/// more than this many records is already a data problem.
const FILTERED_LOOKUP_LIMIT: u32 = 100;

/// HTTP client for the membership service.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct PassKitDirectory {
    client: Client,
    config: PassKitConfig,
}

impl PassKitDirectory {
    pub fn new(config: PassKitConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(&self.config.api_key)
            .header(PROJECT_KEY_HEADER, &self.config.project_key)
    }

    /// Sends the request and turns any non-2xx answer into a rejection that
    /// carries the service's own diagnostic.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => format!("<response body unreadable: {}>", e),
        };
        tracing::debug!("Membership service answered {}: {}", status, body);
        Err(AppError::rejected(status.as_u16(), body))
    }

    async fn fetch(&self, request: &ListRequest) -> Result<Listing> {
        let path = format!("/members/member/list/{}", self.config.program_id);
        let response = self.send(self.request(Method::POST, &path).json(request)).await?;
        let body = response.text().await?;

        let listing = decode_listing(&body);
        tracing::debug!(
            "Listed {} members at offset {} ({} malformed lines skipped)",
            listing.members.len(),
            request.filters.offset,
            listing.malformed
        );
        Ok(listing)
    }

    /// One page only.
    async fn list(&self, request: ListRequest) -> Result<Vec<Member>> {
        self.fetch(&request).await?.into_members()
    }

    /// Every page, oldest first, until the service hands back a short page.
    async fn list_every_page(&self, filters: Vec<FieldFilter>) -> Result<Vec<Member>> {
        let limit = self.config.list_page_size.max(1);
        let mut request = ListRequest::new(limit, true);
        if !filters.is_empty() {
            request = request.matching(filters);
        }

        let mut combined = Listing::default();
        let mut seen = HashSet::new();
        loop {
            let page = self.fetch(&request).await?;
            let received = page.members.len() + page.malformed;
            combined.malformed += page.malformed;

            let mut fresh = 0;
            for member in page.members {
                if seen.insert(member.id.clone()) {
                    combined.members.push(member);
                    fresh += 1;
                }
            }

            if received < limit as usize {
                break;
            }
            // A deployment that ignores `offset` keeps serving the first page.
            if fresh == 0 {
                tracing::warn!(
                    "Listing page at offset {} brought no new members, stopping",
                    request.filters.offset
                );
                break;
            }
            request = request.next_page();
        }

        combined.into_members()
    }

    /// Scan of the most recently created members, for deployments that
    /// refuse a server-side filter.
    async fn recent(&self) -> Result<Vec<Member>> {
        self.list(ListRequest::new(self.config.lookup_page_size, false)).await
    }
}

/// `None` when the service refused the filter itself (a 4xx answer), so the
/// caller can fall back to listing and filtering locally. Transport failures
/// and server errors still propagate.
fn unless_filter_refused(result: Result<Vec<Member>>) -> Result<Option<Vec<Member>>> {
    match result {
        Ok(members) => Ok(Some(members)),
        Err(AppError::RemoteRejected { status, message }) if (400..500).contains(&status) => {
            tracing::warn!(
                "Server-side filter refused ({}), filtering locally instead: {}",
                status,
                message
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl MemberDirectory for PassKitDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<Member>> {
        // Not every deployment honours the email filter, and where it does
        // the match may be case-sensitive, so results are re-checked here.
        let filtered = unless_filter_refused(
            self.list(
                ListRequest::new(FILTERED_LOOKUP_LIMIT, false)
                    .matching(vec![FieldFilter::eq("person.emailAddress", email.trim())]),
            )
            .await,
        )?;
        if let Some(member) = most_recent(filtered.into_iter().flatten().filter(|m| m.has_email(email))) {
            return Ok(Some(member));
        }

        let recent = self.recent().await?;
        Ok(most_recent(recent.into_iter().filter(|m| m.has_email(email))))
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Member>> {
        let filtered = unless_filter_refused(
            self.list(
                ListRequest::new(FILTERED_LOOKUP_LIMIT, false)
                    .matching(vec![FieldFilter::eq("externalId", external_id)]),
            )
            .await,
        )?;
        let members = match filtered {
            Some(members) => members,
            None => self.recent().await?,
        };
        Ok(most_recent(
            members
                .into_iter()
                .filter(|m| m.external_id.as_deref() == Some(external_id)),
        ))
    }

    async fn get(&self, member_id: &str) -> Result<Option<Member>> {
        let path = format!("/members/member/{}", member_id);
        match self.send(self.request(Method::GET, &path)).await {
            Ok(response) => {
                let wire: WireMember = response.json().await?;
                Ok(Some(wire.into()))
            }
            Err(AppError::RemoteRejected { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_by_status(&self, status: &MemberStatus) -> Result<Vec<Member>> {
        let filtered = unless_filter_refused(
            self.list_every_page(vec![FieldFilter::eq("status", status.as_str())])
                .await,
        )?;
        let members = match filtered {
            Some(members) => members,
            None => self.list_every_page(Vec::new()).await?,
        };
        // Also guards against deployments that ignore the status filter.
        Ok(members.into_iter().filter(|m| &m.status == status).collect())
    }

    async fn list_all(&self) -> Result<Vec<Member>> {
        self.list_every_page(Vec::new()).await
    }

    async fn create(&self, member: NewMember) -> Result<Member> {
        let body = CreateMemberBody {
            program_id: self.config.program_id.clone(),
            external_id: member.external_id.to_string(),
            tier_id: self.config.tier_id.clone(),
            person: WirePerson::from(&member.profile),
            meta_data: member.metadata.clone(),
            send_welcome_email: member.send_welcome_email,
        };

        let response = self
            .send(self.request(Method::POST, "/members/member").json(&body))
            .await?;
        let created: CreatedId = response.json().await?;

        tracing::info!("Created member {} ({})", created.id, member.profile.email);
        Ok(Member {
            id: created.id,
            external_id: Some(member.external_id.to_string()),
            status: MemberStatus::Enrolled,
            profile: member.profile,
            metadata: member.metadata,
            created: Some(chrono::Utc::now()),
        })
    }

    async fn update_metadata(&self, member_id: &str, patch: Metadata) -> Result<Member> {
        let mut member = self
            .get(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))?;
        member.metadata.extend(patch);

        // The service refuses updates that omit the person's identity fields.
        let body = UpdateMemberBody {
            program_id: self.config.program_id.clone(),
            id: member.id.clone(),
            external_id: member.external_id.clone(),
            person: WirePerson::from(&member.profile),
            meta_data: member.metadata.clone(),
        };

        self.send(self.request(Method::PUT, "/members/member").json(&body))
            .await?;
        Ok(member)
    }

    async fn transition_status(&self, member_id: &str, status: &MemberStatus) -> Result<()> {
        let path = match status {
            MemberStatus::CheckedOut => "/members/member/checkOut",
            MemberStatus::CheckedIn => "/members/member/checkIn",
            other => {
                return Err(AppError::Validation(format!(
                    "Cannot transition a member to {}",
                    other
                )))
            }
        };

        let body = MemberIdBody {
            member_id: member_id.to_string(),
        };
        self.send(self.request(Method::POST, path).json(&body)).await?;
        Ok(())
    }

    fn pass_url(&self, member_id: &str) -> Option<String> {
        Some(format!(
            "{}/{}/{}",
            self.config.pass_url_base.trim_end_matches('/'),
            self.config.program_id,
            member_id
        ))
    }
}

/// Newest by creation time; records without one rank last, and ties keep
/// the service's own (newest-first) order.
fn most_recent(members: impl Iterator<Item = Member>) -> Option<Member> {
    members.fold(None, |best: Option<Member>, candidate| match best {
        Some(current) if current.created >= candidate.created => Some(current),
        _ => Some(candidate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::domain::Profile;

    fn member(id: &str, created: Option<i64>) -> Member {
        Member {
            id: id.to_string(),
            external_id: None,
            status: MemberStatus::Enrolled,
            profile: Profile::default(),
            metadata: Metadata::new(),
            created: created.and_then(|s| Utc.timestamp_opt(s, 0).single()),
        }
    }

    #[test]
    fn test_most_recent_prefers_newest() {
        let picked = most_recent(
            vec![member("old", Some(10)), member("new", Some(20)), member("none", None)].into_iter(),
        );
        assert_eq!(picked.map(|m| m.id), Some("new".to_string()));
    }

    #[test]
    fn test_most_recent_keeps_first_on_tie() {
        let picked = most_recent(vec![member("a", None), member("b", None)].into_iter());
        assert_eq!(picked.map(|m| m.id), Some("a".to_string()));
    }

    #[test]
    fn test_only_client_errors_count_as_refused_filters() {
        let refused = unless_filter_refused(Err(AppError::rejected(400, "unknown filter field")));
        assert!(matches!(refused, Ok(None)));

        let server_error = unless_filter_refused(Err(AppError::rejected(500, "boom")));
        assert!(matches!(server_error, Err(AppError::RemoteRejected { status: 500, .. })));

        let unreachable = unless_filter_refused(Err(AppError::RemoteUnavailable("reset".into())));
        assert!(matches!(unreachable, Err(AppError::RemoteUnavailable(_))));

        let listed = unless_filter_refused(Ok(vec![member("a", None)]));
        assert_eq!(listed.ok().flatten().map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_pass_url() {
        let directory = PassKitDirectory::new(PassKitConfig {
            program_id: "prog".into(),
            ..PassKitConfig::default()
        })
        .unwrap();
        assert_eq!(
            directory.pass_url("m1").as_deref(),
            Some("https://pub2.passkit.io/pass/prog/m1")
        );
    }
}
