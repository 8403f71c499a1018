//! Wire shapes of the membership service and the listing decoder.
//!
//! Listing responses are newline-delimited JSON, one `{"result": {...}}`
//! envelope per line. Every unwrap of that envelope goes through
//! [`decode_line`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{Member, MemberStatus, Metadata, Profile},
    error::{AppError, Result},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePerson {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub forename: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub surname: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
}

impl From<&Profile> for WirePerson {
    fn from(profile: &Profile) -> Self {
        Self {
            forename: profile.forename.clone(),
            surname: profile.surname.clone(),
            display_name: profile.display_name.clone(),
            email_address: profile.email.clone(),
            mobile_number: profile.phone.clone(),
        }
    }
}

impl From<WirePerson> for Profile {
    fn from(person: WirePerson) -> Self {
        Self {
            forename: person.forename,
            surname: person.surname,
            display_name: person.display_name,
            email: person.email_address,
            phone: person.mobile_number.filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMember {
    pub id: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub person: WirePerson,
    #[serde(default)]
    pub meta_data: BTreeMap<String, Value>,
    #[serde(default)]
    pub created: Option<String>,
}

impl From<WireMember> for Member {
    fn from(wire: WireMember) -> Self {
        let metadata = wire
            .meta_data
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();

        Member {
            id: wire.id,
            external_id: wire.external_id.filter(|e| !e.is_empty()),
            status: wire
                .status
                .as_deref()
                .map(MemberStatus::parse)
                .unwrap_or(MemberStatus::Enrolled),
            profile: wire.person.into(),
            metadata,
            created: wire
                .created
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    result: WireMember,
}

/// One decoded line of a listing response.
#[derive(Debug)]
pub enum ListLine {
    Enveloped(Member),
    Malformed(String),
}

/// Decoded listing: the members in response order plus how many lines had
/// to be skipped.
#[derive(Debug, Default)]
pub struct Listing {
    pub members: Vec<Member>,
    pub malformed: usize,
}

impl Listing {
    /// Members of the listing, unless every line was unreadable, in which
    /// case the response cannot be told apart from a broken one.
    pub fn into_members(self) -> Result<Vec<Member>> {
        if self.members.is_empty() && self.malformed > 0 {
            return Err(AppError::MalformedRecord(format!(
                "all {} listing lines failed to decode",
                self.malformed
            )));
        }
        Ok(self.members)
    }
}

pub fn decode_line(line: &str) -> ListLine {
    match serde_json::from_str::<Envelope>(line) {
        Ok(envelope) => ListLine::Enveloped(envelope.result.into()),
        Err(_) => ListLine::Malformed(line.to_string()),
    }
}

pub fn decode_listing(body: &str) -> Listing {
    let mut listing = Listing::default();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match decode_line(line) {
            ListLine::Enveloped(member) => listing.members.push(member),
            ListLine::Malformed(raw) => {
                let preview: String = raw.chars().take(120).collect();
                tracing::warn!("Skipping malformed listing line: {}", preview);
                listing.malformed += 1;
            }
        }
    }

    listing
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub filter_field: String,
    pub filter_value: String,
    pub filter_operator: String,
}

impl FieldFilter {
    pub fn eq(field: &str, value: &str) -> Self {
        Self {
            filter_field: field.to_string(),
            filter_value: value.to_string(),
            filter_operator: "eq".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    pub condition: String,
    pub field_filters: Vec<FieldFilter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilters {
    pub limit: u32,
    pub offset: u32,
    pub order_by: String,
    pub order_asc: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter_groups: Vec<FilterGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListRequest {
    pub filters: ListFilters,
}

impl ListRequest {
    pub fn new(limit: u32, order_asc: bool) -> Self {
        Self {
            filters: ListFilters {
                limit,
                offset: 0,
                order_by: "created".to_string(),
                order_asc,
                filter_groups: Vec::new(),
            },
        }
    }

    /// Adds an AND group of equality filters.
    pub fn matching(mut self, filters: Vec<FieldFilter>) -> Self {
        self.filters.filter_groups.push(FilterGroup {
            condition: "AND".to_string(),
            field_filters: filters,
        });
        self
    }

    /// Same request, one page further on.
    pub fn next_page(mut self) -> Self {
        self.filters.offset += self.filters.limit;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberBody {
    pub program_id: String,
    pub external_id: String,
    pub tier_id: String,
    pub person: WirePerson,
    pub meta_data: Metadata,
    pub send_welcome_email: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberBody {
    pub program_id: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub person: WirePerson,
    pub meta_data: Metadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberIdBody {
    pub member_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatedId {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"result":{"id":"abc","externalId":"manual_1","status":"CHECKED_IN","person":{"forename":"Jamie","surname":"Laughlin","displayName":"Jamie Laughlin","emailAddress":"Jamie@Live.co.uk"},"metaData":{"nextMatch":"LIV v EVE","visits":3},"created":"2025-01-09T14:30:00Z"}}"#;

    #[test]
    fn test_decode_enveloped_line() {
        let ListLine::Enveloped(member) = decode_line(VALID) else {
            panic!("expected a member");
        };
        assert_eq!(member.id, "abc");
        assert_eq!(member.status, MemberStatus::CheckedIn);
        assert_eq!(member.profile.email, "Jamie@Live.co.uk");
        assert_eq!(member.metadata.get("nextMatch").map(String::as_str), Some("LIV v EVE"));
        assert_eq!(member.metadata.get("visits").map(String::as_str), Some("3"));
        assert!(member.created.is_some());
    }

    #[test]
    fn test_unenveloped_and_broken_lines_are_malformed() {
        assert!(matches!(decode_line(r#"{"id":"abc"}"#), ListLine::Malformed(_)));
        assert!(matches!(decode_line(r#"{"result":{"status":"ENROLLED"}}"#), ListLine::Malformed(_)));
        assert!(matches!(decode_line("{not json"), ListLine::Malformed(_)));
        assert!(matches!(
            decode_line(r#"{"error":{"code":13,"message":"internal"}}"#),
            ListLine::Malformed(_)
        ));
    }

    #[test]
    fn test_listing_skips_malformed_lines() {
        let mut body = String::new();
        for i in 0..5 {
            body.push_str(&format!(
                "{{\"result\":{{\"id\":\"m{}\",\"person\":{{\"emailAddress\":\"p{}@x.com\"}}}}}}\n",
                i, i
            ));
            if i == 1 || i == 3 {
                body.push_str("{\"result\": truncated\n");
            }
        }
        body.push_str("\n\n");

        let listing = decode_listing(&body);
        assert_eq!(listing.malformed, 2);
        let ids: Vec<_> = listing.members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2", "m3", "m4"]);
        assert_eq!(listing.into_members().map(|m| m.len()).ok(), Some(5));
    }

    #[test]
    fn test_listing_all_malformed_is_an_error() {
        let listing = decode_listing("garbage\nmore garbage\n");
        assert!(matches!(listing.into_members(), Err(AppError::MalformedRecord(_))));
        assert!(decode_listing("").into_members().map(|m| m.is_empty()).unwrap_or(false));
    }

    #[test]
    fn test_list_request_shape() {
        let request = ListRequest::new(1000, true)
            .matching(vec![FieldFilter::eq("status", "CHECKED_IN")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["filters"]["limit"], 1000);
        assert_eq!(json["filters"]["orderBy"], "created");
        assert_eq!(json["filters"]["orderAsc"], true);
        let filter = &json["filters"]["filterGroups"][0];
        assert_eq!(filter["condition"], "AND");
        assert_eq!(filter["fieldFilters"][0]["filterField"], "status");
        assert_eq!(filter["fieldFilters"][0]["filterOperator"], "eq");

        let unfiltered = serde_json::to_value(ListRequest::new(10, false)).unwrap();
        assert!(unfiltered["filters"].get("filterGroups").is_none());

        let third = ListRequest::new(10, true).next_page().next_page();
        assert_eq!(third.filters.offset, 20);
        assert_eq!(third.filters.limit, 10);
    }
}
