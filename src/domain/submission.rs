use serde::Deserialize;

use super::member::Person;

pub const FORM_PROVENANCE: &str = "webhook-form";
pub const ORDER_PROVENANCE: &str = "webhook-order";

/// Applicant fields as the storefront's forms and orders send them.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicantData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub membership_type: Option<String>,
}

impl ApplicantData {
    fn into_person(self, provenance: &str, salt: String) -> Person {
        Person {
            given_name: self.first_name,
            family_name: self.last_name,
            email: self.email,
            phone: self.phone.filter(|p| !p.trim().is_empty()),
            membership_type: self.membership_type,
            provenance: provenance.to_string(),
            salt: Some(salt),
            ..Default::default()
        }
    }
}

/// A membership form submission webhook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub form_name: Option<String>,
    pub data: ApplicantData,
    pub timestamp: Option<String>,
}

impl FormSubmission {
    /// Redelivery of the same form yields the same token; the timestamp is
    /// deliberately not part of it.
    pub fn into_person(self) -> Person {
        let salt = self
            .form_name
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or("form")
            .to_string();
        self.data.into_person(FORM_PROVENANCE, salt)
    }
}

/// One order carrying several memberships.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    pub transaction_id: String,
    pub members: Vec<ApplicantData>,
}

impl OrderSubmission {
    /// Each line of the order is salted with the transaction id and its
    /// position, so replaying the order is detectable.
    pub fn into_people(self) -> Vec<Person> {
        let transaction_id = self.transaction_id;
        self.members
            .into_iter()
            .enumerate()
            .map(|(index, applicant)| {
                applicant.into_person(ORDER_PROVENANCE, format!("{}:{}", transaction_id, index + 1))
            })
            .collect()
    }
}
