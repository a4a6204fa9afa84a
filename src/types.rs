//! Core types for collections, records and their searchable fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single record: an ordered JSON object as it appears in the dataset.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Summary field names merged into a record by relationship inclusion.
pub const ASSIGN_TICKET_SUBJECT: &str = "assign_ticket_subject";
pub const SUBMITTED_TICKET_SUBJECT: &str = "submitted_ticket_subject";
pub const ORGANIZATION_NAME: &str = "organization_name";
pub const TICKET_SUBJECT: &str = "ticket_subject";
pub const USER_NAME: &str = "user_name";

const USER_FIELDS: &[&str] = &[
    "_id",
    "url",
    "external_id",
    "name",
    "alias",
    "created_at",
    "active",
    "verified",
    "shared",
    "locale",
    "timezone",
    "last_login_at",
    "email",
    "phone",
    "signature",
    "organization_id",
    "tags",
    "suspended",
    "role",
];

const TICKET_FIELDS: &[&str] = &[
    "_id",
    "url",
    "external_id",
    "created_at",
    "type",
    "subject",
    "description",
    "priority",
    "status",
    "submitter_id",
    "assignee_id",
    "organization_id",
    "tags",
    "has_incidents",
    "due_at",
    "via",
];

const ORGANIZATION_FIELDS: &[&str] = &[
    "_id",
    "url",
    "external_id",
    "name",
    "domain_names",
    "created_at",
    "details",
    "shared_tickets",
    "tags",
];

/// One of the three record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Tickets,
    Organizations,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Users,
        Collection::Tickets,
        Collection::Organizations,
    ];

    /// Lowercase plural name, also used as the dataset file stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Tickets => "tickets",
            Collection::Organizations => "organizations",
        }
    }

    /// Capitalized name for headings.
    pub fn title(&self) -> &'static str {
        match self {
            Collection::Users => "Users",
            Collection::Tickets => "Tickets",
            Collection::Organizations => "Organizations",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }

    /// Declared searchable fields, in display order.
    pub fn declared_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Users => USER_FIELDS,
            Collection::Tickets => TICKET_FIELDS,
            Collection::Organizations => ORGANIZATION_FIELDS,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown collection: {0}. Use: users, tickets, organizations")]
pub struct ParseCollectionError(pub String);

impl FromStr for Collection {
    type Err = ParseCollectionError;

    /// Accepts plural, singular and capitalized spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "users" | "user" => Ok(Collection::Users),
            "tickets" | "ticket" => Ok(Collection::Tickets),
            "organizations" | "organization" | "orgs" | "org" => Ok(Collection::Organizations),
            _ => Err(ParseCollectionError(s.to_string())),
        }
    }
}

/// The set of fields a collection may be searched by.
///
/// Starts from the collection's declared fields and may be extended with
/// extra names from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<String>,
}

impl FieldSet {
    pub fn declared(collection: Collection) -> Self {
        FieldSet {
            fields: collection
                .declared_fields()
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }

    /// Add fields not already present, keeping declaration order.
    pub fn extend<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in extra {
            let field = field.as_ref().trim();
            if !field.is_empty() && !self.contains(field) {
                self.fields.push(field.to_string());
            }
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
