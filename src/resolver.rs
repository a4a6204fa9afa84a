//! Field/value lookups over the record store and one-hop relationship
//! resolution between users, tickets and organizations.

use crate::storage::RecordStore;
use crate::types::{
    ASSIGN_TICKET_SUBJECT, Collection, FieldSet, ORGANIZATION_NAME, Record,
    SUBMITTED_TICKET_SUBJECT, TICKET_SUBJECT, USER_NAME,
};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Convert a needle to a number the way the search prompt always has:
/// trimmed, empty is zero, radix prefixes and `Infinity` accepted,
/// anything else unparsable is NaN.
pub fn to_number(needle: &Value) -> f64 {
    match needle {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => parse_number(s),
        _ => f64::NAN,
    }
}

fn parse_number(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let lower = s.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix)
                .map(|n| n as f64)
                .unwrap_or(f64::NAN);
        }
    }

    // Rust also accepts "inf" and "nan" spellings; the prompt never did.
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        (Value::Array(_), _) | (Value::Object(_), _) => false,
        _ => a == b,
    }
}

/// Does a record's field value match the needle?
///
/// Arrays match when an element equals the needle exactly, numbers match
/// the needle converted to a number, everything else needs strict equality.
pub fn compare_value(candidate: &Value, needle: &Value) -> bool {
    match candidate {
        Value::Array(items) => items.iter().any(|item| strict_equals(item, needle)),
        Value::Number(n) => match n.as_f64() {
            Some(n) => n == to_number(needle),
            None => false,
        },
        _ => strict_equals(candidate, needle),
    }
}

/// Resolves lookups against a loaded [`RecordStore`].
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    store: &'a RecordStore,
    fields: [FieldSet; 3],
    latency: Duration,
}

impl<'a> Resolver<'a> {
    /// A resolver over the declared field sets with no simulated latency.
    pub fn new(store: &'a RecordStore) -> Self {
        Resolver {
            store,
            fields: Collection::ALL.map(FieldSet::declared),
            latency: Duration::ZERO,
        }
    }

    /// Pause this long before resolving relationships for a match.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Replace the searchable field set of one collection.
    pub fn with_fields(mut self, collection: Collection, fields: FieldSet) -> Self {
        self.fields[Self::slot(collection)] = fields;
        self
    }

    fn slot(collection: Collection) -> usize {
        match collection {
            Collection::Users => 0,
            Collection::Tickets => 1,
            Collection::Organizations => 2,
        }
    }

    pub fn fields(&self, collection: Collection) -> &FieldSet {
        &self.fields[Self::slot(collection)]
    }

    pub fn store(&self) -> &RecordStore {
        self.store
    }

    /// First record in `collection` whose `field` matches `needle`.
    ///
    /// Fields outside the collection's field set never match.
    pub fn lookup(&self, collection: Collection, field: &str, needle: &Value) -> Option<&'a Record> {
        if !self.fields(collection).contains(field) {
            debug!(%collection, field, "field is not searchable");
            return None;
        }

        self.store
            .records(collection)
            .iter()
            .find(|record| {
                record
                    .get(field)
                    .is_some_and(|candidate| compare_value(candidate, needle))
            })
    }

    /// Find a record by a raw value entered by the operator.
    ///
    /// Returns `None` when the field is not searchable or nothing matches.
    /// With `include_relationships`, the match is merged with summary
    /// fields from related records after the configured latency.
    pub async fn find(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
        include_relationships: bool,
    ) -> Option<Record> {
        let needle = Value::String(value.to_string());
        let found = self.lookup(collection, field, &needle)?;
        debug!(%collection, field, value, "match found");

        let mut result = found.clone();
        if include_relationships {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            for (name, related) in self.relationships(collection, found) {
                result.insert(name.to_string(), related);
            }
        }
        Some(result)
    }

    /// Summary fields for `record`, in resolution order.
    fn relationships(&self, collection: Collection, record: &Record) -> Vec<(&'static str, Value)> {
        match collection {
            Collection::Users => vec![
                (
                    ASSIGN_TICKET_SUBJECT,
                    self.related(record, "_id", Collection::Tickets, "assignee_id", "subject"),
                ),
                (
                    SUBMITTED_TICKET_SUBJECT,
                    self.related(record, "_id", Collection::Tickets, "submitter_id", "subject"),
                ),
                (
                    ORGANIZATION_NAME,
                    self.related(record, "organization_id", Collection::Organizations, "_id", "name"),
                ),
            ],
            // The submitter lookup lands under assign_ticket_subject and the
            // assignee lookup under submitted_ticket_subject, both reading
            // `subject` off a user record. Kept as-is for compatibility.
            Collection::Tickets => vec![
                (
                    ASSIGN_TICKET_SUBJECT,
                    self.related(record, "submitter_id", Collection::Users, "_id", "subject"),
                ),
                (
                    SUBMITTED_TICKET_SUBJECT,
                    self.related(record, "assignee_id", Collection::Users, "_id", "subject"),
                ),
                (
                    ORGANIZATION_NAME,
                    self.related(record, "organization_id", Collection::Organizations, "_id", "name"),
                ),
            ],
            Collection::Organizations => vec![
                (
                    TICKET_SUBJECT,
                    self.related(record, "_id", Collection::Tickets, "organization_id", "subject"),
                ),
                (
                    USER_NAME,
                    self.related(record, "_id", Collection::Users, "organization_id", "name"),
                ),
            ],
        }
    }

    /// Follow `record[key]` to the first record in `target` whose
    /// `target_field` matches it, and return that record's `summary` field.
    /// Absent keys and missed lookups give `null`.
    fn related(
        &self,
        record: &Record,
        key: &str,
        target: Collection,
        target_field: &str,
        summary: &str,
    ) -> Value {
        let needle = match record.get(key) {
            Some(Value::Null) | None => return Value::Null,
            Some(value) => value,
        };
        self.lookup(target, target_field, needle)
            .and_then(|related| related.get(summary))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;

    fn records(value: Value) -> Vec<Record> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => record,
                    other => panic!("not an object: {other}"),
                })
                .collect(),
            other => panic!("not an array: {other}"),
        }
    }

    fn sample_store() -> RecordStore {
        RecordStore::from_records(
            records(json!([
                {"_id": 1, "name": "Ada", "organization_id": 101, "tags": ["Springville", "Sutton"], "active": true},
                {"_id": 2, "name": "Grace", "organization_id": 102, "tags": ["Foxworth"]},
                {"_id": 3, "name": "Ada", "alias": "Miss Lovelace"}
            ])),
            records(json!([
                {"_id": "t-1", "subject": "Printer on fire", "submitter_id": 2, "assignee_id": 1, "organization_id": 101, "tags": ["Ohio"]},
                {"_id": "t-2", "subject": "Lost badge", "submitter_id": 1, "assignee_id": 2, "organization_id": 102},
                {"_id": "t-3", "subject": "Orphaned", "submitter_id": 99}
            ])),
            records(json!([
                {"_id": 101, "name": "Enthaze", "domain_names": ["kage.com", "ecratic.com"]},
                {"_id": 102, "name": "Nutralab"},
                {"_id": 103, "name": "Lonely Co"}
            ])),
        )
    }

    fn s(value: &str) -> Value {
        Value::String(value.to_string())
    }

    #[test]
    fn test_compare_value_arrays_match_exact_elements_only() {
        let tags = json!(["Springville", "Sutton"]);
        assert!(compare_value(&tags, &s("Sutton")));
        assert!(!compare_value(&tags, &s("Sutt")));
        assert!(!compare_value(&tags, &s("springville")));
    }

    #[test]
    fn test_compare_value_numbers_parse_the_needle() {
        assert!(compare_value(&json!(30), &s("30")));
        assert!(compare_value(&json!(30), &s(" 30 ")));
        assert!(compare_value(&json!(30), &s("30.0")));
        assert!(compare_value(&json!(30), &s("0x1e")));
        assert!(!compare_value(&json!(30), &s("thirty")));
        assert!(!compare_value(&json!(30), &s("31")));
        assert!(compare_value(&json!(0), &s("")));
        assert!(compare_value(&json!(30), &json!(30.0)));
    }

    #[test]
    fn test_compare_value_strings_are_strict() {
        assert!(compare_value(&s("Ada"), &s("Ada")));
        assert!(!compare_value(&s("Ada"), &s("ada")));
        assert!(!compare_value(&s("Ada"), &s("Ad")));
        assert!(!compare_value(&json!(true), &s("true")));
        assert!(!compare_value(&Value::Null, &s("")));
    }

    #[test]
    fn test_parse_number_rejects_rust_only_spellings() {
        assert!(parse_number("nan").is_nan());
        assert!(parse_number("inf").is_nan());
        assert_eq!(parse_number("Infinity"), f64::INFINITY);
        assert_eq!(parse_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(parse_number("1e3"), 1000.0);
        assert!(parse_number("12abc").is_nan());
    }

    #[test]
    fn test_to_number_for_non_string_needles() {
        assert_eq!(to_number(&json!(true)), 1.0);
        assert_eq!(to_number(&json!(false)), 0.0);
        assert!(to_number(&Value::Null).is_nan());
        assert!(to_number(&json!(["1"])).is_nan());
    }

    #[tokio::test]
    async fn test_find_returns_first_match() {
        let store = sample_store();
        let resolver = Resolver::new(&store);

        let found = resolver
            .find(Collection::Users, "name", "Ada", false)
            .await
            .unwrap();
        assert_eq!(found["_id"], json!(1));
    }

    #[tokio::test]
    async fn test_find_unknown_field_is_not_found() {
        let store = sample_store();
        let resolver = Resolver::new(&store);

        assert!(
            resolver
                .find(Collection::Users, "favourite_colour", "1", false)
                .await
                .is_none()
        );
        // "subject" exists on tickets but is not a user field
        assert!(
            resolver
                .find(Collection::Users, "subject", "Printer on fire", false)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_find_extra_fields_become_searchable() {
        let store = RecordStore::from_records(
            records(json!([{"_id": 1, "nickname": "Countess"}])),
            vec![],
            vec![],
        );
        let mut fields = FieldSet::declared(Collection::Users);
        fields.extend(["nickname"]);
        let resolver = Resolver::new(&store).with_fields(Collection::Users, fields);

        let found = resolver
            .find(Collection::Users, "nickname", "Countess", false)
            .await;
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_find_by_tag_and_number() {
        let store = sample_store();
        let resolver = Resolver::new(&store);

        let found = resolver
            .find(Collection::Users, "tags", "Foxworth", false)
            .await
            .unwrap();
        assert_eq!(found["name"], "Grace");

        assert!(
            resolver
                .find(Collection::Users, "_id", "two", false)
                .await
                .is_none()
        );
        assert!(
            resolver
                .find(Collection::Users, "tags", "Fox", false)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_find_every_record_by_its_own_id() {
        let store = sample_store();
        let resolver = Resolver::new(&store);

        for collection in Collection::ALL {
            for record in store.records(collection) {
                let id = match &record["_id"] {
                    Value::String(id) => id.clone(),
                    other => other.to_string(),
                };
                let found = resolver.find(collection, "_id", &id, false).await;
                assert_eq!(found.as_ref(), Some(record), "{collection} {id}");
            }
        }
    }

    #[tokio::test]
    async fn test_find_duplicate_ids_first_wins() {
        let store = RecordStore::from_records(
            records(json!([
                {"_id": "dup", "name": "first"},
                {"_id": "dup", "name": "second"}
            ])),
            vec![],
            vec![],
        );
        let resolver = Resolver::new(&store);

        let found = resolver
            .find(Collection::Users, "_id", "dup", false)
            .await
            .unwrap();
        assert_eq!(found["name"], "first");
    }

    #[tokio::test]
    async fn test_user_relationships() {
        let store = RecordStore::from_records(
            records(json!([{"_id": "u1", "organization_id": "o1"}])),
            records(json!([{"_id": "t1", "assignee_id": "u1", "subject": "A"}])),
            records(json!([{"_id": "o1", "name": "Acme"}])),
        );
        let resolver = Resolver::new(&store);

        let found = resolver
            .find(Collection::Users, "_id", "u1", true)
            .await
            .unwrap();
        assert_eq!(
            Value::Object(found),
            json!({
                "_id": "u1",
                "organization_id": "o1",
                "assign_ticket_subject": "A",
                "submitted_ticket_subject": null,
                "organization_name": "Acme"
            })
        );
    }

    #[tokio::test]
    async fn test_user_relationships_follow_numeric_keys() {
        let store = sample_store();
        let resolver = Resolver::new(&store);

        let found = resolver
            .find(Collection::Users, "_id", "1", true)
            .await
            .unwrap();
        assert_eq!(found[ASSIGN_TICKET_SUBJECT], "Printer on fire");
        assert_eq!(found[SUBMITTED_TICKET_SUBJECT], "Lost badge");
        assert_eq!(found[ORGANIZATION_NAME], "Enthaze");
    }

    #[tokio::test]
    async fn test_user_without_organization_gets_null_fields() {
        let store = sample_store();
        let resolver = Resolver::new(&store);

        let found = resolver
            .find(Collection::Users, "_id", "3", true)
            .await
            .unwrap();
        assert_eq!(found[ASSIGN_TICKET_SUBJECT], Value::Null);
        assert_eq!(found[SUBMITTED_TICKET_SUBJECT], Value::Null);
        assert_eq!(found[ORGANIZATION_NAME], Value::Null);
    }

    #[tokio::test]
    async fn test_ticket_relationships_keep_cross_naming() {
        let store = RecordStore::from_records(
            records(json!([
                {"_id": 1, "name": "Submitter", "subject": "from submitter"},
                {"_id": 2, "name": "Assignee", "subject": "from assignee"}
            ])),
            records(json!([
                {"_id": "t1", "subject": "S", "submitter_id": 1, "assignee_id": 2, "organization_id": 7}
            ])),
            records(json!([{"_id": 7, "name": "Org Seven"}])),
        );
        let resolver = Resolver::new(&store);

        let found = resolver
            .find(Collection::Tickets, "_id", "t1", true)
            .await
            .unwrap();
        assert_eq!(found[ASSIGN_TICKET_SUBJECT], "from submitter");
        assert_eq!(found[SUBMITTED_TICKET_SUBJECT], "from assignee");
        assert_eq!(found[ORGANIZATION_NAME], "Org Seven");
    }

    #[tokio::test]
    async fn test_ticket_relationships_on_plain_users_are_null() {
        let store = sample_store();
        let resolver = Resolver::new(&store);

        let found = resolver
            .find(Collection::Tickets, "subject", "Printer on fire", true)
            .await
            .unwrap();
        assert_eq!(found[ASSIGN_TICKET_SUBJECT], Value::Null);
        assert_eq!(found[SUBMITTED_TICKET_SUBJECT], Value::Null);
        assert_eq!(found[ORGANIZATION_NAME], "Enthaze");
    }

    #[tokio::test]
    async fn test_organization_relationships() {
        let store = sample_store();
        let resolver = Resolver::new(&store);

        let found = resolver
            .find(Collection::Organizations, "domain_names", "ecratic.com", true)
            .await
            .unwrap();
        assert_eq!(found["name"], "Enthaze");
        assert_eq!(found[TICKET_SUBJECT], "Printer on fire");
        assert_eq!(found[USER_NAME], "Ada");

        let lonely = resolver
            .find(Collection::Organizations, "_id", "103", true)
            .await
            .unwrap();
        assert_eq!(lonely[TICKET_SUBJECT], Value::Null);
        assert_eq!(lonely[USER_NAME], Value::Null);
    }

    #[tokio::test]
    async fn test_relationship_fields_are_appended_and_absent_without_inclusion() {
        let store = sample_store();
        let resolver = Resolver::new(&store);

        let plain = resolver
            .find(Collection::Organizations, "_id", "102", false)
            .await
            .unwrap();
        assert!(!plain.contains_key(TICKET_SUBJECT));

        let enriched = resolver
            .find(Collection::Organizations, "_id", "102", true)
            .await
            .unwrap();
        let keys: Vec<&str> = enriched.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_id", "name", TICKET_SUBJECT, USER_NAME]);
    }

    #[tokio::test]
    async fn test_latency_applies_before_relationships() {
        let store = sample_store();
        let resolver = Resolver::new(&store).with_latency(Duration::from_millis(40));

        let started = Instant::now();
        resolver
            .find(Collection::Users, "_id", "1", true)
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
