//! desk-search - search users, tickets and organizations held in memory.
//!
//! The three datasets are loaded once into a read-only [`RecordStore`];
//! a [`Resolver`] answers field/value lookups against it and can enrich a
//! match with summary fields from related records.

pub mod config;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod types;

pub use config::{Config, ConfigError, load_config};
pub use resolver::{Resolver, compare_value};
pub use session::{LinePrompt, Prompt, Session, SessionError, TerminalPrompt};
pub use storage::{RecordStore, StoreError};
pub use types::{Collection, FieldSet, ParseCollectionError, Record};

/// Build a resolver over `store` using the latency and field sets from
/// `config`.
pub fn resolver_from_config<'a>(store: &'a RecordStore, config: &Config) -> Resolver<'a> {
    Collection::ALL.into_iter().fold(
        Resolver::new(store).with_latency(config.latency()),
        |resolver, collection| resolver.with_fields(collection, config.field_set(collection)),
    )
}
