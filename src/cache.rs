//! Read cache keyed by entity name plus the query's filter parameters, with a
//! declarative table of which entity names each mutation invalidates.
//! Invalidation is deliberately coarse: a write drops every cached read for
//! the affected entity names, never a single row.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

pub mod entity {
    pub const TICKETS: &str = "tickets";
    pub const TICKET_COMMENTS: &str = "ticket_comments";
    pub const ANNOUNCEMENTS: &str = "announcements";
    pub const MENU_ITEMS: &str = "menu_items";
    pub const MESSAGE_TEMPLATES: &str = "message_templates";
    pub const RECEPTION_NOTIFICATIONS: &str = "reception_notifications";
    pub const PROFILES: &str = "profiles";
}

/// Mutated entity → cached entities to drop. Every entity invalidates itself;
/// comments also invalidate the ticket list because comment activity feeds
/// the list's recency ordering.
const INVALIDATION_RULES: &[(&str, &[&str])] = &[
    (entity::TICKETS, &[entity::TICKETS]),
    (
        entity::TICKET_COMMENTS,
        &[entity::TICKET_COMMENTS, entity::TICKETS],
    ),
    (entity::ANNOUNCEMENTS, &[entity::ANNOUNCEMENTS]),
    (entity::MENU_ITEMS, &[entity::MENU_ITEMS]),
    (entity::MESSAGE_TEMPLATES, &[entity::MESSAGE_TEMPLATES]),
    (
        entity::RECEPTION_NOTIFICATIONS,
        &[entity::RECEPTION_NOTIFICATIONS],
    ),
    (entity::PROFILES, &[entity::PROFILES]),
];

fn affected_entities(mutated: &str) -> &'static [&'static str] {
    INVALIDATION_RULES
        .iter()
        .find(|(name, _)| *name == mutated)
        .map(|(_, affected)| *affected)
        .unwrap_or(&[])
}

#[derive(Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<(String, String), Value>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity: &str, key: &str) -> Option<Value> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.get(&(entity.to_string(), key.to_string())).cloned()
    }

    pub fn put(&self, entity: &str, key: &str, value: Value) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert((entity.to_string(), key.to_string()), value);
    }

    /// Apply the invalidation rules for a mutation on `mutated`.
    pub fn invalidate(&self, mutated: &str) {
        let affected = affected_entities(mutated);
        if affected.is_empty() {
            return;
        }
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.retain(|(name, _), _| !affected.contains(&name.as_str()));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }
}
