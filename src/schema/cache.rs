//! Process-wide cache of introspected table snapshots with a fixed TTL.

use crate::schema::TableSchema;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CachedSchema {
    schema: Arc<TableSchema>,
    expires: Instant,
}

/// Concurrent map of immutable snapshots. Racing writers for the same table are harmless: last write wins.
pub struct SchemaCache {
    ttl: Duration,
    entries: DashMap<String, CachedSchema>,
}

impl SchemaCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(ttl: Duration) -> Self {
        SchemaCache {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, table: &str) -> Option<Arc<TableSchema>> {
        self.get_at(table, Instant::now())
    }

    fn get_at(&self, table: &str, now: Instant) -> Option<Arc<TableSchema>> {
        let hit = self.entries.get(table).map(|e| e.value().clone())?;
        if now < hit.expires {
            return Some(hit.schema);
        }
        // Only drop the entry we saw; a concurrent writer may already have refreshed it.
        self.entries.remove_if(table, |_, e| e.expires <= now);
        None
    }

    pub fn insert(&self, table: &str, schema: Arc<TableSchema>) {
        self.insert_at(table, schema, Instant::now());
    }

    fn insert_at(&self, table: &str, schema: Arc<TableSchema>, now: Instant) {
        self.entries.insert(
            table.to_string(),
            CachedSchema {
                schema,
                expires: now + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, table: &str) {
        self.entries.remove(table);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        SchemaCache::new(Self::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> Arc<TableSchema> {
        Arc::new(TableSchema::new("public", "menu", "id", &["id", "menu_name", "company_id"]))
    }

    #[test]
    fn hit_before_expiry() {
        let cache = SchemaCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.insert_at("menu", menu(), now);
        let hit = cache.get_at("menu", now + Duration::from_secs(59)).unwrap();
        assert_eq!(hit.table, "menu");
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = SchemaCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.insert_at("menu", menu(), now);
        assert!(cache.get_at("menu", now + Duration::from_secs(60)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn last_write_wins() {
        let cache = SchemaCache::default();
        cache.insert("menu", menu());
        let newer = Arc::new(TableSchema::new("public", "menu", "id", &["id", "company_id"]));
        cache.insert("menu", newer);
        assert_eq!(cache.get("menu").unwrap().columns.len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = SchemaCache::default();
        cache.insert("menu", menu());
        cache.insert("pasien", menu());
        cache.invalidate("menu");
        assert!(cache.get("menu").is_none());
        assert!(cache.get("pasien").is_some());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_writers_leave_one_entry() {
        let cache = Arc::new(SchemaCache::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.insert("menu", menu()))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.get("menu").is_some());
    }
}
