//! Weather record integration tests
//!
//! Logic-level tests for the record store semantics and the listing cache
//! protocol:
//! - round trip of created records
//! - paging consistency
//! - update atomicity in the presence of invalid keys
//! - delete idempotence
//! - cache invalidation on write and cache hits on repeated reads

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const MUTABLE_FIELDS: [&str; 4] = ["city", "temperature", "humidity", "description"];

const ALL_WEATHERS_KEY: &str = "all_weathers";

/// A stored weather observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    id: i32,
    city: String,
    temperature: Decimal,
    humidity: Decimal,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq)]
enum UpdateOutcome {
    Updated(Record),
    InvalidKey(String),
    NotFound,
}

/// In-memory model of the record store, with a counter on the expensive
/// listing query so cache behavior is observable.
struct FakeStore {
    records: Vec<Record>,
    next_id: i32,
    list_calls: Cell<usize>,
}

impl FakeStore {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
            list_calls: Cell::new(0),
        }
    }

    fn create(
        &mut self,
        city: &str,
        temperature: Decimal,
        humidity: Decimal,
        description: &str,
    ) -> Record {
        let now = Utc::now();
        let record = Record {
            id: self.next_id,
            city: city.to_string(),
            temperature,
            humidity,
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.next_id += 1;
        self.records.push(record.clone());
        record
    }

    fn get(&self, id: i32) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    fn list_all(&self) -> Vec<Record> {
        self.list_calls.set(self.list_calls.get() + 1);
        self.records.clone()
    }

    fn list_page(&self, page: usize, limit: usize) -> Vec<Record> {
        self.records
            .iter()
            .skip((page - 1) * limit)
            .take(limit)
            .cloned()
            .collect()
    }

    fn update(&mut self, id: i32, fields: &[(&str, &str)]) -> UpdateOutcome {
        // the whole update is rejected on the first unknown key, in the
        // order the keys were supplied
        if let Some((key, _)) = fields.iter().find(|(key, _)| !MUTABLE_FIELDS.contains(key)) {
            return UpdateOutcome::InvalidKey((*key).to_string());
        }

        let Some(record) = self.records.iter_mut().find(|record| record.id == id) else {
            return UpdateOutcome::NotFound;
        };

        for (key, value) in fields {
            match *key {
                "city" => record.city = (*value).to_string(),
                "temperature" => record.temperature = dec(value),
                "humidity" => record.humidity = dec(value),
                "description" => record.description = (*value).to_string(),
                _ => unreachable!("unknown keys are rejected above"),
            }
        }
        record.updated_at = Utc::now();
        UpdateOutcome::Updated(record.clone())
    }

    fn delete(&mut self, id: i32) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        self.records.len() != before
    }
}

/// Key-value cache double with the get/set/delete contract.
#[derive(Default)]
struct KeyValueCache {
    entries: HashMap<String, Vec<u8>>,
}

fn encode_listing(records: &[Record]) -> Vec<u8> {
    serde_json::to_vec(records).unwrap()
}

fn decode_listing(payload: &[u8]) -> Vec<Record> {
    serde_json::from_slice(payload).unwrap()
}

/// Read-through listing: serve the cached payload verbatim on a hit,
/// populate the cache from the store on a miss.
fn list_all_cached(cache: &mut KeyValueCache, store: &FakeStore) -> Vec<Record> {
    if let Some(payload) = cache.entries.get(ALL_WEATHERS_KEY) {
        return decode_listing(payload);
    }
    let records = store.list_all();
    cache
        .entries
        .insert(ALL_WEATHERS_KEY.to_string(), encode_listing(&records));
    records
}

/// Invalidate-on-write: every successful mutation drops the cached listing.
fn invalidate_listing(cache: &mut KeyValueCache) {
    cache.entries.remove(ALL_WEATHERS_KEY);
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod store_tests {
    use super::*;

    /// Created records come back from get with the exact field values
    #[test]
    fn create_then_get_round_trips_field_values() {
        let mut store = FakeStore::new();
        let created = store.create("Tokyo", dec("25.5"), dec("60.5"), "Sunny");

        let fetched = store.get(created.id).expect("record exists");
        assert_eq!(fetched.city, "Tokyo");
        assert_eq!(fetched.temperature, dec("25.5"));
        assert_eq!(fetched.humidity, dec("60.5"));
        assert_eq!(fetched.description, "Sunny");
    }

    /// The first record gets id 1 and equal creation timestamps
    #[test]
    fn first_record_is_id_one_with_matching_timestamps() {
        let mut store = FakeStore::new();
        let created = store.create("Tokyo", dec("25.5"), dec("60.5"), "Sunny");

        assert_eq!(created.id, 1);
        assert_eq!(created.created_at, created.updated_at);
    }

    /// Ids are assigned in insertion order and never reused
    #[test]
    fn ids_are_never_reused_after_deletion() {
        let mut store = FakeStore::new();
        let first = store.create("Tokyo", dec("25.5"), dec("60.5"), "Sunny");
        assert!(store.delete(first.id));

        let second = store.create("Osaka", dec("22.0"), dec("55.0"), "Cloudy");
        assert_eq!(second.id, 2);
    }

    /// An unknown update key rejects the update without touching any field
    #[test]
    fn unknown_update_key_leaves_the_record_unchanged() {
        let mut store = FakeStore::new();
        let created = store.create("Tokyo", dec("25.5"), dec("60.5"), "Sunny");
        let before = created.clone();

        let outcome = store.update(created.id, &[("rainfall", "0")]);
        assert_eq!(outcome, UpdateOutcome::InvalidKey("rainfall".to_string()));
        assert_eq!(store.get(created.id), Some(&before));
    }

    /// Valid keys alongside an invalid one are not applied either
    #[test]
    fn mixed_update_with_invalid_key_applies_nothing() {
        let mut store = FakeStore::new();
        let created = store.create("Tokyo", dec("25.5"), dec("60.5"), "Sunny");
        let before = created.clone();

        let outcome = store.update(created.id, &[("city", "Osaka"), ("rainfall", "0")]);
        assert_eq!(outcome, UpdateOutcome::InvalidKey("rainfall".to_string()));
        assert_eq!(store.get(created.id), Some(&before));
    }

    /// The first invalid key in input order is the one reported
    #[test]
    fn first_invalid_key_in_input_order_is_reported() {
        let mut store = FakeStore::new();
        let created = store.create("Tokyo", dec("25.5"), dec("60.5"), "Sunny");

        let outcome = store.update(created.id, &[("rainfall", "0"), ("windspeed", "3")]);
        assert_eq!(outcome, UpdateOutcome::InvalidKey("rainfall".to_string()));
    }

    /// A valid partial update overwrites only the supplied fields
    #[test]
    fn partial_update_overwrites_supplied_fields() {
        let mut store = FakeStore::new();
        let created = store.create("Tokyo", dec("25.5"), dec("60.5"), "Sunny");

        let outcome = store.update(created.id, &[("temperature", "19.25")]);
        let UpdateOutcome::Updated(updated) = outcome else {
            panic!("expected update to succeed");
        };
        assert_eq!(updated.temperature, dec("19.25"));
        assert_eq!(updated.city, "Tokyo");
        assert_eq!(updated.humidity, dec("60.5"));
        assert!(updated.updated_at >= updated.created_at);
    }

    /// Updating an absent id reports not-found
    #[test]
    fn updating_an_absent_record_is_not_found() {
        let mut store = FakeStore::new();
        assert_eq!(
            store.update(42, &[("city", "Osaka")]),
            UpdateOutcome::NotFound
        );
    }

    /// Delete is idempotent in effect: true, then false, then gone
    #[test]
    fn delete_twice_returns_true_then_false() {
        let mut store = FakeStore::new();
        let created = store.create("Tokyo", dec("25.5"), dec("60.5"), "Sunny");

        assert!(store.delete(created.id));
        assert!(!store.delete(created.id));
        assert_eq!(store.get(created.id), None);
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;

    /// Repeated listings are served from the cache without store queries
    #[test]
    fn cache_serves_repeated_listings_without_store_queries() {
        let mut store = FakeStore::new();
        let mut cache = KeyValueCache::default();
        store.create("Tokyo", dec("25.50"), dec("60.50"), "Sunny");

        let first = list_all_cached(&mut cache, &store);
        let second = list_all_cached(&mut cache, &store);

        assert_eq!(store.list_calls.get(), 1);
        assert_eq!(first, second);
    }

    /// A write between two listings invalidates the cache, so the second
    /// listing observes the new record
    #[test]
    fn writes_invalidate_the_cached_listing() {
        let mut store = FakeStore::new();
        let mut cache = KeyValueCache::default();

        store.create("Tokyo", dec("25.50"), dec("60.50"), "Sunny");
        invalidate_listing(&mut cache);
        assert_eq!(list_all_cached(&mut cache, &store).len(), 1);

        store.create("Osaka", dec("22.00"), dec("55.00"), "Cloudy");
        invalidate_listing(&mut cache);

        let listing = list_all_cached(&mut cache, &store);
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].city, "Tokyo");
        assert_eq!(listing[1].city, "Osaka");
        assert_eq!(store.list_calls.get(), 2);
    }

    /// Deletes invalidate too; a stale one-record listing is never served
    #[test]
    fn deletes_invalidate_the_cached_listing() {
        let mut store = FakeStore::new();
        let mut cache = KeyValueCache::default();

        let created = store.create("Tokyo", dec("25.50"), dec("60.50"), "Sunny");
        assert_eq!(list_all_cached(&mut cache, &store).len(), 1);

        store.delete(created.id);
        invalidate_listing(&mut cache);

        assert!(list_all_cached(&mut cache, &store).is_empty());
    }

    /// Invalidating an empty cache is a safe no-op
    #[test]
    fn invalidating_an_empty_cache_is_a_no_op() {
        let mut cache = KeyValueCache::default();
        invalidate_listing(&mut cache);
        assert!(cache.entries.is_empty());
    }

    /// The cached payload decodes to exactly what was stored
    #[test]
    fn cached_payload_round_trips_records() {
        let mut store = FakeStore::new();
        store.create("Tokyo", dec("25.50"), dec("60.50"), "Sunny");
        let records = store.list_all();

        let decoded = decode_listing(&encode_listing(&records));
        assert_eq!(decoded, records);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for fixed-point values representable as NUMERIC(5,2)
    fn fixed_point_strategy() -> impl Strategy<Value = Decimal> {
        (-99_999i64..=99_999i64).prop_map(|units| Decimal::new(units, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every record appears on exactly one page, and no page past the
        /// end has items
        #[test]
        fn prop_paging_partitions_all_records(total in 0usize..50, limit in 1usize..10) {
            let mut store = FakeStore::new();
            for i in 0..total {
                store.create(&format!("city-{}", i), dec("20.00"), dec("50.00"), "clear");
            }

            let pages = (total + limit - 1) / limit;
            let mut seen = 0;
            for page in 1..=pages {
                let items = store.list_page(page, limit);
                prop_assert!(items.len() <= limit);
                seen += items.len();
            }
            prop_assert_eq!(seen, total);

            // a page past the end is empty, not an error
            prop_assert!(store.list_page(pages + 1, limit).is_empty());
        }

        /// Page count is the ceiling of total over page size
        #[test]
        fn prop_page_count_matches_ceiling(total in 0i64..10_000, limit in 1i64..100) {
            let pages = (total + limit - 1) / limit;
            prop_assert_eq!(pages, (total as f64 / limit as f64).ceil() as i64);
        }

        /// Fixed-point values survive a create/get round trip exactly
        #[test]
        fn prop_fixed_point_round_trip(
            temperature in fixed_point_strategy(),
            humidity in fixed_point_strategy()
        ) {
            let mut store = FakeStore::new();
            let created = store.create("Tokyo", temperature, humidity, "Sunny");

            let fetched = store.get(created.id).expect("record exists");
            prop_assert_eq!(fetched.temperature, temperature);
            prop_assert_eq!(fetched.humidity, humidity);
        }

        /// The listing after any create/delete sequence reflects the store,
        /// provided every write invalidated the cache
        #[test]
        fn prop_listing_never_stale_after_invalidation(ops in prop::collection::vec(any::<bool>(), 1..20)) {
            let mut store = FakeStore::new();
            let mut cache = KeyValueCache::default();

            for (i, create) in ops.iter().enumerate() {
                if *create {
                    store.create(&format!("city-{}", i), dec("20.00"), dec("50.00"), "clear");
                } else if let Some(first_id) = store.records.first().map(|record| record.id) {
                    store.delete(first_id);
                }
                invalidate_listing(&mut cache);

                let listing = list_all_cached(&mut cache, &store);
                prop_assert_eq!(listing, store.records.clone());
            }
        }
    }
}
