//! Incremental synchronizer.
//!
//! `LOOKUP → {NOT_FOUND → CREATE; FOUND → DIFF → {CHANGED → UPDATE; UNCHANGED → SKIP}}`
//!
//! Unobserved fields never take part in the diff, so a partial extraction
//! cannot erase what the store already knows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use irminsul_common::EntityKind;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::SyncError;
use crate::models::SyncAction;
use crate::record::ExtractedRecord;
use crate::repository::RecordStore;

// ── Significant fields ───────────────────────────────────────────────────────

/// Fields whose change marks a document as changed, per entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignificantFields {
    by_kind: HashMap<EntityKind, Vec<String>>,
}

const CHARACTER_FIELDS: &[&str] =
    &["rarity", "element", "weapon_type", "region", "description", "base_stats"];
const WEAPON_FIELDS: &[&str] = &[
    "weapon_type",
    "rarity",
    "base_attack",
    "secondary_stat",
    "secondary_stat_value",
    "passive_name",
    "description",
];
const ARTIFACT_SET_FIELDS: &[&str] =
    &["max_rarity", "tags", "two_piece_bonus", "four_piece_bonus", "description"];
const MONSTER_FIELDS: &[&str] =
    &["category", "family", "element", "level", "description", "drops"];

impl SignificantFields {
    pub fn defaults() -> Self {
        let by_kind = EntityKind::ALL
            .into_iter()
            .map(|kind| {
                let fields = match kind {
                    EntityKind::Character   => CHARACTER_FIELDS,
                    EntityKind::Weapon      => WEAPON_FIELDS,
                    EntityKind::ArtifactSet => ARTIFACT_SET_FIELDS,
                    EntityKind::Monster     => MONSTER_FIELDS,
                };
                (kind, fields.iter().map(|f| f.to_string()).collect())
            })
            .collect();
        Self { by_kind }
    }

    /// Defaults, with any kind present in `overrides` replaced wholesale.
    pub fn with_overrides(overrides: &HashMap<EntityKind, Vec<String>>) -> Self {
        let mut fields = Self::defaults();
        for (kind, list) in overrides {
            fields.by_kind.insert(*kind, list.clone());
        }
        fields
    }

    pub fn for_kind(&self, kind: EntityKind) -> &[String] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, kind: EntityKind, field: &str) -> bool {
        self.for_kind(kind).iter().any(|f| f == field)
    }
}

impl Default for SignificantFields {
    fn default() -> Self {
        Self::defaults()
    }
}

// ── Synchronizer ─────────────────────────────────────────────────────────────

type KeyLocks = Mutex<HashMap<(EntityKind, String), Arc<tokio::sync::Mutex<()>>>>;

pub struct Synchronizer {
    store: Arc<dyn RecordStore>,
    significant: SignificantFields,
    locks: KeyLocks,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn RecordStore>, significant: SignificantFields) -> Self {
        Self { store, significant, locks: Mutex::new(HashMap::new()) }
    }

    /// Applies the minimal write for one record. Lookup and write for the same
    /// `(kind, natural_key)` never interleave across concurrent callers.
    #[instrument(skip(self, record), fields(kind = %record.kind(), natural_key = %record.natural_key))]
    pub async fn reconcile(&self, record: &ExtractedRecord) -> Result<SyncAction, SyncError> {
        let kind = record.kind();
        let key = record.natural_key.as_str();

        let observed = record.observed();
        if observed.is_empty() {
            warn!("No attributes observed, skipping");
            return Ok(SyncAction::Skipped);
        }

        let slot = self.key_lock(kind, key);
        let action = {
            let _guard = slot.lock().await;
            self.reconcile_locked(kind, key, observed).await
        };
        drop(slot);
        self.release_key(kind, key);
        action
    }

    async fn reconcile_locked(
        &self,
        kind: EntityKind,
        key: &str,
        observed: Map<String, Value>,
    ) -> Result<SyncAction, SyncError> {
        let existing = self
            .store
            .find_by_natural_key(kind, key)
            .await
            .map_err(|source| SyncError::Lookup { kind, natural_key: key.to_string(), source })?;

        let Some(existing) = existing else {
            let fields = observed.len();
            self.store
                .create(kind, key, observed)
                .await
                .map_err(|source| SyncError::Write { kind, natural_key: key.to_string(), source })?;
            info!(fields, "Record created");
            return Ok(SyncAction::Created);
        };

        let changed = diff(&existing.attributes, observed);
        let triggers: Vec<&str> = changed
            .keys()
            .map(String::as_str)
            .filter(|field| self.significant.contains(kind, field))
            .collect();

        if triggers.is_empty() {
            debug!(differing = changed.len(), "No significant change");
            return Ok(SyncAction::Skipped);
        }

        info!(fields = ?triggers, written = changed.len(), "Record updated");
        self.store
            .update(kind, key, changed)
            .await
            .map_err(|source| SyncError::Write { kind, natural_key: key.to_string(), source })?;
        Ok(SyncAction::Updated)
    }

    fn key_lock(&self, kind: EntityKind, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry((kind, key.to_string())).or_default().clone()
    }

    /// Drops the lock entry once no other task holds a handle to it.
    fn release_key(&self, kind: EntityKind, key: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let entry = (kind, key.to_string());
        if locks.get(&entry).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            locks.remove(&entry);
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}

// ── Diff ─────────────────────────────────────────────────────────────────────

/// Observed fields whose merged value differs from what is stored, mapped to
/// the value that should be written.
fn diff(stored: &Map<String, Value>, observed: Map<String, Value>) -> Map<String, Value> {
    observed
        .into_iter()
        .filter_map(|(field, new)| {
            let merged = match stored.get(&field) {
                Some(old) => merge(old, new),
                None => new,
            };
            let same = stored.get(&field).is_some_and(|old| values_equal(old, &merged));
            (!same).then_some((field, merged))
        })
        .collect()
}

/// Objects merge key-by-key so sub-fields missing from `new` keep their stored value.
fn merge(old: &Value, new: Value) -> Value {
    match (old, new) {
        (Value::Object(old), Value::Object(new)) => {
            let mut merged = old.clone();
            for (k, v) in new {
                if v.is_null() {
                    continue;
                }
                let v = match merged.get(&k) {
                    Some(prev) => merge(prev, v),
                    None => v,
                };
                merged.insert(k, v);
            }
            Value::Object(merged)
        }
        (_, new) => new,
    }
}

/// Structural equality where numbers compare by value (`46 == 46.0`).
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Attributes, BaseStats, CharacterAttributes, WeaponAttributes};
    use crate::repository::MemoryRecordStore;
    use irminsul_common::{Element, Vocab};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn weapon(rarity: Option<u8>, base_attack: Option<i64>) -> ExtractedRecord {
        ExtractedRecord::new(
            "Alpha",
            Attributes::Weapon(WeaponAttributes { rarity, base_attack, ..Default::default() }),
        )
    }

    fn sync(store: &Arc<MemoryRecordStore>) -> Synchronizer {
        Synchronizer::new(store.clone(), SignificantFields::defaults())
    }

    #[tokio::test]
    async fn test_reconcile_twice_creates_then_skips() {
        let store = Arc::new(MemoryRecordStore::new());
        let s = sync(&store);
        let record = weapon(Some(5), Some(46));

        assert_eq!(s.reconcile(&record).await.unwrap(), SyncAction::Created);
        assert_eq!(s.reconcile(&record).await.unwrap(), SyncAction::Skipped);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_weapon_scenario_updates_only_changed_field() {
        let store = Arc::new(MemoryRecordStore::new());
        let s = sync(&store);

        s.reconcile(&weapon(Some(5), Some(46))).await.unwrap();
        assert_eq!(s.reconcile(&weapon(Some(5), Some(48))).await.unwrap(), SyncAction::Updated);

        let stored = store.get(EntityKind::Weapon, "Alpha").unwrap();
        assert_eq!(stored.attributes.get("base_attack"), Some(&json!(48)));
        assert_eq!(stored.attributes.get("rarity"), Some(&json!(5)));
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_unobserved_record_never_erases() {
        let store = Arc::new(MemoryRecordStore::new());
        let s = sync(&store);
        s.reconcile(&weapon(Some(5), Some(46))).await.unwrap();

        let blank = weapon(None, None);
        assert_eq!(s.reconcile(&blank).await.unwrap(), SyncAction::Skipped);

        let partial = weapon(None, Some(46));
        assert_eq!(s.reconcile(&partial).await.unwrap(), SyncAction::Skipped);

        let stored = store.get(EntityKind::Weapon, "Alpha").unwrap();
        assert_eq!(stored.attributes.get("rarity"), Some(&json!(5)));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_empty_record_skips_even_when_absent() {
        let store = Arc::new(MemoryRecordStore::new());
        let s = sync(&store);
        assert_eq!(s.reconcile(&weapon(None, None)).await.unwrap(), SyncAction::Skipped);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_non_significant_change_alone_skips() {
        let store = Arc::new(MemoryRecordStore::new());
        let s = sync(&store);
        let mut attrs = WeaponAttributes { rarity: Some(4), ..Default::default() };
        s.reconcile(&ExtractedRecord::new("Beta", Attributes::Weapon(attrs.clone()))).await.unwrap();

        attrs.name_en = Some("Beta Blade".into());
        let action = s
            .reconcile(&ExtractedRecord::new("Beta", Attributes::Weapon(attrs.clone())))
            .await
            .unwrap();
        assert_eq!(action, SyncAction::Skipped);

        // Rides along once a significant field changes.
        attrs.rarity = Some(5);
        let action = s
            .reconcile(&ExtractedRecord::new("Beta", Attributes::Weapon(attrs)))
            .await
            .unwrap();
        assert_eq!(action, SyncAction::Updated);
        let stored = store.get(EntityKind::Weapon, "Beta").unwrap();
        assert_eq!(stored.attributes.get("name_en"), Some(&json!("Beta Blade")));
    }

    #[tokio::test]
    async fn test_nested_stats_merge_keeps_known_subfields() {
        let store = Arc::new(MemoryRecordStore::new());
        let s = sync(&store);
        let full = CharacterAttributes {
            element: Some(Vocab::Known(Element::Pyro)),
            base_stats: Some(BaseStats { hp: Some(12981.0), atk: Some(335.0), def: Some(784.0) }),
            ..Default::default()
        };
        s.reconcile(&ExtractedRecord::new("迪卢克", Attributes::Character(full))).await.unwrap();

        let partial = CharacterAttributes {
            base_stats: Some(BaseStats { hp: None, atk: Some(342.0), def: None }),
            ..Default::default()
        };
        let action = s
            .reconcile(&ExtractedRecord::new("迪卢克", Attributes::Character(partial)))
            .await
            .unwrap();
        assert_eq!(action, SyncAction::Updated);

        let stored = store.get(EntityKind::Character, "迪卢克").unwrap();
        assert_eq!(
            stored.attributes.get("base_stats"),
            Some(&json!({"hp": 12981.0, "atk": 342.0, "def": 784.0}))
        );
        assert_eq!(stored.attributes.get("element"), Some(&json!("Pyro")));
    }

    #[tokio::test]
    async fn test_override_makes_field_significant() {
        let store = Arc::new(MemoryRecordStore::new());
        let overrides = HashMap::from([(EntityKind::Weapon, vec!["name_en".to_string()])]);
        let s = Synchronizer::new(store.clone(), SignificantFields::with_overrides(&overrides));

        let mut attrs = WeaponAttributes { rarity: Some(4), ..Default::default() };
        s.reconcile(&ExtractedRecord::new("Gamma", Attributes::Weapon(attrs.clone()))).await.unwrap();

        attrs.rarity = Some(5);
        let action = s
            .reconcile(&ExtractedRecord::new("Gamma", Attributes::Weapon(attrs.clone())))
            .await
            .unwrap();
        assert_eq!(action, SyncAction::Skipped);

        attrs.name_en = Some("Gamma".into());
        let action = s
            .reconcile(&ExtractedRecord::new("Gamma", Attributes::Weapon(attrs)))
            .await
            .unwrap();
        assert_eq!(action, SyncAction::Updated);
    }

    #[tokio::test]
    async fn test_concurrent_reconcile_creates_once() {
        let store = Arc::new(MemoryRecordStore::new());
        let s = Arc::new(sync(&store));
        let record = weapon(Some(5), Some(46));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = s.clone();
                let record = record.clone();
                tokio::spawn(async move { s.reconcile(&record).await.unwrap() })
            })
            .collect();
        let mut created = 0;
        for h in handles {
            if h.await.unwrap() == SyncAction::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.writes(), 1);
        assert_eq!(s.tracked_keys(), 0);
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(values_equal(&json!(46), &json!(46.0)));
        assert!(values_equal(&json!({"a": [1, 2.0]}), &json!({"a": [1.0, 2]})));
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!values_equal(&json!("46"), &json!(46)));
    }

    #[test]
    fn test_diff_ignores_equal_and_reports_new_fields() {
        let stored = json!({"rarity": 5, "base_attack": 46}).as_object().cloned().unwrap();
        let observed = json!({"rarity": 5.0, "base_attack": 48, "passive_name": "x"})
            .as_object()
            .cloned()
            .unwrap();
        let changed = diff(&stored, observed);
        assert_eq!(
            Value::Object(changed),
            json!({"base_attack": 48, "passive_name": "x"})
        );
    }
}
