//! In-memory storage backend.
//!
//! This module provides the default implementations of the storage traits.
//! Insertion order is tracked separately from the id index so listings are
//! stable for rendering.

use std::collections::HashMap;

use crate::alert::{AlertId, ProximityAlert};
use crate::storage::traits::{AlertRegistry, StorageError, TriggerStore};
use crate::trigger::{Trigger, TriggerId, TriggerPatch, TriggerSpec};

/// In-memory trigger store.
#[derive(Debug, Default)]
pub struct InMemoryTriggerStore {
    by_id: HashMap<TriggerId, Trigger>,
    order: Vec<TriggerId>,
}

impl InMemoryTriggerStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get_mut(&mut self, id: TriggerId) -> Result<&mut Trigger, StorageError> {
        self.by_id.get_mut(&id).ok_or(StorageError::TriggerNotFound(id))
    }
}

impl TriggerStore for InMemoryTriggerStore {
    fn add(&mut self, spec: TriggerSpec) -> Result<Trigger, StorageError> {
        spec.validate()?;
        let trigger = Trigger::from_spec(spec);
        self.insert(trigger.clone())?;
        Ok(trigger)
    }

    fn insert(&mut self, trigger: Trigger) -> Result<(), StorageError> {
        if self.by_id.contains_key(&trigger.id) {
            return Err(StorageError::DuplicateKey(trigger.id.to_string()));
        }
        self.order.push(trigger.id);
        self.by_id.insert(trigger.id, trigger);
        Ok(())
    }

    fn get(&self, id: TriggerId) -> Option<&Trigger> {
        self.by_id.get(&id)
    }

    fn remove(&mut self, id: TriggerId) -> Option<Trigger> {
        let removed = self.by_id.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        Some(removed)
    }

    fn toggle_enabled(&mut self, id: TriggerId) -> Result<bool, StorageError> {
        let trigger = self.get_mut(id)?;
        trigger.enabled = !trigger.enabled;
        Ok(trigger.enabled)
    }

    fn update(&mut self, id: TriggerId, patch: TriggerPatch) -> Result<Trigger, StorageError> {
        let trigger = self.get_mut(id)?;
        trigger.apply_patch(patch)?;
        Ok(trigger.clone())
    }

    fn mark_triggered(&mut self, id: TriggerId) -> Result<(), StorageError> {
        self.get_mut(id)?.triggered = true;
        Ok(())
    }

    fn set_distance(&mut self, id: TriggerId, meters: f64) -> Result<(), StorageError> {
        self.get_mut(id)?.last_known_distance = Some(meters);
        Ok(())
    }

    fn all(&self) -> Vec<Trigger> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }
}

/// In-memory alert registry, indexed by trigger for O(1) dedup checks.
#[derive(Debug, Default)]
pub struct InMemoryAlertRegistry {
    by_trigger: HashMap<TriggerId, ProximityAlert>,
    trigger_of: HashMap<AlertId, TriggerId>,
    order: Vec<AlertId>,
}

impl InMemoryAlertRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertRegistry for InMemoryAlertRegistry {
    fn active_for(&self, trigger_id: TriggerId) -> Option<&ProximityAlert> {
        self.by_trigger.get(&trigger_id)
    }

    fn register(&mut self, alert: ProximityAlert) -> Result<(), StorageError> {
        if self.by_trigger.contains_key(&alert.trigger_id) {
            return Err(StorageError::DuplicateAlert(alert.trigger_id));
        }
        if self.trigger_of.contains_key(&alert.id) {
            return Err(StorageError::DuplicateKey(alert.id.to_string()));
        }
        self.trigger_of.insert(alert.id, alert.trigger_id);
        self.order.push(alert.id);
        self.by_trigger.insert(alert.trigger_id, alert);
        Ok(())
    }

    fn clear(&mut self, alert_id: AlertId) -> Option<ProximityAlert> {
        let trigger_id = self.trigger_of.remove(&alert_id)?;
        self.order.retain(|existing| *existing != alert_id);
        self.by_trigger.remove(&trigger_id)
    }

    fn all(&self) -> Vec<ProximityAlert> {
        self.order
            .iter()
            .filter_map(|id| self.trigger_of.get(id))
            .filter_map(|trigger_id| self.by_trigger.get(trigger_id))
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.by_trigger.len()
    }
}

/// Convenience bundle of in-memory stores.
#[derive(Debug, Default)]
pub struct InMemoryStores {
    /// Trigger store.
    pub triggers: InMemoryTriggerStore,
    /// Alert registry.
    pub alerts: InMemoryAlertRegistry,
}

impl InMemoryStores {
    /// Create a new bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    use crate::error::ValidationError;
    use crate::trigger::Frequency;

    fn spec(title: &str) -> TriggerSpec {
        TriggerSpec::builder()
            .title(title)
            .coordinates(9.0820, 7.4800)
            .radius(300.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_add_assigns_fresh_state() {
        let mut store = InMemoryTriggerStore::new();
        let a = store.add(spec("a")).unwrap();
        let b = store.add(spec("b")).unwrap();
        assert_ne!(a.id, b.id);
        assert!(!a.triggered);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(a.id).unwrap().title, "a");
    }

    #[test]
    fn test_add_rejects_invalid_spec() {
        let mut store = InMemoryTriggerStore::new();
        let mut bad = spec("bad");
        bad.radius = 0.0;
        let err = store.add(bad).unwrap_err();
        assert_eq!(err, StorageError::Invalid(ValidationError::NonPositiveRadius { radius: 0.0 }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_all_preserves_insertion_order() {
        let mut store = InMemoryTriggerStore::new();
        let ids: Vec<_> = ["one", "two", "three", "four"]
            .iter()
            .map(|t| store.add(spec(t)).unwrap().id)
            .collect();
        store.remove(ids[1]);
        let titles: Vec<_> = store.all().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["one", "three", "four"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = InMemoryTriggerStore::new();
        let t = store.add(spec("a")).unwrap();
        assert!(store.remove(t.id).is_some());
        assert!(store.remove(t.id).is_none());
        assert!(store.remove(TriggerId::new()).is_none());
    }

    #[test]
    fn test_toggle_and_not_found() {
        let mut store = InMemoryTriggerStore::new();
        let t = store.add(spec("a")).unwrap();
        assert!(!store.toggle_enabled(t.id).unwrap());
        assert!(store.toggle_enabled(t.id).unwrap());

        let missing = TriggerId::new();
        assert_eq!(store.toggle_enabled(missing), Err(StorageError::TriggerNotFound(missing)));
        assert_eq!(store.mark_triggered(missing), Err(StorageError::TriggerNotFound(missing)));
        assert_eq!(store.set_distance(missing, 1.0), Err(StorageError::TriggerNotFound(missing)));
    }

    #[test]
    fn test_mark_triggered_survives_update() {
        let mut store = InMemoryTriggerStore::new();
        let t = store.add(spec("a")).unwrap();
        store.mark_triggered(t.id).unwrap();
        let updated = store
            .update(
                t.id,
                TriggerPatch {
                    enabled: Some(true),
                    frequency: Some(Frequency::Once),
                    ..TriggerPatch::default()
                },
            )
            .unwrap();
        assert!(updated.triggered);
        assert!(store.get(t.id).unwrap().is_consumed());
    }

    #[test]
    fn test_set_distance() {
        let mut store = InMemoryTriggerStore::new();
        let t = store.add(spec("a")).unwrap();
        store.set_distance(t.id, 42.0).unwrap();
        assert_eq!(store.get(t.id).unwrap().last_known_distance, Some(42.0));
    }

    #[test]
    fn test_registry_dedups_per_trigger() {
        let mut registry = InMemoryAlertRegistry::new();
        let trigger_id = TriggerId::new();
        let now = Utc::now();
        registry.register(ProximityAlert::new(trigger_id, 10.0, now, 1)).unwrap();
        let err = registry
            .register(ProximityAlert::new(trigger_id, 5.0, now, 2))
            .unwrap_err();
        assert_eq!(err, StorageError::DuplicateAlert(trigger_id));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.active_for(trigger_id).unwrap().distance_at_fire, 10.0);
    }

    #[test]
    fn test_registry_clear_allows_new_alert() {
        let mut registry = InMemoryAlertRegistry::new();
        let trigger_id = TriggerId::new();
        let now = Utc::now();
        let first = ProximityAlert::new(trigger_id, 10.0, now, 1);
        registry.register(first.clone()).unwrap();

        assert_eq!(registry.clear(first.id), Some(first.clone()));
        assert!(registry.clear(first.id).is_none());
        assert!(registry.active_for(trigger_id).is_none());

        let second = ProximityAlert::new(trigger_id, 3.0, now, 2);
        registry.register(second.clone()).unwrap();
        assert_eq!(registry.all(), vec![second]);
    }

    #[test]
    fn test_registry_all_in_firing_order() {
        let mut registry = InMemoryAlertRegistry::new();
        let now = Utc::now();
        let alerts: Vec<_> = (0..3u32)
            .map(|i| ProximityAlert::new(TriggerId::new(), f64::from(i), now, u64::from(i)))
            .collect();
        for alert in &alerts {
            registry.register(alert.clone()).unwrap();
        }
        registry.clear(alerts[0].id);
        assert_eq!(registry.all(), alerts[1..].to_vec());
    }
}
