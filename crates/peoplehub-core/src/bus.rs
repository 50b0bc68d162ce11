//! Typed dynamic-data bus connecting independent parts.
//!
//! A source (the People part) registers the properties it exposes and
//! publishes values under `(source_id, property_id)`. A consumer (the Recent
//! Documents part) subscribes to one key and is called with the new value on
//! every publish. The bus keeps the latest value per key so a consumer that
//! connects late can read the current state.
//!
//! Handlers run on the publishing thread, after the internal lock has been
//! released, in subscription order.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Address of one published property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyKey {
    pub source_id: String,
    pub property_id: String,
}

impl PropertyKey {
    pub fn new(source_id: impl Into<String>, property_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            property_id: property_id.into(),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_id, self.property_id)
    }
}

/// A property a source exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub id: String,
    pub title: String,
}

impl PropertyDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// A registered source, as listed for a configuration surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub id: String,
    pub title: String,
}

type Handler<T> = Arc<dyn Fn(Option<T>) + Send + Sync>;

struct SourceEntry {
    info: SourceInfo,
    properties: Vec<PropertyDefinition>,
}

struct Registry<T> {
    sources: Vec<SourceEntry>,
    values: HashMap<PropertyKey, T>,
    handlers: HashMap<PropertyKey, Vec<(u64, Handler<T>)>>,
}

impl<T> Registry<T> {
    fn source(&self, source_id: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.info.id == source_id)
    }
}

struct BusInner<T> {
    registry: RwLock<Registry<T>>,
    next_handler_id: AtomicU64,
}

impl<T> BusInner<T> {
    fn read(&self) -> RwLockReadGuard<'_, Registry<T>> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry<T>> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    fn remove_handler(&self, key: &PropertyKey, id: u64) {
        let mut registry = self.write();
        if let Some(list) = registry.handlers.get_mut(key) {
            list.retain(|(hid, _)| *hid != id);
            if list.is_empty() {
                registry.handlers.remove(key);
            }
        }
    }
}

/// Publish/subscribe bus for values of type `T`. Cloning shares the bus.
pub struct DynamicDataBus<T> {
    inner: Arc<BusInner<T>>,
}

impl<T> Clone for DynamicDataBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for DynamicDataBus<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DynamicDataBus<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: RwLock::new(Registry {
                    sources: Vec::new(),
                    values: HashMap::new(),
                    handlers: HashMap::new(),
                }),
                next_handler_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register (or re-register) a source and the properties it exposes.
    pub fn register_source(
        &self,
        source_id: impl Into<String>,
        title: impl Into<String>,
        properties: Vec<PropertyDefinition>,
    ) {
        let info = SourceInfo {
            id: source_id.into(),
            title: title.into(),
        };
        debug!(source_id = %info.id, properties = properties.len(), "Registering data source");

        let mut registry = self.inner.write();
        match registry.sources.iter_mut().find(|s| s.info.id == info.id) {
            Some(existing) => {
                existing.info = info;
                existing.properties = properties;
            }
            None => registry.sources.push(SourceEntry { info, properties }),
        }
    }

    /// Sources in registration order.
    pub fn available_sources(&self) -> Vec<SourceInfo> {
        self.inner
            .read()
            .sources
            .iter()
            .map(|s| s.info.clone())
            .collect()
    }

    /// Property definitions of a source, or `None` if it is not registered.
    pub fn property_definitions(&self, source_id: &str) -> Option<Vec<PropertyDefinition>> {
        self.inner
            .read()
            .source(source_id)
            .map(|s| s.properties.clone())
    }

    /// Latest value published under `key`.
    pub fn current(&self, key: &PropertyKey) -> Option<T> {
        self.inner.read().values.get(key).cloned()
    }

    /// Store `value` under `key` and notify every handler subscribed to it.
    pub fn publish(&self, key: &PropertyKey, value: Option<T>) {
        let handlers: Vec<Handler<T>> = {
            let mut registry = self.inner.write();
            match &value {
                Some(v) => {
                    registry.values.insert(key.clone(), v.clone());
                }
                None => {
                    registry.values.remove(key);
                }
            }
            registry
                .handlers
                .get(key)
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        debug!(key = %key, subscriber_count = handlers.len(), "Publishing property change");
        for handler in handlers {
            handler(value.clone());
        }
    }

    /// Call `handler` on every publish to `key`.
    ///
    /// Fails with [`Error::NotFound`] when the source is not registered or does
    /// not expose the property.
    pub fn subscribe<F>(&self, key: &PropertyKey, handler: F) -> Result<Subscription<T>>
    where
        F: Fn(Option<T>) + Send + Sync + 'static,
    {
        let mut registry = self.inner.write();
        let source = registry
            .source(&key.source_id)
            .ok_or_else(|| Error::NotFound(format!("data source '{}'", key.source_id)))?;
        if !source.properties.iter().any(|p| p.id == key.property_id) {
            return Err(Error::NotFound(format!(
                "property '{}' on data source '{}'",
                key.property_id, key.source_id
            )));
        }

        let id = self.inner.next_handler_id.fetch_add(1, Ordering::Relaxed);
        registry
            .handlers
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(handler)));
        debug!(key = %key, handler_id = id, "Subscribed to property");

        Ok(Subscription {
            bus: Arc::downgrade(&self.inner),
            key: key.clone(),
            id,
            active: true,
        })
    }

    /// Number of handlers subscribed to `key`.
    pub fn subscriber_count(&self, key: &PropertyKey) -> usize {
        self.inner.read().handlers.get(key).map_or(0, Vec::len)
    }
}

/// Handle to one subscription. Unsubscribes on [`unsubscribe`](Self::unsubscribe) or drop.
pub struct Subscription<T> {
    bus: Weak<BusInner<T>>,
    key: PropertyKey,
    id: u64,
    active: bool,
}

impl<T> Subscription<T> {
    pub fn key(&self) -> &PropertyKey {
        &self.key
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(bus) = self.bus.upgrade() {
            bus.remove_handler(&self.key, self.id);
            debug!(key = %self.key, handler_id = self.id, "Unsubscribed from property");
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn user_key() -> PropertyKey {
        PropertyKey::new("people", "user")
    }

    fn bus_with_people_source() -> DynamicDataBus<String> {
        let bus = DynamicDataBus::new();
        bus.register_source("people", "People", vec![PropertyDefinition::new("user", "User")]);
        bus
    }

    #[test]
    fn test_publish_notifies_subscriber() {
        let bus = bus_with_people_source();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = bus
            .subscribe(&user_key(), move |v| sink.lock().unwrap().push(v))
            .unwrap();

        bus.publish(&user_key(), Some("alice".to_string()));
        bus.publish(&user_key(), None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("alice".to_string()), None]
        );
    }

    #[test]
    fn test_current_tracks_latest_value() {
        let bus = bus_with_people_source();
        assert_eq!(bus.current(&user_key()), None);

        bus.publish(&user_key(), Some("bob".to_string()));
        assert_eq!(bus.current(&user_key()), Some("bob".to_string()));

        bus.publish(&user_key(), None);
        assert_eq!(bus.current(&user_key()), None);
    }

    #[test]
    fn test_subscribe_unknown_source_fails() {
        let bus: DynamicDataBus<String> = DynamicDataBus::new();
        let err = bus.subscribe(&user_key(), |_| {}).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_subscribe_unknown_property_fails() {
        let bus = bus_with_people_source();
        let err = bus
            .subscribe(&PropertyKey::new("people", "group"), |_| {})
            .unwrap_err();
        assert!(err.to_string().contains("property 'group'"));
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let bus = bus_with_people_source();
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let sub = bus
            .subscribe(&user_key(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        bus.publish(&user_key(), Some("a".to_string()));
        sub.unsubscribe();
        bus.publish(&user_key(), Some("b".to_string()));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(&user_key()), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = bus_with_people_source();
        {
            let _sub = bus.subscribe(&user_key(), |_| {}).unwrap();
            assert_eq!(bus.subscriber_count(&user_key()), 1);
        }
        assert_eq!(bus.subscriber_count(&user_key()), 0);
    }

    #[test]
    fn test_handler_may_read_bus_during_publish() {
        let bus = bus_with_people_source();
        let reader = bus.clone();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let _sub = bus
            .subscribe(&user_key(), move |_| {
                *sink.lock().unwrap() = reader.current(&user_key());
            })
            .unwrap();

        bus.publish(&user_key(), Some("carol".to_string()));
        assert_eq!(*seen.lock().unwrap(), Some("carol".to_string()));
    }

    #[test]
    fn test_sources_and_definitions() {
        let bus = bus_with_people_source();
        bus.register_source("other", "Other", vec![]);

        let sources = bus.available_sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].id, "people");
        assert_eq!(
            bus.property_definitions("people").unwrap(),
            vec![PropertyDefinition::new("user", "User")]
        );
        assert!(bus.property_definitions("missing").is_none());
    }

    #[test]
    fn test_reregister_replaces_definitions() {
        let bus = bus_with_people_source();
        bus.register_source("people", "People v2", vec![PropertyDefinition::new("group", "Group")]);

        assert_eq!(bus.available_sources().len(), 1);
        assert_eq!(bus.available_sources()[0].title, "People v2");
        assert!(bus.subscribe(&user_key(), |_| {}).is_err());
    }
}
