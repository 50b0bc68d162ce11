//! Recent Documents part: shows documents modified by the user another part
//! publishes.
//!
//! The part subscribes to one `(source_id, property_id)` key on the bus. Every
//! notification takes a generation on the publishing thread and then spawns a
//! refresh on the Tokio runtime that was current when the part connected, so
//! only the refresh of the latest notification commits, whatever order the
//! spawned tasks run in.

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tokio::runtime::Handle;
use tracing::{debug, field, info, info_span, warn, Instrument};
use uuid::Uuid;

use peoplehub_core::logging::{
    COMPONENT, DURATION_MS, ERROR_MSG, GENERATION, OPERATION, REQUEST_ID, RESULT_COUNT, SUBSYSTEM,
    USER_ID,
};
use peoplehub_core::{
    DocumentResult, DocumentSearch, DynamicDataBus, Error, Generation, GenerationCounter,
    PropertyDefinition, PropertyKey, Result, SourceInfo, Subscription, User,
};

use crate::settings::DocumentsSettings;

/// Snapshot of what the Recent Documents view renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentsState {
    pub loading: bool,
    pub results: Vec<DocumentResult>,
    pub user: Option<User>,
    pub error: Option<String>,
}

struct DocumentsInner {
    search: Arc<dyn DocumentSearch>,
    state: RwLock<DocumentsState>,
    generations: GenerationCounter,
}

impl DocumentsInner {
    /// Run a search for `user` under `generation`, taken by the caller when
    /// the trigger happens.
    async fn refresh(&self, user: Option<User>, generation: Generation) -> Generation {
        let span = info_span!(
            "documents_refresh",
            { SUBSYSTEM } = "parts",
            { COMPONENT } = "documents_part",
            { OPERATION } = "refresh",
            { REQUEST_ID } = field::display(Uuid::now_v7()),
            { GENERATION } = generation.value(),
            { USER_ID } = field::Empty,
            { RESULT_COUNT } = field::Empty,
            { DURATION_MS } = field::Empty,
            { ERROR_MSG } = field::Empty,
        );
        if let Some(u) = &user {
            span.record(USER_ID, u.id.as_str());
        }
        let start = Instant::now();

        {
            let mut state = self.write();
            if self.generations.is_current(generation) {
                state.loading = true;
                state.user = user.clone();
            }
        }

        let result = self
            .search
            .search(user.as_ref())
            .instrument(span.clone())
            .await;
        span.record(DURATION_MS, start.elapsed().as_millis() as u64);

        let mut state = self.write();
        if !self.generations.is_current(generation) {
            span.in_scope(|| debug!("Discarding stale document results"));
            return generation;
        }

        state.loading = false;
        state.user = user;
        match result {
            Ok(results) => {
                span.record(RESULT_COUNT, results.len());
                span.in_scope(|| info!("Document results loaded"));
                state.results = results;
                state.error = None;
            }
            Err(e) => {
                span.record(ERROR_MSG, field::display(&e));
                span.in_scope(|| warn!(error = %e, "Document search failed"));
                state.results.clear();
                state.error = Some(e.to_string());
            }
        }
        generation
    }

    /// Take a generation now and run the refresh on `handle`.
    fn spawn_refresh(self: &Arc<Self>, handle: &Handle, user: Option<User>) -> Generation {
        let generation = self.generations.next();
        let inner = Arc::clone(self);
        handle.spawn(async move {
            inner.refresh(user, generation).await;
        });
        generation
    }

    fn read(&self) -> RwLockReadGuard<'_, DocumentsState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DocumentsState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Controller behind the Recent Documents view.
pub struct RecentDocumentsPart {
    inner: Arc<DocumentsInner>,
    subscription: Mutex<Option<Subscription<User>>>,
}

impl RecentDocumentsPart {
    pub fn new(search: Arc<dyn DocumentSearch>) -> Self {
        Self {
            inner: Arc::new(DocumentsInner {
                search,
                state: RwLock::new(DocumentsState::default()),
                generations: GenerationCounter::new(),
            }),
            subscription: Mutex::new(None),
        }
    }

    pub fn state(&self) -> DocumentsState {
        self.inner.read().clone()
    }

    /// True while the settings don't name a source and property.
    pub fn needs_configuration(settings: &DocumentsSettings) -> bool {
        settings.needs_configuration()
    }

    /// Sources a configuration surface can offer.
    pub fn source_options(bus: &DynamicDataBus<User>) -> Vec<SourceInfo> {
        bus.available_sources()
    }

    /// Properties of the chosen source, empty when it is unknown.
    pub fn property_options(bus: &DynamicDataBus<User>, source_id: &str) -> Vec<PropertyDefinition> {
        bus.property_definitions(source_id).unwrap_or_default()
    }

    /// Subscribe to the configured property and load results for its current
    /// value.
    ///
    /// Any previous subscription is dropped first. Unconfigured settings leave
    /// the part disconnected. Must be called from within a Tokio runtime.
    pub fn connect(&self, bus: &DynamicDataBus<User>, settings: &DocumentsSettings) -> Result<()> {
        let mut slot = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            debug!(key = %previous.key(), "Dropping previous subscription");
        }

        if settings.needs_configuration() {
            debug!("Documents part is not configured");
            return Ok(());
        }

        let handle = Handle::try_current()
            .map_err(|e| Error::Internal(format!("no Tokio runtime to run refreshes on: {}", e)))?;
        let key = PropertyKey::new(settings.source_id.as_str(), settings.property_id.as_str());

        let inner = Arc::clone(&self.inner);
        let spawner = handle.clone();
        let subscription = bus
            .subscribe(&key, move |user| {
                inner.spawn_refresh(&spawner, user);
            })
            .map_err(|e| {
                warn!(key = %key, error = %e, "Failed to connect to data source");
                let mut state = self.inner.write();
                state.loading = false;
                state.error = Some(format!(
                    "An error has occurred while connecting to the data source. Details: {}",
                    e
                ));
                e
            })?;
        info!(key = %key, "Connected to data source");
        *slot = Some(subscription);

        self.inner.spawn_refresh(&handle, bus.current(&key));
        Ok(())
    }

    /// Drop the subscription, if any.
    pub fn disconnect(&self) {
        let mut slot = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(subscription) = slot.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Search for `user`'s documents and commit them unless a newer refresh
    /// has started meanwhile.
    pub async fn refresh(&self, user: Option<User>) -> Generation {
        let generation = self.inner.generations.next();
        self.inner.refresh(user, generation).await
    }
}

impl std::fmt::Debug for RecentDocumentsPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecentDocumentsPart")
            .field("connected", &self.is_connected())
            .field("generation", &self.inner.generations.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock::{doc, MockSearch};

    fn people_bus() -> DynamicDataBus<User> {
        let bus = DynamicDataBus::new();
        bus.register_source(
            "people-1",
            "People",
            vec![PropertyDefinition::new("user", "User")],
        );
        bus
    }

    fn user_key() -> PropertyKey {
        PropertyKey::new("people-1", "user")
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_refresh_commits_results() {
        let search = MockSearch::new().with_results(Some("a@x.com"), vec![doc("1", "Plan")]);
        let part = RecentDocumentsPart::new(Arc::new(search));

        part.refresh(Some(User::new("a@x.com", "Alice"))).await;
        let state = part.state();
        assert!(!state.loading);
        assert_eq!(state.results, vec![doc("1", "Plan")]);
        assert_eq!(state.user.unwrap().id, "a@x.com");
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_refresh_failure_sets_error() {
        let search = MockSearch::new().with_failure(None, "returned 503");
        let part = RecentDocumentsPart::new(Arc::new(search));

        part.refresh(None).await;
        let state = part.state();
        assert!(state.results.is_empty());
        assert!(state.error.unwrap().contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_refresh_is_discarded() {
        let search = MockSearch::new()
            .with_delayed_results(Some("a@x.com"), Duration::from_millis(400), vec![doc("1", "A")])
            .with_delayed_results(Some("b@x.com"), Duration::from_millis(20), vec![doc("2", "B")]);
        let part = RecentDocumentsPart::new(Arc::new(search));

        let (first, second) = tokio::join!(
            part.refresh(Some(User::new("a@x.com", "Alice"))),
            part.refresh(Some(User::new("b@x.com", "Bob")))
        );
        assert!(first < second);

        let state = part.state();
        assert_eq!(state.results, vec![doc("2", "B")]);
        assert_eq!(state.user.unwrap().id, "b@x.com");
    }

    #[tokio::test]
    async fn test_connect_without_configuration_is_inert() {
        let search = Arc::new(MockSearch::new());
        let part = RecentDocumentsPart::new(search.clone());
        let bus = people_bus();

        part.connect(&bus, &DocumentsSettings::default()).unwrap();
        settle().await;

        assert!(!part.is_connected());
        assert!(search.queries().is_empty());
        assert_eq!(part.state(), DocumentsState::default());
    }

    #[tokio::test]
    async fn test_connect_loads_current_value_and_follows_publishes() {
        let search = Arc::new(
            MockSearch::new()
                .with_results(Some("a@x.com"), vec![doc("1", "A")])
                .with_results(Some("b@x.com"), vec![doc("2", "B")]),
        );
        let part = RecentDocumentsPart::new(search.clone());
        let bus = people_bus();
        bus.publish(&user_key(), Some(User::new("a@x.com", "Alice")));

        part.connect(&bus, &DocumentsSettings::new("people-1", "user"))
            .unwrap();
        settle().await;
        assert_eq!(part.state().results, vec![doc("1", "A")]);

        bus.publish(&user_key(), Some(User::new("b@x.com", "Bob")));
        settle().await;
        assert_eq!(part.state().results, vec![doc("2", "B")]);
        assert_eq!(
            search.queries(),
            vec![Some("a@x.com".to_string()), Some("b@x.com".to_string())]
        );
    }

    #[tokio::test]
    async fn test_connect_to_unknown_source_renders_error() {
        let part = RecentDocumentsPart::new(Arc::new(MockSearch::new()));
        let bus = people_bus();

        let err = part
            .connect(&bus, &DocumentsSettings::new("missing", "user"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(!part.is_connected());
        assert!(part
            .state()
            .error
            .unwrap()
            .starts_with("An error has occurred while connecting to the data source."));
    }

    #[tokio::test]
    async fn test_reconnect_drops_previous_subscription() {
        let search = Arc::new(MockSearch::new());
        let part = RecentDocumentsPart::new(search.clone());
        let bus = people_bus();
        bus.register_source(
            "people-2",
            "Other People",
            vec![PropertyDefinition::new("user", "User")],
        );
        let other_key = PropertyKey::new("people-2", "user");

        part.connect(&bus, &DocumentsSettings::new("people-1", "user"))
            .unwrap();
        part.connect(&bus, &DocumentsSettings::new("people-2", "user"))
            .unwrap();
        assert_eq!(bus.subscriber_count(&user_key()), 0);
        assert_eq!(bus.subscriber_count(&other_key), 1);

        part.disconnect();
        assert_eq!(bus.subscriber_count(&other_key), 0);
        assert!(!part.is_connected());
    }

    #[tokio::test]
    async fn test_configuration_options() {
        let bus = people_bus();
        let sources = RecentDocumentsPart::source_options(&bus);
        assert_eq!(sources[0].id, "people-1");
        assert_eq!(
            RecentDocumentsPart::property_options(&bus, "people-1"),
            vec![PropertyDefinition::new("user", "User")]
        );
        assert!(RecentDocumentsPart::property_options(&bus, "missing").is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_latest_publish_wins_across_worker_threads() {
        let alice = User::new("a@x.com", "Alice");
        let bob = User::new("b@x.com", "Bob");

        for _ in 0..50 {
            let search = Arc::new(
                MockSearch::new()
                    .with_delayed_results(Some("a@x.com"), Duration::from_millis(5), vec![doc("1", "A")])
                    .with_results(Some("b@x.com"), vec![doc("2", "B")]),
            );
            let part = RecentDocumentsPart::new(search.clone());
            let bus = people_bus();
            part.connect(&bus, &DocumentsSettings::new("people-1", "user"))
                .unwrap();

            // Publishing from a worker thread puts the newest spawn in the
            // LIFO slot, so B's refresh may start before A's.
            let publisher = bus.clone();
            let (first, second) = (alice.clone(), bob.clone());
            tokio::spawn(async move {
                publisher.publish(&user_key(), Some(first));
                publisher.publish(&user_key(), Some(second));
            })
            .await
            .unwrap();

            for _ in 0..200 {
                if search.queries().len() == 3 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            assert_eq!(search.queries().len(), 3);
            tokio::time::sleep(Duration::from_millis(30)).await;

            let state = part.state();
            assert!(!state.loading);
            assert_eq!(state.user, Some(bob.clone()));
            assert_eq!(state.results, vec![doc("2", "B")]);
        }
    }
}
