//! People part: lists the users of a site group and publishes the selected one.
//!
//! A load resolves the configured group, commits the user list, and then
//! backfills avatars one by one as they arrive. Each load takes a fresh
//! [`Generation`]; a load that has been superseded commits nothing, including
//! photo updates still in flight.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tracing::{debug, field, info, info_span, warn, Instrument};
use uuid::Uuid;

use peoplehub_core::defaults::{USER_PROPERTY_ID, USER_PROPERTY_TITLE};
use peoplehub_core::logging::{
    COMPONENT, DURATION_MS, ERROR_MSG, GENERATION, GROUP_ID, OPERATION, REQUEST_ID, RESULT_COUNT,
    SUBSYSTEM, USER_ID, WARNING_COUNT,
};
use peoplehub_core::{
    backfill_photos, DynamicDataBus, ExpansionWarning, Generation, GenerationCounter,
    GroupOption, PeopleDirectory, PropertyDefinition, PropertyKey, Result, User,
};

use crate::settings::PeopleSettings;

/// Snapshot of what the People view renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeopleState {
    pub loading: bool,
    pub users: Vec<User>,
    pub warnings: Vec<ExpansionWarning>,
    pub error: Option<String>,
}

/// Controller behind the People view.
pub struct PeoplePart {
    source_id: String,
    directory: Arc<dyn PeopleDirectory>,
    bus: DynamicDataBus<User>,
    state: RwLock<PeopleState>,
    generations: GenerationCounter,
}

impl PeoplePart {
    /// Create the part and register it on `bus` as a source exposing `user`.
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        directory: Arc<dyn PeopleDirectory>,
        bus: DynamicDataBus<User>,
    ) -> Self {
        let source_id = source_id.into();
        bus.register_source(
            source_id.clone(),
            title,
            vec![PropertyDefinition::new(USER_PROPERTY_ID, USER_PROPERTY_TITLE)],
        );
        Self {
            source_id,
            directory,
            bus,
            state: RwLock::new(PeopleState::default()),
            generations: GenerationCounter::new(),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Bus key under which the selected user is published.
    pub fn user_key(&self) -> PropertyKey {
        PropertyKey::new(self.source_id.clone(), USER_PROPERTY_ID)
    }

    pub fn state(&self) -> PeopleState {
        self.read().clone()
    }

    /// Load the users of the configured group.
    ///
    /// Returns the generation of this load. Failures land in
    /// [`PeopleState::error`] rather than being returned.
    pub async fn load(&self, settings: &PeopleSettings) -> Generation {
        let generation = self.generations.next();

        let Some(group_id) = settings.selected_group else {
            debug!({ GENERATION } = %generation, "No group selected");
            *self.write() = PeopleState::default();
            return generation;
        };

        let span = info_span!(
            "people_load",
            { SUBSYSTEM } = "parts",
            { COMPONENT } = "people_part",
            { OPERATION } = "load",
            { REQUEST_ID } = field::display(Uuid::now_v7()),
            { GROUP_ID } = group_id,
            { GENERATION } = generation.value(),
            { RESULT_COUNT } = field::Empty,
            { WARNING_COUNT } = field::Empty,
            { DURATION_MS } = field::Empty,
            { ERROR_MSG } = field::Empty,
        );
        let start = Instant::now();

        {
            let mut state = self.write();
            state.loading = true;
            state.error = None;
        }

        let resolved = self
            .directory
            .resolve_group_members(group_id)
            .instrument(span.clone())
            .await;
        span.record(DURATION_MS, start.elapsed().as_millis() as u64);

        let mut state = self.write();
        if !self.generations.is_current(generation) {
            span.in_scope(|| debug!("Discarding stale group resolution"));
            return generation;
        }

        let users = match resolved {
            Ok(resolution) => {
                span.record(RESULT_COUNT, resolution.users.len());
                span.record(WARNING_COUNT, resolution.warnings.len());
                state.loading = false;
                state.users = resolution.users;
                state.warnings = resolution.warnings;
                state.users.clone()
            }
            Err(e) => {
                span.record(ERROR_MSG, field::display(&e));
                span.in_scope(|| warn!(error = %e, "Failed to load group users"));
                *state = PeopleState {
                    error: Some(e.to_string()),
                    ..PeopleState::default()
                };
                return generation;
            }
        };
        drop(state);
        span.in_scope(|| info!("Group users loaded"));

        let applied = backfill_photos(self.directory.as_ref(), &users, |index, photo| {
            if !self.generations.is_current(generation) {
                return;
            }
            if let Some(user) = self.write().users.get_mut(index) {
                user.photo = Some(photo);
            }
        })
        .instrument(span.clone())
        .await;
        span.in_scope(|| debug!(photos = applied, "Photo backfill finished"));

        generation
    }

    /// Publish `user` as the selection.
    pub fn select_user(&self, user: User) {
        debug!(source_id = %self.source_id, { USER_ID } = %user.id, "User selected");
        self.bus.publish(&self.user_key(), Some(user));
    }

    /// Withdraw the current selection.
    pub fn clear_selection(&self) {
        self.bus.publish(&self.user_key(), None);
    }

    /// Currently published selection.
    pub fn selected_user(&self) -> Option<User> {
        self.bus.current(&self.user_key())
    }

    /// Group picker entries, one per role-assignment member.
    pub async fn group_options(&self) -> Result<Vec<GroupOption>> {
        let members = self.directory.member_info().await?;
        Ok(members.iter().map(GroupOption::from).collect())
    }

    fn read(&self) -> RwLockReadGuard<'_, PeopleState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PeopleState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for PeoplePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeoplePart")
            .field("source_id", &self.source_id)
            .field("generation", &self.generations.current())
            .finish()
    }
}
