//! # peoplehub-parts
//!
//! Headless controllers for the People and Recent Documents views.
//!
//! [`PeoplePart`] lists the users of a site group and publishes the selected
//! user on a [`DynamicDataBus`](peoplehub_core::DynamicDataBus).
//! [`RecentDocumentsPart`] subscribes to that property and keeps the selected
//! user's recent documents. Both hold their view state behind a lock and
//! expose snapshots; neither knows which backend it talks to.

pub mod documents;
pub mod people;
pub mod settings;

#[cfg(test)]
pub(crate) mod mock;

pub use documents::{DocumentsState, RecentDocumentsPart};
pub use people::{PeoplePart, PeopleState};
pub use settings::{DocumentsSettings, PeopleSettings};
