//! Core traits for peoplehub abstractions.
//!
//! The part controllers only see these traits, so they run unchanged against
//! the SharePoint/Graph clients or an in-memory test double.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, trace};

use crate::error::Result;
use crate::models::*;

// =============================================================================
// PEOPLE DIRECTORY
// =============================================================================

/// Source of site members, group users, and avatars.
#[async_trait]
pub trait PeopleDirectory: Send + Sync {
    /// List the site's role-assignment members (group picker contents).
    async fn member_info(&self) -> Result<Vec<SiteMember>>;

    /// Resolve a site group into a flat, de-duplicated user list.
    async fn resolve_group_members(&self, group_id: i64) -> Result<GroupResolution>;

    /// Fetch a small avatar as a self-contained URL. `None` when there is no photo.
    async fn image(&self, id: &str, kind: PhotoKind) -> Result<Option<String>>;
}

// =============================================================================
// DOCUMENT SEARCH
// =============================================================================

/// Source of recently modified documents.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    /// Search documents, filtered by author when a user is given.
    async fn search(&self, user: Option<&User>) -> Result<Vec<DocumentResult>>;
}

/// Fetch every user's avatar concurrently and report each one as it lands.
///
/// `on_update(index, photo)` is called in completion order, once per user that
/// has a photo. Failed fetches are logged and skipped. Returns the number of
/// photos reported.
pub async fn backfill_photos<D, F>(directory: &D, users: &[User], mut on_update: F) -> usize
where
    D: PeopleDirectory + ?Sized,
    F: FnMut(usize, String),
{
    let mut pending: FuturesUnordered<_> = users
        .iter()
        .enumerate()
        .map(|(index, user)| async move {
            (index, directory.image(&user.id, PhotoKind::Users).await)
        })
        .collect();

    let mut applied = 0;
    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(Some(photo)) => {
                trace!(index, "Photo fetched");
                on_update(index, photo);
                applied += 1;
            }
            Ok(None) => trace!(index, "No photo"),
            Err(e) => debug!(index, error = %e, "Photo fetch failed, leaving unset"),
        }
    }
    applied
}
