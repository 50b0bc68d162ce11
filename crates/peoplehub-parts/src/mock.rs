//! In-memory directory and search doubles for part controller tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use peoplehub_core::{
    DocumentResult, DocumentSearch, Error, GroupResolution, MemberType, PeopleDirectory, PhotoKind,
    Result, SiteMember, User,
};

struct GroupReply {
    delay: Duration,
    result: std::result::Result<GroupResolution, String>,
}

/// Directory with canned groups, optional per-group latency, and photos.
#[derive(Default)]
pub struct MockDirectory {
    members: Vec<SiteMember>,
    groups: HashMap<i64, GroupReply>,
    photos: HashMap<String, Option<String>>,
    photo_requests: Mutex<Vec<String>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site_group(mut self, id: i64, title: &str) -> Self {
        self.members.push(SiteMember {
            principal_id: id,
            id,
            title: title.to_string(),
            member_type: MemberType::Group,
        });
        self
    }

    pub fn with_group(self, id: i64, users: Vec<User>) -> Self {
        self.with_delayed_group(id, Duration::ZERO, users)
    }

    pub fn with_delayed_group(mut self, id: i64, delay: Duration, users: Vec<User>) -> Self {
        self.groups.insert(
            id,
            GroupReply {
                delay,
                result: Ok(GroupResolution {
                    users,
                    warnings: Vec::new(),
                }),
            },
        );
        self
    }

    pub fn with_resolution(mut self, id: i64, resolution: GroupResolution) -> Self {
        self.groups.insert(
            id,
            GroupReply {
                delay: Duration::ZERO,
                result: Ok(resolution),
            },
        );
        self
    }

    pub fn with_failing_group(mut self, id: i64, message: &str) -> Self {
        self.groups.insert(
            id,
            GroupReply {
                delay: Duration::ZERO,
                result: Err(message.to_string()),
            },
        );
        self
    }

    /// `Some(url)` for a photo, `None` for a user without one. Users not
    /// listed fail the fetch.
    pub fn with_photo(mut self, user_id: &str, photo: Option<&str>) -> Self {
        self.photos
            .insert(user_id.to_string(), photo.map(str::to_string));
        self
    }

    pub fn photo_requests(&self) -> Vec<String> {
        self.photo_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeopleDirectory for MockDirectory {
    async fn member_info(&self) -> Result<Vec<SiteMember>> {
        Ok(self.members.clone())
    }

    async fn resolve_group_members(&self, group_id: i64) -> Result<GroupResolution> {
        let reply = self
            .groups
            .get(&group_id)
            .ok_or_else(|| Error::remote("/_api/Web/sitegroups", "returned 404 Not Found"))?;
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply
            .result
            .clone()
            .map_err(|message| Error::remote("/_api/Web/sitegroups", message))
    }

    async fn image(&self, id: &str, _kind: PhotoKind) -> Result<Option<String>> {
        self.photo_requests.lock().unwrap().push(id.to_string());
        self.photos
            .get(id)
            .cloned()
            .ok_or_else(|| Error::remote("/beta/users/photo", "returned 404 Not Found"))
    }
}

struct SearchReply {
    delay: Duration,
    result: std::result::Result<Vec<DocumentResult>, String>,
}

/// Search keyed by author id (`None` for the unfiltered query).
#[derive(Default)]
pub struct MockSearch {
    replies: HashMap<Option<String>, SearchReply>,
    queries: Mutex<Vec<Option<String>>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(self, author: Option<&str>, results: Vec<DocumentResult>) -> Self {
        self.with_delayed_results(author, Duration::ZERO, results)
    }

    pub fn with_delayed_results(
        mut self,
        author: Option<&str>,
        delay: Duration,
        results: Vec<DocumentResult>,
    ) -> Self {
        self.replies.insert(
            author.map(str::to_string),
            SearchReply {
                delay,
                result: Ok(results),
            },
        );
        self
    }

    pub fn with_failure(mut self, author: Option<&str>, message: &str) -> Self {
        self.replies.insert(
            author.map(str::to_string),
            SearchReply {
                delay: Duration::ZERO,
                result: Err(message.to_string()),
            },
        );
        self
    }

    /// Author ids searched so far, in call order.
    pub fn queries(&self) -> Vec<Option<String>> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentSearch for MockSearch {
    async fn search(&self, user: Option<&User>) -> Result<Vec<DocumentResult>> {
        let author = user.map(|u| u.id.clone());
        self.queries.lock().unwrap().push(author.clone());
        let Some(reply) = self.replies.get(&author) else {
            return Ok(Vec::new());
        };
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply
            .result
            .clone()
            .map_err(|message| Error::remote("/_api/search/query", message))
    }
}

pub fn doc(id: &str, title: &str) -> DocumentResult {
    DocumentResult {
        id: id.to_string(),
        title: title.to_string(),
        ..Default::default()
    }
}
