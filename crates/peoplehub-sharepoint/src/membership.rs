//! Site membership resolution: role assignments, site groups, and directory
//! group expansion.
//!
//! A site group can contain individual users and directory (security) groups.
//! Users are taken as-is; directory groups are expanded through Graph, one
//! level deep. Nested groups inside a directory group are not expanded.

use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, field, info, info_span, trace, warn, Instrument};

use peoplehub_core::defaults::{
    GRAPH_PHOTO_VERSION, GRAPH_VERSION, PHOTO_SIZE, SITE_GROUP_PRINCIPAL, SITE_USER_PRINCIPAL,
};
use peoplehub_core::logging::{
    COMPONENT, DIRECTORY_GROUP_ID, DURATION_MS, GROUP_ID, OPERATION, RESULT_COUNT, SUBSYSTEM,
    USER_ID, WARNING_COUNT,
};
use peoplehub_core::{
    backfill_photos, dedupe_users, login_suffix, DirectoryMember, Error, ExpansionPolicy,
    ExpansionWarning, GroupResolution, MemberType, PeopleDirectory, PhotoKind, Result, SiteMember,
    User,
};

use crate::avatar::photo_data_url;
use crate::client::SharePointClient;
use crate::types::{GraphMember, ODataList, RoleAssignment, SiteUserEntry};

/// Upper bound on Graph member pages followed for one directory group.
const MAX_MEMBER_PAGES: usize = 50;

/// One entry of a site group, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MemberSource {
    /// Individual user, already resolved.
    Direct(DirectoryMember),
    /// Directory group to expand, by Graph id.
    DirectoryGroup(String),
}

/// Resolves site groups into flat user lists and fetches avatars.
#[derive(Debug, Clone)]
pub struct MembershipResolver {
    client: SharePointClient,
    policy: ExpansionPolicy,
}

impl MembershipResolver {
    /// Create a resolver using the client's configured expansion policy.
    pub fn new(client: SharePointClient) -> Self {
        let policy = client.config().expansion_policy;
        Self { client, policy }
    }

    /// Override the expansion policy.
    pub fn with_policy(mut self, policy: ExpansionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ExpansionPolicy {
        self.policy
    }

    /// List the site's role-assignment members.
    pub async fn get_member_info(&self) -> Result<Vec<SiteMember>> {
        let url = self
            .client
            .site_url("/_api/Web/roleassignments?$expand=member");
        let list: ODataList<RoleAssignment> = self.client.get_sharepoint_json(&url, &[]).await?;

        let members: Vec<SiteMember> = list
            .value
            .into_iter()
            .map(|ra| SiteMember {
                principal_id: ra.principal_id,
                id: ra.member.id,
                title: ra.member.title.unwrap_or_default(),
                member_type: MemberType::from_principal_type(ra.member.principal_type),
            })
            .collect();

        debug!({ RESULT_COUNT } = members.len(), "Fetched site member info");
        Ok(members)
    }

    /// Resolve a site group into a de-duplicated user list.
    ///
    /// Directory groups are expanded concurrently. Under
    /// [`ExpansionPolicy::BestEffort`] a failed expansion becomes a warning and
    /// the call fails only if every source failed; under
    /// [`ExpansionPolicy::FailFast`] the first failure is returned.
    pub async fn resolve_group_members(&self, group_id: i64) -> Result<GroupResolution> {
        if group_id <= 0 {
            return Err(Error::InvalidInput(format!(
                "site group id must be positive, got {}",
                group_id
            )));
        }

        let span = info_span!(
            "resolve_group_members",
            { SUBSYSTEM } = "sharepoint",
            { COMPONENT } = "membership",
            { OPERATION } = "resolve_group_members",
            { GROUP_ID } = group_id,
            { RESULT_COUNT } = field::Empty,
            { WARNING_COUNT } = field::Empty,
            { DURATION_MS } = field::Empty,
        );
        let start = Instant::now();

        let resolution = async {
            let url = self
                .client
                .site_url(&format!("/_api/Web/sitegroups({})/Users", group_id));
            let list: ODataList<SiteUserEntry> =
                self.client.get_sharepoint_json(&url, &[]).await?;

            let sources = classify(list.value);
            debug!(source_count = sources.len(), "Classified site group entries");

            let expansions = sources.iter().map(|source| async move {
                match source {
                    MemberSource::Direct(member) => Ok(vec![member.clone()]),
                    MemberSource::DirectoryGroup(id) => self.expand_directory_group(id).await,
                }
            });
            let results = join_all(expansions).await;

            merge(&sources, results, self.policy)
        }
        .instrument(span.clone())
        .await?;

        span.record(RESULT_COUNT, resolution.users.len());
        span.record(WARNING_COUNT, resolution.warnings.len());
        span.record(DURATION_MS, start.elapsed().as_millis() as u64);
        span.in_scope(|| {
            info!(
                users = resolution.users.len(),
                warnings = resolution.warnings.len(),
                "Resolved site group"
            )
        });
        Ok(resolution)
    }

    /// Members of a directory group, one level deep. Members without a mail
    /// address (nested groups, devices, contacts) are skipped.
    async fn expand_directory_group(&self, group_id: &str) -> Result<Vec<DirectoryMember>> {
        let mut url = self
            .client
            .graph_segments_url(GRAPH_VERSION, &["groups", group_id, "members"])?;
        let mut members = Vec::new();

        for _ in 0..MAX_MEMBER_PAGES {
            let page: ODataList<GraphMember> = self.client.get_graph_json(&url).await?;
            for member in page.value {
                match member.mail.filter(|m| !m.is_empty()) {
                    Some(mail) => members.push(DirectoryMember {
                        display_name: member.display_name.unwrap_or_else(|| mail.clone()),
                        id: mail,
                        photo: None,
                    }),
                    None => trace!(
                        { DIRECTORY_GROUP_ID } = group_id,
                        name = member.display_name.as_deref().unwrap_or(""),
                        "Skipping member without mail"
                    ),
                }
            }
            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }

        debug!(
            { DIRECTORY_GROUP_ID } = group_id,
            { RESULT_COUNT } = members.len(),
            "Expanded directory group"
        );
        Ok(members)
    }

    /// Avatar of a user.
    pub async fn get_user_image(&self, user_id: &str) -> Result<Option<String>> {
        self.get_image(user_id, PhotoKind::Users).await
    }

    /// Avatar of a directory group.
    pub async fn get_group_image(&self, group_id: &str) -> Result<Option<String>> {
        self.get_image(group_id, PhotoKind::Groups).await
    }

    /// Fetch a 48x48 avatar and return it as a `data:` URL.
    pub async fn get_image(&self, id: &str, kind: PhotoKind) -> Result<Option<String>> {
        let url = self.client.graph_segments_url(
            GRAPH_PHOTO_VERSION,
            &[kind.as_str(), id, "photos", PHOTO_SIZE, "$value"],
        )?;
        let body = self.client.get_graph_bytes(&url).await?;
        Ok(photo_data_url(&body.bytes, body.content_type.as_deref()))
    }

    /// Fetch every user's avatar concurrently, reporting each as it completes.
    /// Failures are swallowed.
    pub async fn backfill_photos<F>(&self, users: &[User], on_update: F) -> usize
    where
        F: FnMut(usize, String),
    {
        backfill_photos(self, users, on_update).await
    }
}

#[async_trait]
impl PeopleDirectory for MembershipResolver {
    async fn member_info(&self) -> Result<Vec<SiteMember>> {
        self.get_member_info().await
    }

    async fn resolve_group_members(&self, group_id: i64) -> Result<GroupResolution> {
        MembershipResolver::resolve_group_members(self, group_id).await
    }

    async fn image(&self, id: &str, kind: PhotoKind) -> Result<Option<String>> {
        self.get_image(id, kind).await
    }
}

/// Classify site group entries. Types other than user and directory group
/// are ignored.
fn classify(entries: Vec<SiteUserEntry>) -> Vec<MemberSource> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let id = login_suffix(&entry.login_name).to_string();
            match entry.principal_type {
                SITE_USER_PRINCIPAL => {
                    trace!({ USER_ID } = %id, "Direct user");
                    Some(MemberSource::Direct(DirectoryMember {
                        display_name: entry.title.unwrap_or_default(),
                        id,
                        photo: None,
                    }))
                }
                SITE_GROUP_PRINCIPAL => {
                    trace!({ DIRECTORY_GROUP_ID } = %id, "Directory group");
                    Some(MemberSource::DirectoryGroup(id))
                }
                other => {
                    trace!(principal_type = other, login = %entry.login_name, "Ignoring principal");
                    None
                }
            }
        })
        .collect()
}

/// Concatenate expansion results in source order, apply the failure policy,
/// and de-duplicate by id.
fn merge(
    sources: &[MemberSource],
    results: Vec<Result<Vec<DirectoryMember>>>,
    policy: ExpansionPolicy,
) -> Result<GroupResolution> {
    let mut members = Vec::new();
    let mut warnings = Vec::new();
    let mut first_error: Option<Error> = None;
    let mut succeeded = 0usize;

    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(batch) => {
                succeeded += 1;
                members.extend(batch);
            }
            Err(e) => {
                let group_id = match source {
                    MemberSource::DirectoryGroup(id) => id.clone(),
                    MemberSource::Direct(m) => m.id.clone(),
                };
                if policy == ExpansionPolicy::FailFast {
                    return Err(e);
                }
                warn!({ DIRECTORY_GROUP_ID } = %group_id, error = %e, "Directory group expansion failed");
                warnings.push(ExpansionWarning {
                    group_id,
                    message: e.to_string(),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    if succeeded == 0 {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    let users = dedupe_users(members.into_iter().map(User::from).collect());
    Ok(GroupResolution { users, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(principal_type: i32, login: &str, title: &str) -> SiteUserEntry {
        SiteUserEntry {
            id: 1,
            principal_type,
            login_name: login.to_string(),
            title: Some(title.to_string()),
        }
    }

    fn member(id: &str, name: &str) -> DirectoryMember {
        DirectoryMember {
            id: id.to_string(),
            display_name: name.to_string(),
            photo: None,
        }
    }

    #[test]
    fn test_classify_partitions_principals() {
        let sources = classify(vec![
            entry(1, "i:0#.f|membership|bob@x.com", "Bob"),
            entry(4, "c:0t.c|tenant|group-guid", "Engineering"),
            entry(8, "Team Owners", "Team Owners"),
        ]);
        assert_eq!(
            sources,
            vec![
                MemberSource::Direct(member("bob@x.com", "Bob")),
                MemberSource::DirectoryGroup("group-guid".to_string()),
            ]
        );
    }

    #[test]
    fn test_merge_dedupes_across_sources() {
        let sources = vec![
            MemberSource::Direct(member("a@x.com", "Alice")),
            MemberSource::DirectoryGroup("g1".to_string()),
        ];
        let results = vec![
            Ok(vec![member("a@x.com", "Alice")]),
            Ok(vec![member("b@x.com", "Bob"), member("a@x.com", "Alice A.")]),
        ];
        let resolution = merge(&sources, results, ExpansionPolicy::BestEffort).unwrap();
        let ids: Vec<&str> = resolution.users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["a@x.com", "b@x.com"]);
        assert_eq!(resolution.users[0].name, "Alice");
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_merge_best_effort_collects_warnings() {
        let sources = vec![
            MemberSource::DirectoryGroup("g1".to_string()),
            MemberSource::DirectoryGroup("g2".to_string()),
        ];
        let results = vec![
            Err(Error::remote("/v1.0/groups/g1/members", "returned 403 Forbidden")),
            Ok(vec![member("b@x.com", "Bob")]),
        ];
        let resolution = merge(&sources, results, ExpansionPolicy::BestEffort).unwrap();
        assert_eq!(resolution.users, vec![User::new("b@x.com", "Bob")]);
        assert_eq!(resolution.warnings.len(), 1);
        assert_eq!(resolution.warnings[0].group_id, "g1");
        assert!(resolution.warnings[0].message.contains("403"));
    }

    #[test]
    fn test_merge_best_effort_fails_when_all_sources_fail() {
        let sources = vec![MemberSource::DirectoryGroup("g1".to_string())];
        let results = vec![Err(Error::remote("/groups", "returned 500"))];
        let err = merge(&sources, results, ExpansionPolicy::BestEffort).unwrap_err();
        assert!(matches!(err, Error::RemoteFetch { .. }));
    }

    #[test]
    fn test_merge_fail_fast() {
        let sources = vec![
            MemberSource::Direct(member("a@x.com", "Alice")),
            MemberSource::DirectoryGroup("g1".to_string()),
        ];
        let results = vec![
            Ok(vec![member("a@x.com", "Alice")]),
            Err(Error::remote("/groups", "returned 404")),
        ];
        assert!(merge(&sources, results, ExpansionPolicy::FailFast).is_err());
    }

    #[test]
    fn test_merge_empty_group() {
        let resolution = merge(&[], Vec::new(), ExpansionPolicy::BestEffort).unwrap();
        assert!(resolution.users.is_empty());
        assert!(resolution.warnings.is_empty());
    }
}
