//! Domain models shared by the SharePoint clients and the part controllers.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// =============================================================================
// SITE MEMBERSHIP
// =============================================================================

/// Kind of a site role-assignment member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Group,
    User,
}

impl MemberType {
    /// Map a role-assignment PrincipalType code. Only 8 is a group.
    pub fn from_principal_type(code: i32) -> Self {
        if code == crate::defaults::ROLE_MEMBER_GROUP {
            MemberType::Group
        } else {
            MemberType::User
        }
    }
}

/// A member of the site's role assignments (group picker entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMember {
    pub principal_id: i64,
    pub id: i64,
    pub title: String,
    pub member_type: MemberType,
}

/// Option shown in a group picker, keyed by the member id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOption {
    pub key: i64,
    pub text: String,
}

impl From<&SiteMember> for GroupOption {
    fn from(m: &SiteMember) -> Self {
        Self {
            key: m.id,
            text: m.title.clone(),
        }
    }
}

/// A user or group resolved from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMember {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// User view model consumed by the People view and published on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            photo: None,
        }
    }
}

impl From<DirectoryMember> for User {
    fn from(m: DirectoryMember) -> Self {
        Self {
            id: m.id,
            name: m.display_name,
            photo: m.photo,
        }
    }
}

/// Return the part of a claims login after the last `|`.
///
/// `i:0#.f|membership|bob@x.com` becomes `bob@x.com`; a login without a
/// delimiter is returned whole.
pub fn login_suffix(login: &str) -> &str {
    match login.rfind('|') {
        Some(idx) => &login[idx + 1..],
        None => login,
    }
}

/// Drop users whose id was already seen, keeping first occurrences in order.
pub fn dedupe_users(users: Vec<User>) -> Vec<User> {
    let mut seen = HashSet::with_capacity(users.len());
    users
        .into_iter()
        .filter(|u| seen.insert(u.id.clone()))
        .collect()
}

/// How directory-group expansion failures affect a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionPolicy {
    /// Failed expansions become warnings; fail only when every source failed.
    #[default]
    BestEffort,
    /// Any failed expansion fails the whole resolution.
    FailFast,
}

impl FromStr for ExpansionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(ExpansionPolicy::BestEffort),
            "fail_fast" => Ok(ExpansionPolicy::FailFast),
            other => Err(Error::Config(format!(
                "unknown expansion policy '{}', expected best_effort or fail_fast",
                other
            ))),
        }
    }
}

/// A directory group that could not be expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionWarning {
    pub group_id: String,
    pub message: String,
}

/// Users of a site group plus the expansions that failed along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResolution {
    pub users: Vec<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExpansionWarning>,
}

/// Graph photo endpoint segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoKind {
    Users,
    Groups,
}

impl PhotoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoKind::Users => "users",
            PhotoKind::Groups => "groups",
        }
    }
}

impl fmt::Display for PhotoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// One key/value cell of a tabular search row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellValue {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
}

impl CellValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// A search result row: an ordered list of sparse cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultRow {
    #[serde(rename = "Cells", default)]
    pub cells: Vec<CellValue>,
}

impl SearchResultRow {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Value of the first cell whose key matches exactly.
    ///
    /// Null and empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.key == key)
            .and_then(|c| c.value.as_deref())
            .filter(|v| !v.is_empty())
    }

    /// Like [`get`](Self::get) but yields `""` for absent cells.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }
}

/// Document view model for the Recent Documents view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub id: String,
    pub url: String,
    pub title: String,
    pub preview_image_url: String,
    pub last_modified_time: String,
    pub last_modified_by_name: String,
    pub last_modified_by_photo_url: String,
    pub extension: String,
}
