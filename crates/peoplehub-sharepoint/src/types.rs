//! SharePoint REST and Graph response types.

use serde::Deserialize;

use peoplehub_core::SearchResultRow;

// =============================================================================
// ODATA ENVELOPES
// =============================================================================

/// `{"value": [...]}` list envelope returned with `odata=nometadata`.
#[derive(Debug, Deserialize)]
pub struct ODataList<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

// =============================================================================
// SITE MEMBERSHIP
// =============================================================================

/// Entry of `/_api/Web/roleassignments?$expand=member`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleAssignment {
    pub principal_id: i64,
    pub member: RoleMember,
}

/// Expanded member of a role assignment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleMember {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub principal_type: i32,
}

/// Entry of `/_api/Web/sitegroups({id})/Users`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteUserEntry {
    pub id: i64,
    pub principal_type: i32,
    #[serde(default)]
    pub login_name: String,
    #[serde(default)]
    pub title: Option<String>,
}

// =============================================================================
// GRAPH
// =============================================================================

/// Entry of `/groups/{id}/members`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMember {
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

// =============================================================================
// SEARCH
// =============================================================================

/// Top-level search response (`odata-version: 3.0`, `nometadata`).
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "PrimaryQueryResult", default)]
    pub primary_query_result: Option<PrimaryQueryResult>,
}

#[derive(Debug, Deserialize)]
pub struct PrimaryQueryResult {
    #[serde(rename = "RelevantResults", default)]
    pub relevant_results: Option<RelevantResults>,
}

#[derive(Debug, Deserialize)]
pub struct RelevantResults {
    #[serde(rename = "Table", default)]
    pub table: Option<ResultTable>,
    #[serde(rename = "TotalRows", default)]
    pub total_rows: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ResultTable {
    #[serde(rename = "Rows", default)]
    pub rows: Option<Vec<SearchResultRow>>,
}

impl SearchResponse {
    /// Rows of the relevant-results table, or `None` when any level is missing.
    pub fn into_rows(self) -> Option<Vec<SearchResultRow>> {
        self.primary_query_result?.relevant_results?.table?.rows
    }
}
