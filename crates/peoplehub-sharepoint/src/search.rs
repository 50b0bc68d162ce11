//! Recent-document search over the SharePoint Search REST API.
//!
//! The search API returns a table of rows, each a list of key/value cells.
//! [`SearchResultMapper`] requests a fixed projection and maps each row into a
//! [`DocumentResult`], deriving URLs and editor metadata from optional cells.
//!
//! Author filtering matches on the user's display name, so two people with
//! the same name are indistinguishable and a rename hides older documents.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info, trace, warn};

use peoplehub_core::defaults::{
    SEARCH_BASE_QUERY, SEARCH_CLIENT_TYPE, SEARCH_FRACTION_MARKER, SEARCH_SELECT_PROPERTIES,
};
use peoplehub_core::logging::{DURATION_MS, QUERY, RESULT_COUNT};
use peoplehub_core::{DocumentResult, DocumentSearch, Error, Result, SearchResultRow, User};

use crate::client::{endpoint_of, SharePointClient};
use crate::types::SearchResponse;

/// Editor identity parsed from an `EditorOwsUser` cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    pub login: String,
    pub name: String,
}

/// Runs document searches and maps the tabular results.
#[derive(Debug, Clone)]
pub struct SearchResultMapper {
    client: SharePointClient,
}

impl SearchResultMapper {
    pub fn new(client: SharePointClient) -> Self {
        Self { client }
    }

    /// Keyword query: `fileType:docx`, narrowed to the user's name when given.
    pub fn build_query(user: Option<&User>) -> String {
        match user {
            Some(u) => format!("{} and author:{}", SEARCH_BASE_QUERY, u.name),
            None => SEARCH_BASE_QUERY.to_string(),
        }
    }

    /// Full search request URL for `user`.
    pub fn search_url(&self, user: Option<&User>) -> String {
        let query = Self::build_query(user);
        self.client.site_url(&format!(
            "/_api/search/query?querytext='{}'&selectproperties='{}'&clienttype='{}'",
            encode_query_value(&query),
            SEARCH_SELECT_PROPERTIES,
            SEARCH_CLIENT_TYPE
        ))
    }

    /// Search documents and map every row, keeping API order.
    pub async fn search(&self, user: Option<&User>) -> Result<Vec<DocumentResult>> {
        let start = Instant::now();
        let url = self.search_url(user);
        debug!({ QUERY } = %Self::build_query(user), "Running document search");

        let response: SearchResponse = self
            .client
            .get_sharepoint_json(&url, &[("odata-version", "3.0")])
            .await?;
        let rows = response.into_rows().ok_or_else(|| {
            Error::malformed(
                endpoint_of(&url),
                "missing PrimaryQueryResult.RelevantResults.Table.Rows",
            )
        })?;

        let today = Utc::now().date_naive();
        let results: Vec<DocumentResult> = rows.iter().map(|row| self.map_row(row, today)).collect();

        info!(
            { RESULT_COUNT } = results.len(),
            { DURATION_MS } = start.elapsed().as_millis() as u64,
            "Document search complete"
        );
        Ok(results)
    }

    /// Map one row. `today` is used when the modified date is missing.
    pub fn map_row(&self, row: &SearchResultRow, today: NaiveDate) -> DocumentResult {
        let site = self.client.config().site_base();
        let modified = row
            .get("LastModifiedTime")
            .and_then(|raw| {
                let parsed = parse_modified_date(raw);
                if parsed.is_none() {
                    warn!(value = raw, "Unparseable LastModifiedTime, using today");
                }
                parsed
            })
            .unwrap_or(today);
        let editor = row.get("EditorOwsUser").and_then(parse_editor);

        trace!(title = row.get_or_empty("Title"), "Mapping search row");
        DocumentResult {
            id: row.get_or_empty("DocId").to_string(),
            url: result_url(row).to_string(),
            title: row.get_or_empty("Title").to_string(),
            preview_image_url: preview_image_url(row, site),
            last_modified_time: format_date(modified),
            last_modified_by_name: editor.as_ref().map(|e| e.name.clone()).unwrap_or_default(),
            last_modified_by_photo_url: editor
                .as_ref()
                .map(|e| user_photo_url(site, &e.login))
                .unwrap_or_default(),
            extension: row.get_or_empty("FileType").to_string(),
        }
    }
}

#[async_trait]
impl DocumentSearch for SearchResultMapper {
    async fn search(&self, user: Option<&User>) -> Result<Vec<DocumentResult>> {
        SearchResultMapper::search(self, user).await
    }
}

/// `ServerRedirectedURL` when present, otherwise `OriginalPath`.
pub fn result_url(row: &SearchResultRow) -> &str {
    row.get("ServerRedirectedURL")
        .or_else(|| row.get("OriginalPath"))
        .unwrap_or("")
}

/// Document preview URL, or `""` unless uniqueID, siteID, webID and DocId are
/// all present.
pub fn preview_image_url(row: &SearchResultRow, site_url: &str) -> String {
    match (
        row.get("uniqueID"),
        row.get("siteID"),
        row.get("webID"),
        row.get("DocId"),
    ) {
        (Some(unique_id), Some(site_id), Some(web_id), Some(doc_id)) => format!(
            "{}/_layouts/15/getpreview.ashx?guidFile={}&guidSite={}&guidWeb={}&docid={}&metadatatoken=300x424x2&ClientType=CodenameOsloWeb&size=small",
            site_url, unique_id, site_id, web_id, doc_id
        ),
        _ => String::new(),
    }
}

/// Small profile photo URL served by the site for `login`.
pub fn user_photo_url(site_url: &str, login: &str) -> String {
    format!(
        "{}/_layouts/15/userphoto.aspx?size=S&accountname={}",
        site_url, login
    )
}

/// Parse an `EditorOwsUser` cell.
///
/// The usual form is `login | Display Name | <claims>`; a bare claims string
/// `i:0#.f|membership|login|Display Name` is also accepted, in which case the
/// last two segments are the login and the name. Fewer than two segments
/// yields `None`.
pub fn parse_editor(raw: &str) -> Option<Editor> {
    let segments: Vec<&str> = raw.split('|').map(str::trim).collect();
    if segments.len() < 2 {
        return None;
    }

    let (login, name) = if segments[0].starts_with("i:0") && segments.len() >= 4 {
        (segments[segments.len() - 2], segments[segments.len() - 1])
    } else {
        (segments[0], segments[1])
    };

    Some(Editor {
        login: login.to_string(),
        name: name.to_string(),
    })
}

/// Parse a `LastModifiedTime` value such as `2024-03-05T14:20:11.0000000Z`.
pub fn parse_modified_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.trim().replace(SEARCH_FRACTION_MARKER, "");

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(&cleaned, "%Y-%m-%d").ok()
}

/// `M/D/YYYY` without zero padding.
pub fn format_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

/// Escape a value placed inside `querytext='...'`.
///
/// Single quotes are doubled for KQL; characters that would end or split the
/// query string are percent-encoded.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '#' => out.push_str("%23"),
            '+' => out.push_str("%2B"),
            _ => out.push(c),
        }
    }
    out
}
