//! Centralized default constants for peoplehub.
//!
//! Remote-API constants (paths, fixed projections, URL templates) and the
//! environment variable names read by the client configuration.

// =============================================================================
// PRINCIPAL TYPE CODES
// =============================================================================

/// Role-assignment member PrincipalType for a SharePoint group.
pub const ROLE_MEMBER_GROUP: i32 = 8;

/// Site-group user PrincipalType for an individual user.
pub const SITE_USER_PRINCIPAL: i32 = 1;

/// Site-group user PrincipalType for a directory (security) group.
pub const SITE_GROUP_PRINCIPAL: i32 = 4;

// =============================================================================
// REMOTE ENDPOINTS
// =============================================================================

/// Default Microsoft Graph host.
pub const GRAPH_URL: &str = "https://graph.microsoft.com";

/// Graph API version for directory group expansion.
pub const GRAPH_VERSION: &str = "v1.0";

/// Graph API version for profile photos.
pub const GRAPH_PHOTO_VERSION: &str = "beta";

/// Avatar size segment requested from Graph.
pub const PHOTO_SIZE: &str = "48x48";

/// MIME type assumed for avatars when neither bytes nor headers tell.
pub const PHOTO_FALLBACK_MIME: &str = "image/jpeg";

/// Default request timeout in seconds.
pub const TIMEOUT_SECS: u64 = 30;

// =============================================================================
// SEARCH
// =============================================================================

/// Base keyword filter for the recent-documents query.
pub const SEARCH_BASE_QUERY: &str = "fileType:docx";

/// Fixed property projection requested from the search API.
pub const SEARCH_SELECT_PROPERTIES: &str =
    "Title,Author,FileExtension,DocId,FileType,EditorOwsUser,LastModifiedTime,uniqueID,webID,siteID";

/// Client type sent with search requests.
pub const SEARCH_CLIENT_TYPE: &str = "ContentSearchRegular";

/// Trailing fractional-seconds marker stripped from LastModifiedTime.
pub const SEARCH_FRACTION_MARKER: &str = ".0000000";

// =============================================================================
// DYNAMIC DATA
// =============================================================================

/// Property id under which the People part publishes the selected user.
pub const USER_PROPERTY_ID: &str = "user";

/// Property title for [`USER_PROPERTY_ID`].
pub const USER_PROPERTY_TITLE: &str = "User";

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

pub const ENV_SITE_URL: &str = "PEOPLEHUB_SITE_URL";
pub const ENV_GRAPH_URL: &str = "PEOPLEHUB_GRAPH_URL";
pub const ENV_SHAREPOINT_TOKEN: &str = "PEOPLEHUB_SHAREPOINT_TOKEN";
pub const ENV_GRAPH_TOKEN: &str = "PEOPLEHUB_GRAPH_TOKEN";
pub const ENV_TIMEOUT: &str = "PEOPLEHUB_TIMEOUT";
pub const ENV_EXPANSION_POLICY: &str = "PEOPLEHUB_EXPANSION_POLICY";
