//! Structured logging field name constants for peoplehub.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log tooling can query by the same names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation failed and nothing could be shown |
//! | WARN  | Degraded result, e.g. a directory group could not be expanded |
//! | INFO  | Operation completions, startup |
//! | DEBUG | Decision points, stale completions discarded |
//! | TRACE | Per-row and per-member iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID for one part operation.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "sharepoint", "parts"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "membership", "people_part", "documents_part"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "resolve_group_members", "load", "refresh"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// SharePoint site group id.
pub const GROUP_ID: &str = "group_id";

/// Directory (Graph) group id.
pub const DIRECTORY_GROUP_ID: &str = "directory_group_id";

/// User id (login suffix or mail).
pub const USER_ID: &str = "user_id";

/// Search query text.
pub const QUERY: &str = "query";

/// Request generation of a part operation.
pub const GENERATION: &str = "generation";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned.
pub const RESULT_COUNT: &str = "result_count";

/// Number of warnings collected.
pub const WARNING_COUNT: &str = "warning_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// HTTP status code of a remote response.
pub const STATUS: &str = "status";
