//! # peoplehub-sharepoint
//!
//! SharePoint REST and Microsoft Graph backends for peoplehub.
//!
//! - [`MembershipResolver`] lists a site's role-assignment groups, flattens a
//!   site group (expanding directory groups through Graph) and fetches avatars.
//! - [`SearchResultMapper`] runs the recent-documents query against the
//!   SharePoint Search API and maps the tabular rows into document results.
//!
//! Both share one [`SharePointClient`], configured through [`ClientConfig`].

pub mod avatar;
pub mod client;
pub mod config;
pub mod membership;
pub mod search;
pub mod types;

pub use avatar::photo_data_url;
pub use client::{BinaryBody, SharePointClient};
pub use config::ClientConfig;
pub use membership::MembershipResolver;
pub use search::{Editor, SearchResultMapper};
