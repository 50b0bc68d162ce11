//! Per-instance part settings.
//!
//! Settings are plain values handed to each call; a part never mutates them.
//! Changing configuration means building new settings and calling `load` or
//! `connect` again.

use serde::{Deserialize, Serialize};

/// Settings of the People part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeopleSettings {
    /// Site group whose users are listed. Nothing is shown until one is picked.
    #[serde(default)]
    pub selected_group: Option<i64>,
}

impl PeopleSettings {
    pub fn for_group(group_id: i64) -> Self {
        Self {
            selected_group: Some(group_id),
        }
    }
}

/// Settings of the Recent Documents part: which published property drives it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentsSettings {
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub property_id: String,
    #[serde(default)]
    pub title: String,
}

impl DocumentsSettings {
    pub fn new(source_id: impl Into<String>, property_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            property_id: property_id.into(),
            title: String::new(),
        }
    }

    /// True until both the source and the property are chosen.
    pub fn needs_configuration(&self) -> bool {
        self.source_id.trim().is_empty() || self.property_id.trim().is_empty()
    }
}
