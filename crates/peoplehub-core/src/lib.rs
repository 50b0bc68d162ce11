//! # peoplehub-core
//!
//! Core types, traits, and abstractions for peoplehub.
//!
//! This crate provides the domain models shared by the SharePoint clients and
//! the part controllers, the error type, the trait seams that let the part
//! controllers run against any backend, and the dynamic-data bus the two parts
//! use to talk to each other.

pub mod bus;
pub mod defaults;
pub mod error;
pub mod generation;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use bus::{DynamicDataBus, PropertyDefinition, PropertyKey, SourceInfo, Subscription};
pub use error::{Error, Result};
pub use generation::{Generation, GenerationCounter};
pub use models::*;
pub use traits::*;
