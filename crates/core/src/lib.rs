//! RelayKit Core Types
//!
//! This crate defines the fundamental data structures shared by the
//! RelayKit deployment tools: the topology mode, the resolved deployment
//! parameters, explicit deployment file locations, and safe whole-file
//! replacement.

mod files;
mod paths;
mod types;

pub use files::*;
pub use paths::*;
pub use types::*;
