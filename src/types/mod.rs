//! Core domain types shared across the arbitration workflow, storage layer,
//! and HTTP surface.

pub mod account;
pub mod generation;
pub mod project;

pub use account::Account;
pub use generation::{AdViewRecord, GenerationRequest, Platform, ProjectKind, UsageRecord};
pub use project::{NewProject, Project, ProjectUpdate, Template};
