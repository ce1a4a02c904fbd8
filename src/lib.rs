//! # modsmith
//!
//! Service core for an AI-assisted Minecraft mod/plugin generator. Users spend
//! a virtual-coin balance (funded by ad views or a subscription) to route
//! generation prompts to interchangeable LLM backends; every completed
//! generation is reconciled against the coin ledger and recorded immutably.
//!
//! ## Request arbitration
//!
//! The heart of the crate is the [`arbiter::GenerationArbiter`], which runs a
//! single logical operation per inbound call:
//!
//! 1. **Entitlement** — [`entitlement::evaluate`] decides from the account's
//!    trial window, subscription, and coin balance whether the request may
//!    proceed at the computed cost.
//! 2. **Cost** — [`cost::generation_cost`] maps (provider, prompt length) to
//!    an integer coin cost from a fixed base table plus a length surcharge.
//! 3. **Dispatch** — the [`providers::ProviderRegistry`] resolves the selector
//!    tag to a [`providers::CodeProvider`] and awaits the backend call, the
//!    sole suspension point in the flow.
//! 4. **Reconcile** — the [`ledger::LedgerReconciler`] deducts coins through a
//!    guarded single-statement update (balance can never go negative, even
//!    under concurrent requests) and appends a usage record.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`arbiter`] | Generation request arbitration workflow |
//! | [`entitlement`] | Trial/subscription/balance authorization decisions |
//! | [`cost`] | Coin cost tables and surcharge computation |
//! | [`providers`] | Provider trait, registry, and backend implementations |
//! | [`ledger`] | Coin deduction and usage-record reconciliation |
//! | [`rewards`] | Ad-view coin rewards |
//! | [`storage`] | SQLite-backed persistence for accounts, projects, templates |
//! | [`server`] | Axum HTTP surface |
//! | [`types`] | Core domain types |

pub mod arbiter;
pub mod config;
pub mod cost;
pub mod entitlement;
pub mod ledger;
pub mod providers;
pub mod rewards;
pub mod server;
pub mod storage;
pub mod types;

// Re-export main types for convenience
pub use arbiter::{GenerationArbiter, GenerationReceipt, RemainingBalance};
pub use config::Config;
pub use entitlement::Entitlement;
pub use providers::{CodeProvider, ProviderRegistry};
pub use types::{Account, GenerationRequest, Platform, ProjectKind, UsageRecord};

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the crate
pub mod error;
pub use error::Error;
