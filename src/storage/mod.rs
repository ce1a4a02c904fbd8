//! Persistence layer. The [`Storage`] trait is the seam between the
//! arbitration core and the relational store; [`SqliteStorage`] is the
//! shipped implementation.
//!
//! Balance mutations go through `credit_coins`/`deduct_coins` only. Both are
//! single guarded UPDATE statements, so two concurrent requests can never
//! read the same balance and both spend it — the losing request sees
//! [`StorageError::BalanceConflict`].

pub mod sqlite;

use thiserror::Error;

use crate::types::{Account, AdViewRecord, NewProject, Project, ProjectUpdate, Template, UsageRecord};

pub use sqlite::SqliteStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The guarded deduction matched no row: the balance no longer covers
    /// the amount (e.g. a concurrent spend got there first).
    #[error("balance update affected no rows")]
    BalanceConflict,

    #[error("account row missing: {0}")]
    AccountMissing(String),

    #[error("storage lock poisoned")]
    LockPoisoned,
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Relational store contract used by the core.
pub trait Storage: Send + Sync {
    // Accounts
    fn account(&self, id: &str) -> StorageResult<Option<Account>>;
    fn create_account(&self, account: &Account) -> StorageResult<()>;
    /// Add coins; returns the new balance.
    fn credit_coins(&self, account_id: &str, amount: u64) -> StorageResult<u64>;
    /// Remove coins if and only if the balance covers `amount`; returns the
    /// new balance.
    fn deduct_coins(&self, account_id: &str, amount: u64) -> StorageResult<u64>;
    fn set_subscription(&self, account_id: &str, subscription_id: &str) -> StorageResult<()>;

    // Audit trails (append-only)
    fn append_usage(&self, record: &UsageRecord) -> StorageResult<()>;
    fn usage_for_account(&self, account_id: &str) -> StorageResult<Vec<UsageRecord>>;
    fn append_ad_view(&self, record: &AdViewRecord) -> StorageResult<()>;
    fn ad_views_for_account(&self, account_id: &str) -> StorageResult<Vec<AdViewRecord>>;

    // Projects
    fn create_project(&self, account_id: &str, new: NewProject) -> StorageResult<Project>;
    fn project(&self, id: &str) -> StorageResult<Option<Project>>;
    fn projects_for_account(&self, account_id: &str) -> StorageResult<Vec<Project>>;
    fn update_project(&self, id: &str, update: &ProjectUpdate) -> StorageResult<Option<Project>>;
    fn delete_project(&self, id: &str) -> StorageResult<()>;

    // Templates (read-only catalog; insert exists for seeding)
    fn insert_template(&self, template: &Template) -> StorageResult<()>;
    fn templates(&self) -> StorageResult<Vec<Template>>;
    fn template(&self, id: &str) -> StorageResult<Option<Template>>;
    fn templates_by_category(&self, category: &str) -> StorageResult<Vec<Template>>;
}
