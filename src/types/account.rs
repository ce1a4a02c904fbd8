use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coins granted to every new account.
pub const STARTING_COINS: u64 = 1250;

/// Length of the unlimited-use trial window starting at account creation.
pub const TRIAL_DAYS: i64 = 7;

/// A user account as seen by the arbitration core.
///
/// The coin balance is a non-negative integer mutated only through the
/// storage layer's guarded updates; trial and subscription fields are owned
/// by external auth/payment collaborators and read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    pub coins: u64,
    /// End of the unlimited trial window, if one was granted.
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Payment-provider subscription id; presence implies unlimited use.
    pub subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a fresh account with the starting balance and a trial window
    /// beginning now.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            coins: STARTING_COINS,
            trial_ends_at: Some(now + Duration::days(TRIAL_DAYS)),
            subscription_id: None,
            created_at: now,
        }
    }
}
