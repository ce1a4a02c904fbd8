//! Entitlement evaluation — the sole gate in front of the coin ledger.
//!
//! [`evaluate`] is a pure function over an account snapshot, a required cost,
//! and the current time. It never touches storage; the ledger relies on it
//! (plus the guarded deduction) to keep balances non-negative.

use chrono::{DateTime, Utc};

use crate::types::Account;

/// Authorization decision for a costed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entitlement {
    /// The operation may proceed. `unlimited` means no coins are deducted
    /// (active trial window or subscription).
    Authorized { unlimited: bool },
    /// The account cannot cover the cost.
    Denied { required: u64, current: u64 },
}

impl Entitlement {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Entitlement::Authorized { unlimited: true })
    }
}

/// Decide whether `account` may perform an operation costing `required` coins
/// at time `now`.
///
/// Precedence: an active trial window wins over everything, then a non-empty
/// subscription id, then the coin balance. The trial comparison is strict —
/// a trial ending exactly at `now` has expired.
pub fn evaluate(account: &Account, required: u64, now: DateTime<Utc>) -> Entitlement {
    if let Some(trial_ends_at) = account.trial_ends_at {
        if trial_ends_at > now {
            return Entitlement::Authorized { unlimited: true };
        }
    }

    if let Some(subscription_id) = &account.subscription_id {
        if !subscription_id.is_empty() {
            return Entitlement::Authorized { unlimited: true };
        }
    }

    if account.coins >= required {
        Entitlement::Authorized { unlimited: false }
    } else {
        Entitlement::Denied {
            required,
            current: account.coins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account(coins: u64) -> Account {
        Account {
            id: "acct-1".into(),
            username: "steve".into(),
            email: "steve@example.com".into(),
            coins,
            trial_ends_at: None,
            subscription_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_trial_in_future_is_unlimited_regardless_of_balance() {
        let now = Utc::now();
        let mut acct = account(0);
        acct.trial_ends_at = Some(now + Duration::days(1));
        assert_eq!(
            evaluate(&acct, 500, now),
            Entitlement::Authorized { unlimited: true }
        );
    }

    #[test]
    fn test_trial_ending_exactly_now_has_expired() {
        let now = Utc::now();
        let mut acct = account(0);
        acct.trial_ends_at = Some(now);
        assert_eq!(
            evaluate(&acct, 10, now),
            Entitlement::Denied {
                required: 10,
                current: 0
            }
        );
    }

    #[test]
    fn test_subscription_is_unlimited() {
        let mut acct = account(0);
        acct.subscription_id = Some("sub_123".into());
        assert_eq!(
            evaluate(&acct, 9999, Utc::now()),
            Entitlement::Authorized { unlimited: true }
        );
    }

    #[test]
    fn test_empty_subscription_id_does_not_entitle() {
        let mut acct = account(5);
        acct.subscription_id = Some(String::new());
        assert_eq!(
            evaluate(&acct, 10, Utc::now()),
            Entitlement::Denied {
                required: 10,
                current: 5
            }
        );
    }

    #[test]
    fn test_sufficient_balance_authorizes_without_unlimited() {
        let acct = account(120);
        assert_eq!(
            evaluate(&acct, 120, Utc::now()),
            Entitlement::Authorized { unlimited: false }
        );
    }

    #[test]
    fn test_denial_carries_required_and_current() {
        let acct = account(100);
        assert_eq!(
            evaluate(&acct, 120, Utc::now()),
            Entitlement::Denied {
                required: 120,
                current: 100
            }
        );
    }

    #[test]
    fn test_expired_trial_falls_through_to_balance() {
        let now = Utc::now();
        let mut acct = account(50);
        acct.trial_ends_at = Some(now - Duration::days(1));
        assert_eq!(
            evaluate(&acct, 30, now),
            Entitlement::Authorized { unlimited: false }
        );
    }
}
