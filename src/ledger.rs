//! Ledger reconciliation — the only place coins leave an account.
//!
//! Called exclusively after a successful generation. A failed generation
//! never reaches this module, so a provider error can never mutate the
//! ledger. Persistence failures here are surfaced as
//! [`Error::LedgerWriteFailed`], distinct from a generation failure, because
//! at that point generated text already exists and the caller must decide
//! what to do with it — there is no compensating transaction.

use std::sync::Arc;
use tracing::{info, warn};

use crate::arbiter::RemainingBalance;
use crate::entitlement::Entitlement;
use crate::error::Error;
use crate::storage::Storage;
use crate::types::{Account, UsageRecord};
use crate::Result;

pub struct LedgerReconciler {
    storage: Arc<dyn Storage>,
}

impl LedgerReconciler {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Reconcile a successful generation against the coin ledger.
    ///
    /// Deducts `cost` unless the authorization was unlimited, then appends
    /// the usage record if one is supplied. The record always carries the
    /// computed cost figure, even when nothing was deducted.
    pub fn settle(
        &self,
        account: &Account,
        entitlement: Entitlement,
        cost: u64,
        record: Option<UsageRecord>,
    ) -> Result<RemainingBalance> {
        let remaining = match entitlement {
            Entitlement::Authorized { unlimited: true } => {
                RemainingBalance::Unlimited {
                    coins: account.coins,
                }
            }
            Entitlement::Authorized { unlimited: false } => {
                let new_balance = self
                    .storage
                    .deduct_coins(&account.id, cost)
                    .map_err(|e| {
                        warn!(account = %account.id, cost, error = %e, "coin deduction failed");
                        Error::LedgerWriteFailed(e.to_string())
                    })?;
                RemainingBalance::Coins(new_balance)
            }
            Entitlement::Denied { required, current } => {
                // The arbiter gates on entitlement before dispatching; a
                // denied settle means that gate was bypassed.
                return Err(Error::InsufficientBalance { required, current });
            }
        };

        if let Some(record) = record {
            self.storage
                .append_usage(&record)
                .map_err(|e| Error::LedgerWriteFailed(e.to_string()))?;
        }

        info!(account = %account.id, cost, ?remaining, "generation settled");
        Ok(remaining)
    }
}
