//! Generation request arbitration — the single logical operation behind
//! every AI call: evaluate entitlement, dispatch to the selected backend,
//! reconcile the ledger.
//!
//! Ordering matters and mirrors the observable contract:
//! 1. Entitlement is evaluated against the computed cost before the selector
//!    is validated, so an underfunded request is denied with the structured
//!    insufficient-balance shape even when the selector is bogus.
//! 2. Selector resolution fails fast before any network activity.
//! 3. The backend call is the sole suspension point; no retries, no internal
//!    timeout beyond the HTTP client's.
//! 4. Only a successful call reaches the ledger.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::cost::{generation_cost, OPTIMIZE_COST};
use crate::entitlement::{evaluate, Entitlement};
use crate::error::Error;
use crate::ledger::LedgerReconciler;
use crate::providers::ProviderRegistry;
use crate::storage::Storage;
use crate::types::{Account, GenerationRequest, UsageRecord};
use crate::Result;

/// Balance state returned to the caller after a settled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingBalance {
    /// Trial or subscription entitlement — balance untouched.
    Unlimited { coins: u64 },
    Coins(u64),
}

impl RemainingBalance {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, RemainingBalance::Unlimited { .. })
    }

    pub fn coins(&self) -> u64 {
        match self {
            RemainingBalance::Unlimited { coins } => *coins,
            RemainingBalance::Coins(coins) => *coins,
        }
    }
}

/// What a settled generation hands back to the request handler.
#[derive(Debug, Clone)]
pub struct GenerationReceipt {
    pub code: String,
    pub coins_cost: u64,
    pub remaining: RemainingBalance,
}

pub struct GenerationArbiter {
    storage: Arc<dyn Storage>,
    registry: ProviderRegistry,
    ledger: LedgerReconciler,
}

impl GenerationArbiter {
    pub fn new(storage: Arc<dyn Storage>, registry: ProviderRegistry) -> Self {
        let ledger = LedgerReconciler::new(storage.clone());
        Self {
            storage,
            registry,
            ledger,
        }
    }

    fn load_account(&self, account_id: &str) -> Result<Account> {
        self.storage
            .account(account_id)?
            .ok_or_else(|| Error::AccountNotFound(account_id.to_string()))
    }

    fn authorize(&self, account: &Account, cost: u64) -> Result<Entitlement> {
        match evaluate(account, cost, Utc::now()) {
            Entitlement::Denied { required, current } => {
                Err(Error::InsufficientBalance { required, current })
            }
            authorized => Ok(authorized),
        }
    }

    /// Run a full generation: entitlement → dispatch → reconcile.
    #[instrument(skip(self, request), fields(provider = %request.provider))]
    pub async fn generate(
        &self,
        account_id: &str,
        request: GenerationRequest,
    ) -> Result<GenerationReceipt> {
        let account = self.load_account(account_id)?;
        let cost = generation_cost(&request.provider, request.prompt.chars().count());
        let entitlement = self.authorize(&account, cost)?;
        let provider = self.registry.resolve(&request.provider)?;

        debug!(cost, unlimited = entitlement.is_unlimited(), "dispatching generation");
        let code = provider
            .generate(&request.prompt, request.kind, request.platform)
            .await?;

        let record = UsageRecord::new(
            &account.id,
            request.project_id.clone(),
            &request.provider,
            &request.prompt,
            &code,
            cost,
        );
        let remaining = self.ledger.settle(&account, entitlement, cost, Some(record))?;

        Ok(GenerationReceipt {
            code,
            coins_cost: cost,
            remaining,
        })
    }

    /// Explain existing code. Free of charge; no ledger involvement.
    pub async fn explain(&self, provider_tag: &str, code: &str) -> Result<String> {
        let provider = self.registry.resolve(provider_tag)?;
        provider.explain(code).await
    }

    /// Optimize existing code at a flat premium cost. Deducts like a
    /// generation but appends no usage record.
    #[instrument(skip(self, code), fields(provider = %provider_tag))]
    pub async fn optimize(
        &self,
        account_id: &str,
        provider_tag: &str,
        code: &str,
    ) -> Result<GenerationReceipt> {
        let account = self.load_account(account_id)?;
        let entitlement = self.authorize(&account, OPTIMIZE_COST)?;
        let provider = self.registry.resolve(provider_tag)?;

        let optimized = provider.optimize(code).await?;
        let remaining = self
            .ledger
            .settle(&account, entitlement, OPTIMIZE_COST, None)?;

        Ok(GenerationReceipt {
            code: optimized,
            coins_cost: OPTIMIZE_COST,
            remaining,
        })
    }
}
