//! End-to-end arbitration flows over in-memory SQLite with a scripted
//! backend: entitlement gating, exact-once deduction, audit records, and the
//! failure paths that must leave the ledger untouched.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use modsmith::arbiter::{GenerationArbiter, RemainingBalance};
use modsmith::error::Error;
use modsmith::providers::{CodeProvider, ProviderRegistry};
use modsmith::storage::{SqliteStorage, Storage};
use modsmith::types::{Account, GenerationRequest, Platform, ProjectKind};

#[derive(Debug)]
struct ScriptedProvider {
    id: &'static str,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn ok(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        self.id
    }

    async fn generate(
        &self,
        _prompt: &str,
        _kind: ProjectKind,
        _platform: Platform,
    ) -> modsmith::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::provider_failure(self.id, "upstream exploded"))
        } else {
            Ok("public class Generated {}".to_string())
        }
    }

    async fn explain(&self, _code: &str) -> modsmith::Result<String> {
        Ok("it does things".to_string())
    }

    async fn optimize(&self, _code: &str) -> modsmith::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::provider_failure(self.id, "upstream exploded"))
        } else {
            Ok("public class Optimized {}".to_string())
        }
    }
}

struct Harness {
    storage: Arc<SqliteStorage>,
    arbiter: GenerationArbiter,
    provider: Arc<ScriptedProvider>,
    account: Account,
}

fn harness(coins: u64, provider: Arc<ScriptedProvider>) -> Harness {
    let storage = Arc::new(SqliteStorage::in_memory().unwrap());
    let mut account = Account::new("steve", "steve@example.com");
    account.coins = coins;
    account.trial_ends_at = None;
    storage.create_account(&account).unwrap();

    let mut registry = ProviderRegistry::new();
    registry.register(provider.clone());
    let arbiter = GenerationArbiter::new(storage.clone(), registry);

    Harness {
        storage,
        arbiter,
        provider,
        account,
    }
}

fn request(provider: &str, prompt: &str) -> GenerationRequest {
    GenerationRequest {
        prompt: prompt.to_string(),
        provider: provider.to_string(),
        kind: ProjectKind::Plugin,
        platform: Platform::Spigot,
        project_id: None,
    }
}

#[tokio::test]
async fn successful_generation_deducts_once_and_records_usage() {
    let h = harness(100, ScriptedProvider::ok("claude"));

    // 12-char prompt: base 20 + minimum surcharge 5.
    let receipt = h
        .arbiter
        .generate(&h.account.id, request("claude", "make a sword"))
        .await
        .unwrap();

    assert_eq!(receipt.coins_cost, 25);
    assert_eq!(receipt.remaining, RemainingBalance::Coins(75));
    assert_eq!(h.provider.call_count(), 1);

    assert_eq!(h.storage.account(&h.account.id).unwrap().unwrap().coins, 75);
    let records = h.storage.usage_for_account(&h.account.id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].coins_cost, 25);
    assert_eq!(records[0].provider, "claude");
    assert_eq!(records[0].response, "public class Generated {}");
}

#[tokio::test]
async fn provider_failure_leaves_ledger_untouched() {
    let h = harness(100, ScriptedProvider::failing("claude"));

    let result = h
        .arbiter
        .generate(&h.account.id, request("claude", "make a sword"))
        .await;

    match result {
        Err(Error::ProviderCallFailed { provider, message }) => {
            assert_eq!(provider, "claude");
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected ProviderCallFailed, got {other:?}"),
    }
    assert_eq!(h.storage.account(&h.account.id).unwrap().unwrap().coins, 100);
    assert!(h.storage.usage_for_account(&h.account.id).unwrap().is_empty());
}

#[tokio::test]
async fn active_trial_is_unlimited_and_still_audited() {
    let h = harness(0, ScriptedProvider::ok("claude"));
    let mut account = h.account.clone();
    account.trial_ends_at = Some(chrono::Utc::now() + chrono::Duration::days(1));
    // Rebuild the row with a live trial.
    let storage = Arc::new(SqliteStorage::in_memory().unwrap());
    storage.create_account(&account).unwrap();
    let mut registry = ProviderRegistry::new();
    registry.register(h.provider.clone());
    let arbiter = GenerationArbiter::new(storage.clone(), registry);

    let long_prompt = "x".repeat(500); // cost 20 + 25 = 45, far above balance 0
    let receipt = arbiter
        .generate(&account.id, request("claude", &long_prompt))
        .await
        .unwrap();

    assert!(receipt.remaining.is_unlimited());
    assert_eq!(receipt.coins_cost, 45);
    assert_eq!(storage.account(&account.id).unwrap().unwrap().coins, 0);
    // The audit record still carries the computed cost figure.
    let records = storage.usage_for_account(&account.id).unwrap();
    assert_eq!(records[0].coins_cost, 45);
}

#[tokio::test]
async fn denial_carries_required_and_current_without_dispatch() {
    let h = harness(100, ScriptedProvider::ok("claude"));

    // 2000 chars: 20 + 5*20 = 120 required against 100 held.
    let prompt = "x".repeat(2000);
    let result = h.arbiter.generate(&h.account.id, request("claude", &prompt)).await;

    match result {
        Err(Error::InsufficientBalance { required, current }) => {
            assert_eq!(required, 120);
            assert_eq!(current, 100);
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }
    assert_eq!(h.provider.call_count(), 0);
    assert_eq!(h.storage.account(&h.account.id).unwrap().unwrap().coins, 100);
}

#[tokio::test]
async fn unknown_selector_fails_fast_without_network() {
    let h = harness(1000, ScriptedProvider::ok("claude"));

    let result = h
        .arbiter
        .generate(&h.account.id, request("mistral", "make a sword"))
        .await;

    match result {
        Err(Error::InvalidProvider(tag)) => assert_eq!(tag, "mistral"),
        other => panic!("expected InvalidProvider, got {other:?}"),
    }
    assert_eq!(h.provider.call_count(), 0);
    assert_eq!(h.storage.account(&h.account.id).unwrap().unwrap().coins, 1000);
}

#[tokio::test]
async fn missing_account_is_reported_before_anything_else() {
    let h = harness(100, ScriptedProvider::ok("claude"));
    let result = h.arbiter.generate("ghost", request("claude", "hi")).await;
    assert!(matches!(result, Err(Error::AccountNotFound(_))));
    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn optimize_charges_flat_premium_without_usage_record() {
    let h = harness(100, ScriptedProvider::ok("claude"));

    let receipt = h
        .arbiter
        .optimize(&h.account.id, "claude", "public class Old {}")
        .await
        .unwrap();

    assert_eq!(receipt.coins_cost, 25);
    assert_eq!(receipt.remaining, RemainingBalance::Coins(75));
    assert_eq!(receipt.code, "public class Optimized {}");
    assert!(h.storage.usage_for_account(&h.account.id).unwrap().is_empty());
}

#[tokio::test]
async fn explain_is_free_and_skips_the_ledger() {
    let h = harness(0, ScriptedProvider::ok("claude"));

    let explanation = h.arbiter.explain("claude", "public class X {}").await.unwrap();
    assert_eq!(explanation, "it does things");
    assert_eq!(h.storage.account(&h.account.id).unwrap().unwrap().coins, 0);
}

#[tokio::test]
async fn denied_then_rewarded_then_authorized() {
    use modsmith::rewards::RewardService;

    let h = harness(20, ScriptedProvider::ok("claude"));
    let rewards = RewardService::new(h.storage.clone());

    // 25 required against 20 held.
    let denied = h
        .arbiter
        .generate(&h.account.id, request("claude", "make a sword"))
        .await;
    assert!(matches!(denied, Err(Error::InsufficientBalance { .. })));

    // One 30-second video ad closes the gap.
    let reward = rewards.credit(&h.account.id, "video", 30).unwrap();
    assert_eq!(reward.new_balance, 35);

    let receipt = h
        .arbiter
        .generate(&h.account.id, request("claude", "make a sword"))
        .await
        .unwrap();
    assert_eq!(receipt.remaining, RemainingBalance::Coins(10));
}
