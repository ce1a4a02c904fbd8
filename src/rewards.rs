//! Coin rewards for ad views.
//!
//! The reward interface trusts the caller's self-reported ad type and
//! duration: `validate_view` is a stub that accepts everything, because the
//! ad network offers no signed completion callback to verify against. That
//! trust gap is inherited and deliberate — closing it needs a server-to-server
//! callback from the ad network, not a local heuristic.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::storage::{Storage, StorageError};
use crate::types::AdViewRecord;
use crate::{Error, Result};

/// Coins per completed 30-second video segment.
const VIDEO_REWARD_PER_SEGMENT: u64 = 15;
const VIDEO_SEGMENT_SECS: u64 = 30;
const BANNER_REWARD: u64 = 5;
const POPUP_REWARD: u64 = 10;
const DEFAULT_REWARD: u64 = 5;

/// Network tag written into ad-view records.
const AD_PROVIDER: &str = "adsterra";

/// Flat per-ad-type reward table. Video scales with watched duration in
/// whole 30-second segments, so a 29-second view earns nothing.
pub fn coin_reward(ad_type: &str, duration_secs: u64) -> u64 {
    match ad_type {
        "video" => (duration_secs / VIDEO_SEGMENT_SECS) * VIDEO_REWARD_PER_SEGMENT,
        "banner" => BANNER_REWARD,
        "popup" => POPUP_REWARD,
        _ => DEFAULT_REWARD,
    }
}

/// Client-facing configuration for the rewarded video slot.
#[derive(Debug, Clone, Serialize)]
pub struct VideoAdConfig {
    pub reward_coins: u64,
    pub duration_secs: u64,
}

pub fn video_ad_config() -> VideoAdConfig {
    VideoAdConfig {
        reward_coins: VIDEO_REWARD_PER_SEGMENT,
        duration_secs: VIDEO_SEGMENT_SECS,
    }
}

/// Outcome of a credited ad view.
#[derive(Debug, Clone, Serialize)]
pub struct AdReward {
    pub coins_earned: u64,
    pub new_balance: u64,
}

pub struct RewardService {
    storage: Arc<dyn Storage>,
}

impl RewardService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Whether the reported view is acceptable. Always true today — see the
    /// module docs for why.
    pub fn validate_view(&self, _account_id: &str, _ad_type: &str) -> bool {
        true
    }

    /// Credit an account for a self-reported ad view and record it.
    pub fn credit(&self, account_id: &str, ad_type: &str, duration_secs: u64) -> Result<AdReward> {
        if !self.validate_view(account_id, ad_type) {
            return Err(Error::Validation("ad view rejected".into()));
        }

        let coins_earned = coin_reward(ad_type, duration_secs);
        let new_balance =
            self.storage
                .credit_coins(account_id, coins_earned)
                .map_err(|e| match e {
                    StorageError::AccountMissing(id) => Error::AccountNotFound(id),
                    other => Error::Storage(other),
                })?;

        self.storage
            .append_ad_view(&AdViewRecord::new(account_id, coins_earned, AD_PROVIDER))?;

        info!(account = %account_id, ad_type, coins_earned, new_balance, "ad view credited");
        Ok(AdReward {
            coins_earned,
            new_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use crate::types::Account;

    #[test]
    fn test_reward_table() {
        assert_eq!(coin_reward("video", 30), 15);
        assert_eq!(coin_reward("video", 60), 30);
        assert_eq!(coin_reward("video", 29), 0);
        assert_eq!(coin_reward("banner", 0), 5);
        assert_eq!(coin_reward("popup", 120), 10);
        assert_eq!(coin_reward("interstitial", 30), 5);
    }

    #[test]
    fn test_credit_updates_balance_and_records_view() {
        let storage = Arc::new(SqliteStorage::in_memory().unwrap());
        let mut account = Account::new("alex", "alex@example.com");
        account.coins = 10;
        storage.create_account(&account).unwrap();

        let service = RewardService::new(storage.clone());
        let reward = service.credit(&account.id, "video", 30).unwrap();
        assert_eq!(reward.coins_earned, 15);
        assert_eq!(reward.new_balance, 25);

        let views = storage.ad_views_for_account(&account.id).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].coins_earned, 15);
        assert_eq!(views[0].ad_provider, "adsterra");
    }

    #[test]
    fn test_credit_unknown_account() {
        let storage = Arc::new(SqliteStorage::in_memory().unwrap());
        let service = RewardService::new(storage);
        assert!(matches!(
            service.credit("ghost", "banner", 0),
            Err(Error::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_video_config_shape() {
        let config = video_ad_config();
        assert_eq!(config.reward_coins, 15);
        assert_eq!(config.duration_secs, 30);
    }
}
