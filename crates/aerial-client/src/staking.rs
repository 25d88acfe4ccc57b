//! Aggregation of raw staking positions into a per-account summary

use crate::node::StakingPositions;
use aerial_math::Int;
use aerial_types::Address;
use std::collections::BTreeMap;

/// Active stake with a single validator, with its pending reward
#[derive(Debug, Clone, PartialEq)]
pub struct StakedPosition {
    pub validator: Address,
    pub amount: Int,
    pub reward: Int,
}

/// Tokens unbonding from a single validator
#[derive(Debug, Clone, PartialEq)]
pub struct UnbondingPosition {
    pub validator: Address,
    pub amount: Int,
}

/// Per-account staking overview: positions grouped by validator plus
/// network-wide totals
#[derive(Debug, Clone, PartialEq)]
pub struct StakingSummary {
    pub current_positions: Vec<StakedPosition>,
    pub unbonding_positions: Vec<UnbondingPosition>,
    pub total_staked: Int,
    pub total_unbonding: Int,
    pub total_rewards: Int,
}

impl StakingSummary {
    /// Fold raw query results into per-validator positions.
    ///
    /// Pure aggregation: entries for the same validator are combined
    /// additively, never overwritten, and validators appearing only in
    /// the reward list still produce a position. Output order is the
    /// validator address order, so repeated calls agree.
    pub fn aggregate(positions: &StakingPositions) -> Self {
        let mut staked: BTreeMap<String, (Address, Int)> = BTreeMap::new();
        for delegation in &positions.delegations {
            let entry = staked
                .entry(delegation.validator.to_string())
                .or_insert_with(|| (delegation.validator.clone(), Int::zero()));
            entry.1 += delegation.amount.clone();
        }

        let mut rewards: BTreeMap<String, (Address, Int)> = BTreeMap::new();
        for reward in &positions.rewards {
            let entry = rewards
                .entry(reward.validator.to_string())
                .or_insert_with(|| (reward.validator.clone(), Int::zero()));
            entry.1 += reward.amount.clone();
        }

        let mut unbonding: BTreeMap<String, (Address, Int)> = BTreeMap::new();
        for entry in &positions.unbonding {
            let slot = unbonding
                .entry(entry.validator.to_string())
                .or_insert_with(|| (entry.validator.clone(), Int::zero()));
            slot.1 += entry.amount.clone();
        }

        let mut current_positions = Vec::new();
        for (key, (validator, amount)) in &staked {
            let reward = rewards
                .get(key)
                .map(|(_, amount)| amount.clone())
                .unwrap_or_else(Int::zero);
            current_positions.push(StakedPosition {
                validator: validator.clone(),
                amount: amount.clone(),
                reward,
            });
        }
        // reward-only validators: nothing staked right now, reward still claimable
        for (key, (validator, reward)) in &rewards {
            if !staked.contains_key(key) {
                current_positions.push(StakedPosition {
                    validator: validator.clone(),
                    amount: Int::zero(),
                    reward: reward.clone(),
                });
            }
        }

        let unbonding_positions: Vec<UnbondingPosition> = unbonding
            .into_values()
            .map(|(validator, amount)| UnbondingPosition { validator, amount })
            .collect();

        let total_staked = staked.into_values().map(|(_, amount)| amount).sum();
        let total_rewards = rewards.into_values().map(|(_, amount)| amount).sum();
        let total_unbonding = unbonding_positions
            .iter()
            .map(|p| p.amount.clone())
            .sum();

        Self {
            current_positions,
            unbonding_positions,
            total_staked,
            total_unbonding,
            total_rewards,
        }
    }
}
