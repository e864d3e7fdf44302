//! Settlement computation.

use std::collections::BTreeMap;

use super::{
    errors::{SettlementError, SettlementResult},
    models::{
        Buyin, Cents, GameResult, PlayerNet, SETTLEMENT_TOLERANCE_CENTS, Settlement,
        SettlementImbalance,
    },
};
use crate::games::GameId;
use crate::users::UserId;

/// Settle one game using the default one-cent tolerance
///
/// # Arguments
///
/// * `buyins` - Every buy-in recorded for the game
/// * `results` - Every result recorded for the game
///
/// # Returns
///
/// * `SettlementResult<Settlement>` - Per-player net winnings, with an
///   imbalance warning attached if money in and money out disagree
///
/// # Errors
///
/// * `SettlementError::DuplicateResult` - Two results for the same player
/// * `SettlementError::MixedGames` - Records from different games
/// * `SettlementError::InvalidAmount` - Non-positive buy-in or negative final amount
pub fn settle_game(buyins: &[Buyin], results: &[GameResult]) -> SettlementResult<Settlement> {
    settle_game_with_tolerance(buyins, results, SETTLEMENT_TOLERANCE_CENTS)
}

/// Settle one game, flagging an imbalance larger than `tolerance` cents
pub fn settle_game_with_tolerance(
    buyins: &[Buyin],
    results: &[GameResult],
    tolerance: Cents,
) -> SettlementResult<Settlement> {
    let game_id = single_game_id(buyins, results)?;

    let mut buyin_totals: BTreeMap<UserId, Cents> = BTreeMap::new();
    let mut total_buyins: Cents = 0;
    for buyin in buyins {
        if buyin.amount <= 0 {
            return Err(SettlementError::InvalidAmount {
                user_id: buyin.user_id,
                amount: buyin.amount,
            });
        }
        let total = buyin_totals.entry(buyin.user_id).or_insert(0);
        *total = total
            .checked_add(buyin.amount)
            .ok_or(SettlementError::AmountOverflow)?;
        total_buyins = total_buyins
            .checked_add(buyin.amount)
            .ok_or(SettlementError::AmountOverflow)?;
    }

    let mut players: BTreeMap<UserId, PlayerNet> = BTreeMap::new();
    let mut total_cashouts: Cents = 0;
    for result in results {
        if result.final_amount < 0 {
            return Err(SettlementError::InvalidAmount {
                user_id: result.user_id,
                amount: result.final_amount,
            });
        }

        // A result without buy-ins is legal: the whole final amount is profit
        let total_buyin = buyin_totals.get(&result.user_id).copied().unwrap_or(0);
        let net_winnings = result
            .final_amount
            .checked_sub(total_buyin)
            .ok_or(SettlementError::AmountOverflow)?;

        let line = PlayerNet {
            user_id: result.user_id,
            total_buyin,
            final_amount: result.final_amount,
            net_winnings,
        };
        if players.insert(result.user_id, line).is_some() {
            return Err(SettlementError::DuplicateResult {
                game_id: result.game_id,
                user_id: result.user_id,
            });
        }

        total_cashouts = total_cashouts
            .checked_add(result.final_amount)
            .ok_or(SettlementError::AmountOverflow)?;
    }

    let missing_results: Vec<UserId> = buyin_totals
        .keys()
        .filter(|user_id| !players.contains_key(user_id))
        .copied()
        .collect();

    let discrepancy = total_cashouts
        .checked_sub(total_buyins)
        .ok_or(SettlementError::AmountOverflow)?;

    let imbalance = if discrepancy.unsigned_abs() > tolerance.max(0).unsigned_abs() {
        log::debug!(
            "Game {:?} settles {} cents off zero ({} missing results)",
            game_id,
            discrepancy,
            missing_results.len()
        );
        Some(SettlementImbalance {
            game_id,
            discrepancy,
            missing_results,
        })
    } else {
        None
    };

    Ok(Settlement {
        game_id,
        players: players.into_values().collect(),
        total_buyins,
        total_cashouts,
        imbalance,
    })
}

/// The one game all records belong to, or `None` if there are no records
fn single_game_id(buyins: &[Buyin], results: &[GameResult]) -> SettlementResult<Option<GameId>> {
    let mut ids = buyins
        .iter()
        .map(|b| b.game_id)
        .chain(results.iter().map(|r| r.game_id));

    let Some(expected) = ids.next() else {
        return Ok(None);
    };

    match ids.find(|id| *id != expected) {
        Some(found) => Err(SettlementError::MixedGames { expected, found }),
        None => Ok(Some(expected)),
    }
}
