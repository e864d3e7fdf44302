/// Property-based tests for settlement and leaderboard aggregation
///
/// These tests verify that settling a fully recorded game always nets to
/// zero, that settlement does not depend on record order, and that the
/// leaderboard is ordered and conserves winnings for arbitrary inputs.
use connaught_poker::games::GameStatus;
use connaught_poker::leaderboard::{LeaderboardRow, build_leaderboard, compare_entries};
use connaught_poker::settlement::{Buyin, Cents, GameResult, settle_game};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

// Per player: their buy-ins (rebuys included) and a share weight for the pot
fn table_strategy() -> impl Strategy<Value = Vec<(Vec<Cents>, u32)>> {
    prop::collection::vec(
        (prop::collection::vec(1i64..=100_000, 1..=4), 0u32..=10),
        1..=8,
    )
}

/// Build buy-ins and results where the pot is split by weight, remainder to the last player
fn build_game(table: &[(Vec<Cents>, u32)]) -> (Vec<Buyin>, Vec<GameResult>) {
    let game = Uuid::new_v4();
    let host = Uuid::new_v4();
    let players: Vec<Uuid> = table.iter().map(|_| Uuid::new_v4()).collect();

    let mut buyins = Vec::new();
    for (player, (amounts, _)) in players.iter().zip(table) {
        for amount in amounts {
            buyins.push(Buyin::new(game, *player, *amount, host));
        }
    }

    let pot: Cents = buyins.iter().map(|b| b.amount).sum();
    let total_weight: i64 = table.iter().map(|(_, w)| i64::from(*w)).sum::<i64>().max(1);

    let mut results = Vec::new();
    let mut paid_out: Cents = 0;
    for (idx, (player, (_, weight))) in players.iter().zip(table).enumerate() {
        let final_amount = if idx == players.len() - 1 {
            pot - paid_out
        } else {
            pot * i64::from(*weight) / total_weight
        };
        paid_out += final_amount;
        results.push(GameResult::new(game, *player, final_amount, host));
    }

    (buyins, results)
}

proptest! {
    #[test]
    fn test_fully_recorded_game_is_zero_sum(table in table_strategy()) {
        let (buyins, results) = build_game(&table);
        let settlement = settle_game(&buyins, &results).unwrap();

        prop_assert!(settlement.is_balanced());
        prop_assert_eq!(settlement.net_sum(), 0);
        prop_assert_eq!(settlement.total_buyins, settlement.total_cashouts);
        prop_assert_eq!(settlement.players.len(), table.len());
    }

    #[test]
    fn test_net_is_final_minus_buyins(table in table_strategy()) {
        let (buyins, results) = build_game(&table);
        let settlement = settle_game(&buyins, &results).unwrap();

        let mut bought: HashMap<Uuid, Cents> = HashMap::new();
        for b in &buyins {
            *bought.entry(b.user_id).or_insert(0) += b.amount;
        }
        for r in &results {
            prop_assert_eq!(
                settlement.net_for(r.user_id),
                Some(r.final_amount - bought[&r.user_id])
            );
        }
    }

    #[test]
    fn test_settlement_ignores_record_order(table in table_strategy()) {
        let (buyins, results) = build_game(&table);
        let forward = settle_game(&buyins, &results).unwrap();

        let mut rev_buyins = buyins.clone();
        rev_buyins.reverse();
        let mut rev_results = results.clone();
        rev_results.reverse();
        let backward = settle_game(&rev_buyins, &rev_results).unwrap();

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(&forward, &settle_game(&buyins, &results).unwrap());
    }

    #[test]
    fn test_dropping_a_result_flags_imbalance(table in table_strategy()) {
        let (buyins, mut results) = build_game(&table);
        let dropped = results.remove(0);
        let settlement = settle_game(&buyins, &results).unwrap();

        // A dropped result within the one-cent tolerance goes unflagged
        if dropped.final_amount > 1 {
            let imbalance = settlement.imbalance.expect("pot no longer adds up");
            prop_assert_eq!(imbalance.discrepancy, -dropped.final_amount);
            prop_assert!(imbalance.missing_results.contains(&dropped.user_id));
        }
    }

    #[test]
    fn test_leaderboard_is_ordered_and_conserving(
        rows in prop::collection::vec((0usize..5, 0usize..6, 0u8..4, -50_000i64..50_000), 0..60)
    ) {
        let players: Vec<(Uuid, String)> =
            (0..5).map(|i| (Uuid::new_v4(), format!("player{i}"))).collect();
        let games: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        let statuses = [
            GameStatus::Upcoming,
            GameStatus::InProgress,
            GameStatus::Completed,
            GameStatus::Cancelled,
        ];

        // Completed games never change status, so a game has one status
        let game_status: Vec<GameStatus> =
            (0..6).map(|g| statuses[rows.get(g).map_or(2, |r| r.2 as usize)]).collect();

        let rows: Vec<LeaderboardRow> = rows
            .iter()
            .map(|(p, g, _, net)| LeaderboardRow {
                game_id: games[*g],
                game_status: game_status[*g],
                user_id: players[*p].0,
                username: players[*p].1.clone(),
                display_name: players[*p].1.to_uppercase(),
                net_winnings: *net,
            })
            .collect();

        let board = build_leaderboard(&rows);

        for pair in board.windows(2) {
            prop_assert_ne!(compare_entries(&pair[0], &pair[1]), Ordering::Greater);
        }

        let completed: Vec<&LeaderboardRow> = rows
            .iter()
            .filter(|r| r.game_status == GameStatus::Completed)
            .collect();
        let expected_total: Cents = completed.iter().map(|r| r.net_winnings).sum();
        let board_total: Cents = board.iter().map(|e| e.total_winnings).sum();
        prop_assert_eq!(board_total, expected_total);

        for entry in &board {
            let played: BTreeSet<Uuid> = completed
                .iter()
                .filter(|r| r.user_id == entry.user_id)
                .map(|r| r.game_id)
                .collect();
            prop_assert_eq!(entry.games_played as usize, played.len());
        }
    }
}
