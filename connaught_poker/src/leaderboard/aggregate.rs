//! Leaderboard aggregation and ordering.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::models::{LeaderboardEntry, LeaderboardRow, RankedEntry};
use crate::games::{GameId, GameStatus};
use crate::settlement::Cents;
use crate::users::{AuthenticatedUser, UserId, Visibility};

struct Tally<'a> {
    username: &'a str,
    display_name: &'a str,
    total_winnings: Cents,
    games: BTreeSet<GameId>,
}

/// Aggregate result rows into a ranked leaderboard
///
/// Only rows from completed games count, whatever else was recorded for
/// upcoming, running or cancelled games. `games_played` counts distinct
/// games, so a stray duplicate row never inflates it.
///
/// # Arguments
///
/// * `rows` - Results joined with game status and player names, any order
///
/// # Returns
///
/// * `Vec<LeaderboardEntry>` - Every player with at least one completed
///   game, ordered by [`compare_entries`]
pub fn build_leaderboard(rows: &[LeaderboardRow]) -> Vec<LeaderboardEntry> {
    let mut tallies: BTreeMap<UserId, Tally<'_>> = BTreeMap::new();

    for row in rows
        .iter()
        .filter(|row| row.game_status == GameStatus::Completed)
    {
        let tally = tallies.entry(row.user_id).or_insert_with(|| Tally {
            username: &row.username,
            display_name: &row.display_name,
            total_winnings: 0,
            games: BTreeSet::new(),
        });
        // i64 cents cover more than any home game will ever see
        tally.total_winnings = tally.total_winnings.saturating_add(row.net_winnings);
        tally.games.insert(row.game_id);
    }

    let mut entries: Vec<LeaderboardEntry> = tallies
        .into_iter()
        .map(|(user_id, tally)| LeaderboardEntry {
            user_id,
            display_name: tally.display_name.to_string(),
            username: tally.username.to_string(),
            total_winnings: tally.total_winnings,
            games_played: u32::try_from(tally.games.len()).unwrap_or(u32::MAX),
        })
        .collect();

    entries.sort_by(compare_entries);
    entries
}

/// Leaderboard order: total winnings desc, games played desc, username asc
///
/// User ID breaks the (normally impossible) tie of equal usernames.
pub fn compare_entries(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.total_winnings
        .cmp(&a.total_winnings)
        .then_with(|| b.games_played.cmp(&a.games_played))
        .then_with(|| a.username.cmp(&b.username))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Keep the first `limit` entries
pub fn top_n(mut entries: Vec<LeaderboardEntry>, limit: usize) -> Vec<LeaderboardEntry> {
    entries.truncate(limit);
    entries
}

/// Attach 1-based positions to already sorted entries
pub fn rank_entries(entries: Vec<LeaderboardEntry>) -> Vec<RankedEntry> {
    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| RankedEntry {
            rank: idx + 1,
            entry,
        })
        .collect()
}

/// Drop players who hide their totals, unless the viewer may see them anyway
///
/// Players missing from `visibility` are treated as public.
pub fn visible_to(
    entries: Vec<LeaderboardEntry>,
    viewer: &AuthenticatedUser,
    visibility: &HashMap<UserId, Visibility>,
) -> Vec<LeaderboardEntry> {
    entries
        .into_iter()
        .filter(|entry| {
            viewer.overrides_privacy_of(entry.user_id)
                || visibility
                    .get(&entry.user_id)
                    .is_none_or(|v| v.show_total_winnings)
        })
        .collect()
}

/// Render cents as a currency amount with two decimals, e.g. `-12.05`
pub fn format_amount(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
