//! Roster scoring transforms.
//!
//! Every function takes the roster by reference and returns a new one; only the addressed
//! player's record changes. An out-of-range index returns an unchanged copy.

use crate::types::Player;

fn with_player<F>(players: &[Player], idx: usize, f: F) -> Vec<Player>
where
    F: FnOnce(&mut Player),
{
    let mut next = players.to_vec();
    match next.get_mut(idx) {
        Some(player) => f(player),
        None => tracing::warn!("Score update for unknown seat {}", idx),
    }
    next
}

/// Add `delta` (may be negative) to one player's round score
pub fn adjust_round_score(players: &[Player], idx: usize, delta: i64) -> Vec<Player> {
    with_player(players, idx, |p| p.round_score += delta)
}

/// Zero one player's round score
pub fn reset_round_score(players: &[Player], idx: usize) -> Vec<Player> {
    with_player(players, idx, |p| p.round_score = 0)
}

/// Move one player's round score into their total
pub fn bank_round_score(players: &[Player], idx: usize) -> Vec<Player> {
    with_player(players, idx, |p| {
        p.total_score += p.round_score;
        p.round_score = 0;
    })
}

/// Zero every round score (start of a round)
pub fn reset_all_round_scores(players: &[Player]) -> Vec<Player> {
    players
        .iter()
        .cloned()
        .map(|mut p| {
            p.round_score = 0;
            p
        })
        .collect()
}

/// Roster sorted by total score descending; ties keep seat order
pub fn leaderboard(players: &[Player]) -> Vec<Player> {
    let mut ranked = players.to_vec();
    ranked.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Player> {
        (0..3)
            .map(|i| Player {
                id: format!("p{}", i),
                name: format!("Player {}", i),
                total_score: 100 * i as i64,
                round_score: 50 + i as i64,
                is_computer: false,
                difficulty: 2,
            })
            .collect()
    }

    #[test]
    fn test_adjust_only_touches_target() {
        let before = roster();
        for delta in [-300, -1, 0, 1, 750] {
            let after = adjust_round_score(&before, 1, delta);
            assert_eq!(after[1].round_score, before[1].round_score + delta);
            assert_eq!(after[0], before[0]);
            assert_eq!(after[2], before[2]);
            assert_eq!(after[1].total_score, before[1].total_score);
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let before = roster();
        let snapshot = before.clone();
        let _ = adjust_round_score(&before, 0, 500);
        let _ = bank_round_score(&before, 2);
        assert_eq!(before, snapshot);
    }

    #[test]
    fn test_bank_moves_round_into_total() {
        let before = roster();
        for idx in 0..before.len() {
            let after = bank_round_score(&before, idx);
            assert_eq!(
                after[idx].total_score,
                before[idx].total_score + before[idx].round_score
            );
            assert_eq!(after[idx].round_score, 0);
        }
    }

    #[test]
    fn test_reset_round_score() {
        let after = reset_round_score(&roster(), 2);
        assert_eq!(after[2].round_score, 0);
        assert_eq!(after[2].total_score, 200);
        assert_eq!(after[1].round_score, 51);
    }

    #[test]
    fn test_unknown_seat_is_noop() {
        let before = roster();
        assert_eq!(adjust_round_score(&before, 9, 100), before);
    }

    #[test]
    fn test_leaderboard_sorted() {
        let board = leaderboard(&roster());
        let totals: Vec<i64> = board.iter().map(|p| p.total_score).collect();
        assert_eq!(totals, vec![200, 100, 0]);
    }
}
