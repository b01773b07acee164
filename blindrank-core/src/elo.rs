//! Elo update rule with adaptive sensitivity.
//!
//! New entities move fast (K = 64) so a handful of comparisons places
//! them roughly; the K-factor decays with match count so established
//! ratings stabilize instead of oscillating around the truth.

use crate::constants::{DEFAULT_RATING, ELO_SCALE, K_FLOOR, K_SCHEDULE};
use crate::types::EloScore;

/// Map a 1–10 star seeding rating onto the Elo scale.
///
/// Linear around the default rating: 1★ → 600, 5★ → 1000, 10★ → 1500.
/// Out-of-range input is clamped rather than rejected, so the map is
/// total; callers that want to *report* bad stars validate first.
pub fn star_to_elo(star: u8) -> f64 {
    let star = star.clamp(1, 10);
    DEFAULT_RATING + (star as f64 - 5.0) * 100.0
}

/// K-factor for an entity with `matches` recorded comparisons,
/// evaluated before the count is incremented.
pub fn k_factor(matches: u32) -> f64 {
    for (limit, k) in K_SCHEDULE {
        if matches < limit {
            return k;
        }
    }
    K_FLOOR
}

/// Expected score of `a` against `b`: P(a wins) under the Elo model.
fn expected_score(a: f64, b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((b - a) / ELO_SCALE))
}

/// Apply one comparison outcome to both entities.
///
/// Each side uses its own K (an experienced winner gains little from
/// beating a newcomer, but the newcomer still swings hard). Both match
/// counts increment by exactly one.
pub fn update_ratings(winner: &mut EloScore, loser: &mut EloScore) {
    let expected_winner = expected_score(winner.rating, loser.rating);
    let k_winner = k_factor(winner.matches);
    let k_loser = k_factor(loser.matches);

    winner.rating += k_winner * (1.0 - expected_winner);
    loser.rating += k_loser * (0.0 - (1.0 - expected_winner));

    winner.matches += 1;
    loser.matches += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(rating: f64, matches: u32) -> EloScore {
        EloScore { rating, matches }
    }

    #[test]
    fn star_mapping_anchors() {
        assert_eq!(star_to_elo(1), 600.0);
        assert_eq!(star_to_elo(5), 1000.0);
        assert_eq!(star_to_elo(10), 1500.0);
    }

    #[test]
    fn star_mapping_clamps() {
        assert_eq!(star_to_elo(0), 600.0);
        assert_eq!(star_to_elo(200), 1500.0);
    }

    #[test]
    fn k_factor_schedule() {
        assert_eq!(k_factor(0), 64.0);
        assert_eq!(k_factor(9), 64.0);
        assert_eq!(k_factor(10), 48.0);
        assert_eq!(k_factor(19), 48.0);
        assert_eq!(k_factor(20), 32.0);
        assert_eq!(k_factor(29), 32.0);
        assert_eq!(k_factor(30), 24.0);
        assert_eq!(k_factor(1000), 24.0);
    }

    #[test]
    fn even_match_moves_32_points() {
        // Both fresh at 1000: expected = 0.5, K = 64, so ±32.
        let mut winner = score(1000.0, 0);
        let mut loser = score(1000.0, 0);
        update_ratings(&mut winner, &mut loser);

        assert!((winner.rating - 1032.0).abs() < 1e-9);
        assert!((loser.rating - 968.0).abs() < 1e-9);
        assert_eq!(winner.matches, 1);
        assert_eq!(loser.matches, 1);
    }

    #[test]
    fn winner_gains_loser_loses() {
        let mut winner = score(900.0, 12);
        let mut loser = score(1250.0, 40);
        let (w0, l0) = (winner.rating, loser.rating);
        update_ratings(&mut winner, &mut loser);

        assert!(winner.rating > w0);
        assert!(loser.rating < l0);
        assert_eq!(winner.matches, 13);
        assert_eq!(loser.matches, 41);
    }

    #[test]
    fn upset_moves_more_than_expected_win() {
        let mut underdog = score(800.0, 0);
        let mut favorite = score(1200.0, 0);
        update_ratings(&mut underdog, &mut favorite);
        let upset_gain = underdog.rating - 800.0;

        let mut strong = score(1200.0, 0);
        let mut weak = score(800.0, 0);
        update_ratings(&mut strong, &mut weak);
        let expected_gain = strong.rating - 1200.0;

        assert!(upset_gain > expected_gain);
    }

    #[test]
    fn per_side_k_uses_own_match_count() {
        // Veteran winner (K = 24) beats fresh loser (K = 64) at equal
        // ratings: winner moves +12, loser moves -32.
        let mut winner = score(1000.0, 50);
        let mut loser = score(1000.0, 0);
        update_ratings(&mut winner, &mut loser);

        assert!((winner.rating - 1012.0).abs() < 1e-9);
        assert!((loser.rating - 968.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_wins_converge() {
        let mut a = EloScore::default();
        let mut b = EloScore::default();
        for _ in 0..20 {
            update_ratings(&mut a, &mut b);
        }
        assert!(a.rating > 1000.0);
        assert!(b.rating < 1000.0);
        assert_eq!(a.matches, 20);
    }
}
