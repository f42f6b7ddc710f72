use santa_models::GameResult;

use crate::error::ArenaError;

/// Default maximum rating change per game.
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Expected scores of two players rated `a` and `b`; they sum to 1.
pub fn expected_scores(a: f64, b: f64) -> (f64, f64) {
    let qa = 10f64.powf(a / 400.0);
    let qb = 10f64.powf(b / 400.0);
    let s = qa + qb;
    (qa / s, qb / s)
}

/// Ratings of the left (`ra`) and right (`rb`) players after a game.
pub fn new_ratings(ra: f64, rb: f64, result: GameResult, k: f64) -> Result<(f64, f64), ArenaError> {
    let (ea, eb) = expected_scores(ra, rb);
    let (sa, sb) = match result {
        GameResult::LeftWon => (1.0, 0.0),
        GameResult::RightWon => (0.0, 1.0),
        GameResult::Draw => (0.5, 0.5),
        GameResult::Unknown => return Err(ArenaError::UnknownResult(result.to_string())),
    };
    Ok((ra + k * (sa - ea), rb + k * (sb - eb)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn equal_ratings_expect_half() {
        let (ea, eb) = expected_scores(600.0, 600.0);
        assert!(close(ea, 0.5));
        assert!(close(eb, 0.5));
    }

    #[test]
    fn four_hundred_points_is_ten_to_one() {
        let (ea, eb) = expected_scores(1000.0, 600.0);
        assert!(close(ea, 10.0 / 11.0));
        assert!(close(eb, 1.0 / 11.0));
    }

    #[test]
    fn win_between_equals_moves_half_k() {
        let (a, b) = new_ratings(600.0, 600.0, GameResult::LeftWon, DEFAULT_K_FACTOR).unwrap();
        assert!(close(a, 616.0));
        assert!(close(b, 584.0));

        let (a, b) = new_ratings(600.0, 600.0, GameResult::RightWon, DEFAULT_K_FACTOR).unwrap();
        assert!(close(a, 584.0));
        assert!(close(b, 616.0));
    }

    #[test]
    fn draw_between_equals_changes_nothing() {
        let (a, b) = new_ratings(600.0, 600.0, GameResult::Draw, DEFAULT_K_FACTOR).unwrap();
        assert!(close(a, 600.0));
        assert!(close(b, 600.0));
    }

    #[test]
    fn draw_pulls_ratings_together() {
        let (a, b) = new_ratings(800.0, 600.0, GameResult::Draw, DEFAULT_K_FACTOR).unwrap();
        assert!(a < 800.0);
        assert!(b > 600.0);
        assert!(close(a + b, 1400.0));
    }

    #[test]
    fn ratings_sum_is_conserved() {
        for result in [GameResult::LeftWon, GameResult::RightWon, GameResult::Draw] {
            let (a, b) = new_ratings(712.5, 655.25, result, 24.0).unwrap();
            assert!(close(a + b, 712.5 + 655.25));
        }
    }

    #[test]
    fn unknown_result_is_rejected() {
        let err = new_ratings(600.0, 600.0, GameResult::Unknown, DEFAULT_K_FACTOR).unwrap_err();
        assert_eq!(err.to_string(), "Unknown result 'UNKNOWN'.");
    }
}
