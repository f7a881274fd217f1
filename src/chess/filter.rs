use super::types::GameRecord;
use shakmaty::{EnPassantMode, fen::Fen};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Games shorter than this are noise, not games.
pub const MIN_PLIES: usize = 2;

/// Why a parsed game is kept out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("game has parse errors")]
    ParseError,
    #[error("game has fewer than {} plies", MIN_PLIES)]
    TooShort,
    #[error("game does not start from the standard position")]
    NonStandardStart,
}

/// Decides whether a game may be merged or re-exported. Checks run in a
/// fixed order so the first failing one is reported.
pub fn check_game(game: &GameRecord) -> Result<(), Rejection> {
    if game.parse_error.is_some() {
        return Err(Rejection::ParseError);
    }

    if game.ply_count() < MIN_PLIES {
        return Err(Rejection::TooShort);
    }

    let start = Fen::from_position(&game.start, EnPassantMode::Legal).to_string();
    if start != STARTING_FEN {
        return Err(Rejection::NonStandardStart);
    }

    Ok(())
}

pub fn is_mergeable(game: &GameRecord) -> bool {
    check_game(game).is_ok()
}
