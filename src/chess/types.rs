use shakmaty::{Chess, Move, Position, san::San};
use smallvec::SmallVec;

/// Resolved mainline moves of one game.
pub type Mainline = SmallVec<[Move; 128]>;

/// One element of a game's movetext, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovetextToken {
    /// `ply` counts half-moves from the standard start, so even plies are
    /// white moves.
    Move { ply: u32, san: String },
    Nag(u8),
    Comment(String),
    BeginVariation,
    EndVariation,
}

/// One parsed game as produced by the PGN visitor.
#[derive(Debug, Clone, Default)]
pub struct GameRecord {
    /// Tags in input order. A repeated tag overwrites the earlier value.
    pub headers: Vec<(String, String)>,

    /// Position before the first move (`FEN` tag or the standard start).
    pub start: Chess,

    pub mainline: Mainline,
    pub movetext: Vec<MovetextToken>,

    /// Termination marker found in the movetext, if any.
    pub outcome: Option<String>,

    /// `None` for cleanly parsed games, otherwise every problem found
    /// while resolving the movetext.
    pub parse_error: Option<String>,
}

impl GameRecord {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn ply_count(&self) -> usize {
        self.mainline.len()
    }
}

/// Renders `m` as SAN with its check or mate suffix and plays it on `pos`.
pub fn play_san(pos: &mut Chess, m: Move) -> String {
    let san = San::from_move(&*pos, m);
    pos.play_unchecked(m);

    let suffix = if pos.is_checkmate() {
        "#"
    } else if pos.is_check() {
        "+"
    } else {
        ""
    };
    format!("{san}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(pos: &Chess, san: &str) -> Move {
        san.parse::<San>().unwrap().to_move(pos).unwrap()
    }

    #[test]
    fn test_play_san_quiet_move() {
        let mut pos = Chess::default();
        let m = resolve(&pos, "Nf3");

        assert_eq!(play_san(&mut pos, m), "Nf3");
        assert_eq!(pos.turn(), shakmaty::Color::Black);
    }

    #[test]
    fn test_play_san_canonicalizes_long_form() {
        let mut pos = Chess::default();
        let m = resolve(&pos, "Ng1f3");

        assert_eq!(play_san(&mut pos, m), "Nf3");
    }

    #[test]
    fn test_play_san_adds_mate_suffix() {
        let mut pos = Chess::default();
        for san in ["f3", "e5", "g4"] {
            let m = resolve(&pos, san);
            play_san(&mut pos, m);
        }
        let m = resolve(&pos, "Qh4");

        assert_eq!(play_san(&mut pos, m), "Qh4#");
    }

    #[test]
    fn test_header_lookup() {
        let record = GameRecord {
            headers: vec![
                ("Event".to_string(), "Casual".to_string()),
                ("White".to_string(), "Alice".to_string()),
            ],
            ..GameRecord::default()
        };

        assert_eq!(record.header("White"), Some("Alice"));
        assert_eq!(record.header("Black"), None);
    }
}
