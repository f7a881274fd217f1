use super::types::{GameRecord, Mainline, MovetextToken, play_san};
use crate::chess::ErrorAccumulator;

use pgn_reader::{Nag, Outcome, RawComment, RawTag, SanPlus, Skip, Visitor};
use shakmaty::{CastlingMode, Chess, Color, Position, fen::Fen};
use std::mem;
use std::ops::ControlFlow;

/// Position bookkeeping for the mainline or one open variation.
struct Line {
    pos: Chess,
    before_last: Option<Chess>,
    ply: u32,
    broken: bool,
}

impl Line {
    fn new(pos: Chess, ply: u32) -> Self {
        Self {
            pos,
            before_last: None,
            ply,
            broken: false,
        }
    }
}

/// Streaming PGN visitor (pgn-reader).
///
/// Resolves every SAN against the position it is played in, so the record
/// carries real moves for the mainline and canonical SAN for the whole
/// movetext, variations included. Illegal moves end the line they occur in
/// and are reported through `parse_error`.
pub struct GameVisitor {
    headers: Vec<(String, String)>,
    start: Chess,
    lines: Vec<Line>,
    mainline: Mainline,
    movetext: Vec<MovetextToken>,
    pending_comment: String,
    outcome: Option<String>,
    parse_error: ErrorAccumulator,
    pub current_game: Option<GameRecord>,
}

impl Default for GameVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl GameVisitor {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
            start: Chess::default(),
            lines: Vec::new(),
            mainline: Mainline::new(),
            movetext: Vec::new(),
            pending_comment: String::new(),
            outcome: None,
            parse_error: ErrorAccumulator::default(),
            current_game: None,
        }
    }

    fn set_tag(&mut self, key: String, value: String) {
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((key, value)),
        }
    }

    fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn parse_start_position(raw: &str) -> Result<Chess, String> {
        let fen = Fen::from_ascii(raw.trim().as_bytes())
            .map_err(|e| format!("Invalid FEN header '{raw}': {e}"))?;
        fen.into_position(CastlingMode::Standard)
            .map_err(|e| format!("Invalid FEN header '{raw}': {e}"))
    }

    /// Plies already played before `pos`, counted from the standard start.
    fn starting_ply(pos: &Chess) -> u32 {
        let full_moves = pos.fullmoves().get().saturating_sub(1);
        let black_to_move = u32::from(pos.turn() == Color::Black);
        full_moves.saturating_mul(2).saturating_add(black_to_move)
    }

    fn current_line_open(&self) -> bool {
        self.lines.last().is_some_and(|line| !line.broken)
    }

    fn build_game_record(&mut self) {
        // Unbalanced `(` are closed so the token stream stays well nested.
        while self.lines.len() > 1 {
            self.lines.pop();
            self.movetext.push(MovetextToken::EndVariation);
        }
        self.lines.clear();

        self.current_game = Some(GameRecord {
            headers: mem::take(&mut self.headers),
            start: mem::take(&mut self.start),
            mainline: mem::take(&mut self.mainline),
            movetext: mem::take(&mut self.movetext),
            outcome: self.outcome.take(),
            parse_error: self.parse_error.take(),
        });
    }
}

impl Visitor for GameVisitor {
    type Tags = ();
    type Movetext = ();
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.headers.clear();
        self.start = Chess::default();
        self.lines.clear();
        self.mainline.clear();
        self.movetext.clear();
        self.pending_comment.clear();
        self.outcome = None;
        self.parse_error = ErrorAccumulator::default();
        self.current_game = None;
        ControlFlow::Continue(())
    }

    fn tag(
        &mut self,
        _: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let key = String::from_utf8_lossy(key).into_owned();
        let value = value.decode_utf8_lossy().into_owned();
        self.set_tag(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let fen = self.header("FEN").map(str::to_owned);

        let line = match fen {
            Some(raw) => match Self::parse_start_position(&raw) {
                Ok(pos) => {
                    let ply = Self::starting_ply(&pos);
                    Line::new(pos, ply)
                }
                Err(msg) => {
                    self.parse_error.push(&msg);
                    let mut line = Line::new(Chess::default(), 0);
                    line.broken = true;
                    line
                }
            },
            None => Line::new(Chess::default(), 0),
        };

        self.start = line.pos.clone();
        self.lines.push(line);
        ControlFlow::Continue(())
    }

    fn san(&mut self, _: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        let in_mainline = self.lines.len() == 1;
        let Some(line) = self.lines.last_mut() else {
            return ControlFlow::Continue(());
        };
        if line.broken {
            return ControlFlow::Continue(());
        }

        match san_plus.san.to_move(&line.pos) {
            Ok(m) => {
                let before = line.pos.clone();
                let san = play_san(&mut line.pos, m);
                line.before_last = Some(before);

                if in_mainline {
                    self.mainline.push(m);
                }
                self.movetext.push(MovetextToken::Move {
                    ply: line.ply,
                    san,
                });
                line.ply += 1;
            }
            Err(e) => {
                line.broken = true;
                self.parse_error.push(&format!(
                    "Illegal move '{}' at ply {}: {}",
                    san_plus,
                    line.ply + 1,
                    e
                ));
            }
        }

        ControlFlow::Continue(())
    }

    fn nag(&mut self, _: &mut Self::Movetext, nag: Nag) -> ControlFlow<Self::Output> {
        if self.current_line_open() {
            self.movetext.push(MovetextToken::Nag(nag.0));
        }
        ControlFlow::Continue(())
    }

    fn partial_comment(
        &mut self,
        _: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        self.pending_comment
            .push_str(&String::from_utf8_lossy(comment.as_bytes()));
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        _: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let mut text = mem::take(&mut self.pending_comment);
        text.push_str(&String::from_utf8_lossy(comment.as_bytes()));

        if !self.current_line_open() {
            return ControlFlow::Continue(());
        }

        let text = text.trim();
        match self.movetext.last_mut() {
            Some(MovetextToken::Comment(previous)) => {
                if !text.is_empty() {
                    if !previous.is_empty() {
                        previous.push(' ');
                    }
                    previous.push_str(text);
                }
            }
            _ => self.movetext.push(MovetextToken::Comment(text.to_string())),
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        let Some(line) = self.lines.last() else {
            return ControlFlow::Continue(Skip(true));
        };
        if line.broken {
            return ControlFlow::Continue(Skip(true));
        }

        // Nothing to branch from yet: the variation is dropped, the game is kept.
        let Some(before) = line.before_last.clone() else {
            return ControlFlow::Continue(Skip(true));
        };

        let ply = line.ply.saturating_sub(1);
        self.lines.push(Line::new(before, ply));
        self.movetext.push(MovetextToken::BeginVariation);
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output> {
        if self.lines.len() > 1 {
            self.lines.pop();
            self.movetext.push(MovetextToken::EndVariation);
        }
        ControlFlow::Continue(())
    }

    fn outcome(&mut self, _: &mut Self::Movetext, outcome: Outcome) -> ControlFlow<Self::Output> {
        self.outcome = Some(outcome.to_string());
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, _: Self::Movetext) -> Self::Output {
        self.build_game_record();
    }
}
