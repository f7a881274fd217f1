use super::tree::{MoveTree, NodeId};
use super::types::{GameRecord, MovetextToken, play_san};

use shakmaty::Chess;
use std::io::{self, Write};

pub const DEFAULT_COLUMNS: usize = 80;

/// Seven Tag Roster with the values used when a tag is missing.
const TAG_ROSTER: [(&str, &str); 7] = [
    ("Event", "?"),
    ("Site", "?"),
    ("Date", "????.??.??"),
    ("Round", "?"),
    ("White", "?"),
    ("Black", "?"),
    ("Result", "*"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub headers: bool,
    pub variations: bool,
    /// Covers both `{ comments }` and NAGs.
    pub comments: bool,
}

impl ExportOptions {
    pub fn with_comments(comments: bool) -> Self {
        Self {
            headers: true,
            variations: true,
            comments,
        }
    }
}

/// Destination for serialized games. One call writes one block; callers
/// separate consecutive blocks with [`GameSink::write_separator`].
pub trait GameSink {
    fn write_game(&mut self, game: &GameRecord, options: ExportOptions) -> io::Result<()>;
    fn write_tree(&mut self, tree: &MoveTree, options: ExportOptions) -> io::Result<()>;
    fn write_separator(&mut self) -> io::Result<()>;
}

/// Movetext under construction, wrapped at a fixed width.
struct MovetextLines {
    text: String,
    line_len: usize,
    columns: usize,
}

impl MovetextLines {
    fn new(columns: usize) -> Self {
        Self {
            text: String::with_capacity(256),
            line_len: 0,
            columns,
        }
    }

    fn push(&mut self, token: &str) {
        let token_len = token.chars().count();
        if self.line_len > 0 {
            if self.line_len + 1 + token_len > self.columns {
                self.text.push('\n');
                self.line_len = 0;
            } else {
                self.text.push(' ');
                self.line_len += 1;
            }
        }
        self.text.push_str(token);
        self.line_len += token_len;
    }

    /// White moves are always numbered, black moves only when `force` is set.
    fn move_number(&mut self, ply: u32, force: bool) {
        let number = ply / 2 + 1;
        if ply % 2 == 0 {
            self.push(&format!("{number}."));
        } else if force {
            self.push(&format!("{number}..."));
        }
    }
}

fn escape_tag_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn ordered_headers(headers: &[(String, String)]) -> Vec<(&str, &str)> {
    let lookup = |key: &str| {
        headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let mut ordered: Vec<(&str, &str)> = TAG_ROSTER
        .iter()
        .map(|&(key, default)| (key, lookup(key).unwrap_or(default)))
        .collect();
    ordered.extend(
        headers
            .iter()
            .filter(|(k, _)| !TAG_ROSTER.iter().any(|(roster, _)| k == roster))
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );
    ordered
}

pub struct PgnWriter<W: Write> {
    out: W,
    columns: usize,
}

impl<W: Write> PgnWriter<W> {
    pub fn new(out: W) -> Self {
        Self::with_columns(out, DEFAULT_COLUMNS)
    }

    pub fn with_columns(out: W, columns: usize) -> Self {
        Self { out, columns }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_headers(&mut self, headers: &[(String, String)]) -> io::Result<()> {
        for (key, value) in ordered_headers(headers) {
            writeln!(self.out, "[{} \"{}\"]", key, escape_tag_value(value))?;
        }
        writeln!(self.out)
    }

    fn finish_movetext(&mut self, lines: MovetextLines) -> io::Result<()> {
        writeln!(self.out, "{}", lines.text)
    }

    fn render_move(
        tree: &MoveTree,
        id: NodeId,
        pos: &mut Chess,
        ply: u32,
        force_number: bool,
        lines: &mut MovetextLines,
    ) {
        if let Some(mv) = tree.node(id).mv() {
            lines.move_number(ply, force_number);
            lines.push(&play_san(pos, mv));
        }
    }

    /// Walks the main continuation from `id` iteratively; only variations
    /// recurse. The first child is the main move, later children follow it
    /// in parentheses.
    fn render_line(
        tree: &MoveTree,
        mut id: NodeId,
        mut pos: Chess,
        mut ply: u32,
        mut force_number: bool,
        options: ExportOptions,
        lines: &mut MovetextLines,
    ) {
        while let Some((&main, variations)) = tree.children(id).split_first() {
            let before = pos.clone();
            Self::render_move(tree, main, &mut pos, ply, force_number, lines);
            force_number = false;

            if options.variations {
                for &variation in variations {
                    lines.push("(");
                    let mut variation_pos = before.clone();
                    Self::render_move(tree, variation, &mut variation_pos, ply, true, lines);
                    Self::render_line(
                        tree,
                        variation,
                        variation_pos,
                        ply + 1,
                        false,
                        options,
                        lines,
                    );
                    lines.push(")");
                    force_number = true;
                }
            }

            id = main;
            ply += 1;
        }
    }
}

impl<W: Write> GameSink for PgnWriter<W> {
    fn write_game(&mut self, game: &GameRecord, options: ExportOptions) -> io::Result<()> {
        if options.headers {
            self.write_headers(&game.headers)?;
        }

        let mut lines = MovetextLines::new(self.columns);
        let mut skipped_depth = 0usize;
        let mut force_number = true;

        for token in &game.movetext {
            match token {
                MovetextToken::BeginVariation => {
                    if skipped_depth > 0 || !options.variations {
                        skipped_depth += 1;
                    } else {
                        lines.push("(");
                        force_number = true;
                    }
                }
                MovetextToken::EndVariation => {
                    if skipped_depth > 0 {
                        skipped_depth -= 1;
                    } else {
                        lines.push(")");
                        force_number = true;
                    }
                }
                _ if skipped_depth > 0 => {}
                MovetextToken::Move { ply, san } => {
                    lines.move_number(*ply, force_number);
                    lines.push(san);
                    force_number = false;
                }
                MovetextToken::Nag(nag) => {
                    if options.comments {
                        lines.push(&format!("${nag}"));
                    }
                }
                MovetextToken::Comment(text) => {
                    if options.comments {
                        lines.push(&format!("{{ {} }}", text.replace('}', "")));
                        force_number = true;
                    }
                }
            }
        }

        let result = game
            .header("Result")
            .or(game.outcome.as_deref())
            .unwrap_or("*");
        lines.push(result);
        self.finish_movetext(lines)
    }

    fn write_tree(&mut self, tree: &MoveTree, options: ExportOptions) -> io::Result<()> {
        if options.headers {
            self.write_headers(tree.headers())?;
        }

        let mut lines = MovetextLines::new(self.columns);
        Self::render_line(
            tree,
            tree.root(),
            Chess::default(),
            0,
            true,
            options,
            &mut lines,
        );

        let result = tree
            .headers()
            .iter()
            .find(|(k, _)| k == "Result")
            .map_or("*", |(_, v)| v.as_str());
        lines.push(result);
        self.finish_movetext(lines)
    }

    fn write_separator(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::visitor::GameVisitor;
    use pgn_reader::Reader;
    use shakmaty::{Move, Position, san::San};

    fn parse_one(pgn: &str) -> GameRecord {
        let mut reader = Reader::new(pgn.as_bytes());
        let mut visitor = GameVisitor::new();

        reader.read_game(&mut visitor).unwrap();
        visitor.current_game.expect("Should have parsed a game")
    }

    fn line(sans: &[&str]) -> Vec<Move> {
        let mut pos = Chess::default();
        sans.iter()
            .map(|san| {
                let m = san.parse::<San>().unwrap().to_move(&pos).unwrap();
                pos.play_unchecked(m);
                m
            })
            .collect()
    }

    fn render_game(game: &GameRecord, options: ExportOptions) -> String {
        let mut writer = PgnWriter::new(Vec::new());
        writer.write_game(game, options).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    fn render_tree(tree: &MoveTree, options: ExportOptions) -> String {
        let mut writer = PgnWriter::new(Vec::new());
        writer.write_tree(tree, options).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    fn movetext_only() -> ExportOptions {
        ExportOptions {
            headers: false,
            variations: true,
            comments: false,
        }
    }

    const ANNOTATED: &str = r#"[Event "Test"]
[White "A"]
[Black "B"]
[Result "1-0"]

1. e4 { king pawn } e5 2. Nf3 $1 (2. Bc4 Nf6) 2... Nc6 1-0"#;

    #[test]
    fn test_write_game_keeps_comments_and_variations() {
        let game = parse_one(ANNOTATED);

        assert_eq!(
            render_game(&game, ExportOptions::with_comments(true)),
            "[Event \"Test\"]\n\
             [Site \"?\"]\n\
             [Date \"????.??.??\"]\n\
             [Round \"?\"]\n\
             [White \"A\"]\n\
             [Black \"B\"]\n\
             [Result \"1-0\"]\n\
             \n\
             1. e4 { king pawn } 1... e5 2. Nf3 $1 ( 2. Bc4 Nf6 ) 2... Nc6 1-0\n"
        );
    }

    #[test]
    fn test_write_game_strips_comments_but_keeps_variations() {
        let game = parse_one(ANNOTATED);
        let options = ExportOptions {
            headers: false,
            ..ExportOptions::with_comments(false)
        };

        let text = render_game(&game, options);
        assert_eq!(text, "1. e4 e5 2. Nf3 ( 2. Bc4 Nf6 ) 2... Nc6 1-0\n");
        assert!(!text.contains('{'));
        assert!(!text.contains('$'));
    }

    #[test]
    fn test_write_game_joins_adjacent_comments() {
        let game = parse_one("1. e4 { solid } { and popular } e5 *");
        let options = ExportOptions {
            headers: false,
            ..ExportOptions::with_comments(true)
        };

        assert_eq!(
            render_game(&game, options),
            "1. e4 { solid and popular } 1... e5 *\n"
        );
    }

    #[test]
    fn test_write_game_without_variations() {
        let game = parse_one("1. e4 (1. d4 (1. c4) d5) 1... e5 *");
        let options = ExportOptions {
            variations: false,
            ..movetext_only()
        };

        assert_eq!(render_game(&game, options), "1. e4 e5 *\n");
    }

    #[test]
    fn test_write_game_extra_tags_follow_roster() {
        let game = parse_one("[ECO \"C20\"]\n[White \"Say \\\"hi\\\"\"]\n1. e4 e5 *");

        let text = render_game(&game, ExportOptions::with_comments(false));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[4], "[White \"Say \\\"hi\\\"\"]");
        assert_eq!(lines[7], "[ECO \"C20\"]");
        assert_eq!(lines[8], "");
    }

    #[test]
    fn test_write_game_result_falls_back_to_outcome() {
        let mut game = parse_one("1. e4 e5 0-1");
        game.outcome = Some("0-1".to_string());

        assert_eq!(render_game(&game, movetext_only()), "1. e4 e5 0-1\n");
    }

    #[test]
    fn test_write_tree_branches_as_variations() {
        let mut tree = MoveTree::new();
        tree.merge(&line(&["e4", "e5", "Nf3"]));
        tree.merge(&line(&["e4", "e5", "Bc4"]));

        assert_eq!(
            render_tree(&tree, ExportOptions::with_comments(false)),
            "[Event \"Merged Games\"]\n\
             [Site \"?\"]\n\
             [Date \"????.??.??\"]\n\
             [Round \"?\"]\n\
             [White \"Various\"]\n\
             [Black \"Various\"]\n\
             [Result \"*\"]\n\
             \n\
             1. e4 e5 2. Nf3 ( 2. Bc4 ) *\n"
        );
    }

    #[test]
    fn test_write_tree_black_variation_numbers() {
        let mut tree = MoveTree::new();
        tree.merge(&line(&["e4", "e5", "Nf3"]));
        tree.merge(&line(&["e4", "c5", "Nf3", "d6"]));

        assert_eq!(
            render_tree(&tree, movetext_only()),
            "1. e4 e5 ( 1... c5 2. Nf3 d6 ) 2. Nf3 *\n"
        );
    }

    #[test]
    fn test_write_tree_nested_variations() {
        let mut tree = MoveTree::new();
        tree.merge(&line(&["d4", "d5", "c4"]));
        tree.merge(&line(&["e4", "e5"]));
        tree.merge(&line(&["e4", "c5"]));

        assert_eq!(
            render_tree(&tree, movetext_only()),
            "1. d4 ( 1. e4 e5 ( 1... c5 ) ) 1... d5 2. c4 *\n"
        );
    }

    #[test]
    fn test_write_tree_check_suffix() {
        let mut tree = MoveTree::new();
        tree.merge(&line(&["e4", "f5", "Qh5+"]));

        assert_eq!(render_tree(&tree, movetext_only()), "1. e4 f5 2. Qh5+ *\n");
    }

    #[test]
    fn test_write_empty_tree() {
        let tree = MoveTree::new();

        assert_eq!(render_tree(&tree, movetext_only()), "*\n");
    }

    #[test]
    fn test_movetext_wraps_at_column_limit() {
        let mut tree = MoveTree::new();
        tree.merge(&line(&["e4", "e5", "Nf3"]));
        tree.merge(&line(&["e4", "e5", "Bc4"]));

        let mut writer = PgnWriter::with_columns(Vec::new(), 16);
        writer.write_tree(&tree, movetext_only()).unwrap();

        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "1. e4 e5 2. Nf3\n( 2. Bc4 ) *\n"
        );
    }

    #[test]
    fn test_separator_is_blank_line() {
        let game = parse_one("1. e4 e5 *");
        let mut writer = PgnWriter::new(Vec::new());

        writer.write_game(&game, movetext_only()).unwrap();
        writer.write_separator().unwrap();
        writer.write_game(&game, movetext_only()).unwrap();

        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "1. e4 e5 *\n\n1. e4 e5 *\n"
        );
    }
}
