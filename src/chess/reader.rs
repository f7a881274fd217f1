use super::{error::MergeError, types::GameRecord, visitor::GameVisitor};

use pgn_reader::Reader;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use zstd::stream::read::Decoder as ZstdDecoder;

pub type PgnInput = Box<dyn Read>;

/// Faults in a row, without a single game in between, before a reader is
/// considered unable to resynchronize.
pub const MAX_CONSECUTIVE_FAULTS: usize = 1000;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressionMode {
    #[default]
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self, MergeError> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(MergeError::InvalidCompression(normalized.to_string()))
        }
    }

    /// Picks zstd for `*.zst` files, plain text otherwise.
    pub fn detect(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("zst") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

pub fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<PgnInput, MergeError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => MergeError::InputNotFound(path.to_path_buf()),
        _ => MergeError::Open {
            path: path.to_path_buf(),
            source,
        },
    })?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as PgnInput)
            .map_err(|source| MergeError::Decoder {
                path: path.to_path_buf(),
                source,
            }),
    }
}

pub enum ReadNextGameOutcome {
    GameReady(GameRecord),
    /// The tokenizer rejected one record; the stream has moved past it.
    TransientFault(String),
    ReaderFinished,
}

/// Anything that yields parsed games one at a time, in input order.
pub trait GameSource {
    fn next_game(&mut self) -> Result<ReadNextGameOutcome, MergeError>;
}

pub struct PgnReaderState<R: Read> {
    pgn_reader: Reader<R>,
    source_name: String,
    next_game_index: usize,
    consecutive_faults: usize,
    visitor: GameVisitor,
}

impl<R: Read> PgnReaderState<R> {
    // pgn-reader buffers the underlying reader itself, so no BufReader here.
    pub fn new(input: R, source_name: impl Into<String>) -> Self {
        Self {
            pgn_reader: Reader::new(input),
            source_name: source_name.into(),
            next_game_index: 1,
            consecutive_faults: 0,
            visitor: GameVisitor::new(),
        }
    }

    /// A failed `read_game` stops inside the broken record. Its remainder is
    /// consumed here so the next read starts at the following game instead
    /// of returning the tail as a game of its own.
    fn discard_rest_of_game(&mut self, game_index: usize) {
        if let Err(error) = self.pgn_reader.skip_game() {
            tracing::debug!(
                "Could not skip rest of game: file='{}'; game_index={}; error={}",
                self.source_name,
                game_index,
                error
            );
        }
    }
}

impl<R: Read> GameSource for PgnReaderState<R> {
    fn next_game(&mut self) -> Result<ReadNextGameOutcome, MergeError> {
        let game_index = self.next_game_index;

        match self.pgn_reader.read_game(&mut self.visitor) {
            Ok(Some(())) => {
                self.next_game_index += 1;
                self.consecutive_faults = 0;
                Ok(match self.visitor.current_game.take() {
                    Some(game) => ReadNextGameOutcome::GameReady(game),
                    None => ReadNextGameOutcome::ReaderFinished,
                })
            }
            Ok(None) => Ok(ReadNextGameOutcome::ReaderFinished),
            Err(error) => {
                self.next_game_index += 1;
                self.consecutive_faults += 1;
                if self.consecutive_faults > MAX_CONSECUTIVE_FAULTS {
                    return Err(MergeError::Resync {
                        source_name: self.source_name.clone(),
                        faults: self.consecutive_faults,
                    });
                }

                let error_msg = format!(
                    "Parser-stage error: stage=read_game; file='{}'; game_index={}; error={}",
                    self.source_name, game_index, error
                );
                tracing::warn!("{error_msg}");
                self.visitor.current_game = None;
                self.discard_rest_of_game(game_index);
                Ok(ReadNextGameOutcome::TransientFault(error_msg))
            }
        }
    }
}
