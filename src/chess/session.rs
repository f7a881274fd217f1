//! One pass over an input file: read, filter, then merge or re-export.

use super::error::MergeError;
use super::filter::check_game;
use super::reader::{
    CompressionMode, GameSource, PgnReaderState, ReadNextGameOutcome, open_input_stream,
};
use super::tree::MoveTree;
use super::writer::{ExportOptions, GameSink, PgnWriter};

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Accepted games between two progress lines.
pub const PROGRESS_INTERVAL: u64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Fold every accepted mainline into one tree, written once at the end.
    Merge,
    /// Re-export each accepted game on its own.
    Clean { keep_comments: bool },
}

impl RunMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Merge => "Merge",
            Self::Clean { .. } => "Clean Only",
        }
    }

    fn file_suffix(self) -> &'static str {
        match self {
            Self::Merge => "_merged",
            Self::Clean { .. } => "_cleaned",
        }
    }

    /// Merged output never carries comments or NAGs.
    pub fn export_options(self) -> ExportOptions {
        match self {
            Self::Merge => ExportOptions::with_comments(false),
            Self::Clean { keep_comments } => ExportOptions::with_comments(keep_comments),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub input: PathBuf,
    pub mode: RunMode,
    pub compression: CompressionMode,
    /// Overrides the name derived by [`output_file_name`].
    pub output: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, mode: RunMode) -> Self {
        let input = input.into();
        Self {
            compression: CompressionMode::detect(&input),
            input,
            mode,
            output: None,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| output_file_name(&self.input, self.mode, self.compression))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub accepted: u64,
    pub rejected: u64,
    pub faults: u64,
}

#[derive(Debug)]
pub struct Report {
    pub summary: RunSummary,
    pub output: PathBuf,
}

/// `<stem>_merged.pgn` or `<stem>_cleaned.pgn`, relative to the working
/// directory. A `.zst` suffix is dropped first for compressed input, so
/// `games.pgn.zst` becomes `games_merged.pgn`.
pub fn output_file_name(input: &Path, mode: RunMode, compression: CompressionMode) -> PathBuf {
    let mut name = input.file_name().map(PathBuf::from).unwrap_or_default();
    if compression == CompressionMode::Zstd
        && name
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zst"))
    {
        name.set_extension("");
    }

    let stem = name
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    PathBuf::from(format!("{stem}{}.pgn", mode.file_suffix()))
}

/// Drains `source`, writing accepted games to `sink`.
///
/// In clean mode each accepted game is written as soon as it is read. In
/// merge mode nothing reaches the sink until the source is exhausted, then
/// the tree is written in a single call.
pub fn run<S, K>(mode: RunMode, source: &mut S, sink: &mut K) -> Result<RunSummary, MergeError>
where
    S: GameSource + ?Sized,
    K: GameSink + ?Sized,
{
    let options = mode.export_options();
    let mut tree = matches!(mode, RunMode::Merge).then(MoveTree::new);
    let mut summary = RunSummary::default();

    loop {
        let game = match source.next_game()? {
            ReadNextGameOutcome::GameReady(game) => game,
            ReadNextGameOutcome::TransientFault(_) => {
                summary.faults += 1;
                continue;
            }
            ReadNextGameOutcome::ReaderFinished => break,
        };

        if let Err(rejection) = check_game(&game) {
            summary.rejected += 1;
            tracing::debug!(
                event = game.header("Event").unwrap_or("?"),
                "Skipping game: {rejection}"
            );
            continue;
        }

        match tree.as_mut() {
            Some(tree) => tree.merge_game(&game),
            None => {
                sink.write_game(&game, options).map_err(MergeError::Sink)?;
                sink.write_separator().map_err(MergeError::Sink)?;
            }
        }

        summary.accepted += 1;
        if summary.accepted.is_multiple_of(PROGRESS_INTERVAL) {
            tracing::info!("{} games processed...", summary.accepted);
        }
    }

    if let Some(tree) = &tree {
        tracing::info!(nodes = tree.node_count(), "Writing merged game tree...");
        sink.write_tree(tree, options).map_err(MergeError::Sink)?;
    }

    tracing::debug!(
        accepted = summary.accepted,
        rejected = summary.rejected,
        faults = summary.faults,
        "Run finished"
    );
    Ok(summary)
}

/// Output file opened on first write, so a run that fails before producing
/// anything leaves no file behind.
struct DeferredFile {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl DeferredFile {
    fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    fn file(&mut self) -> io::Result<&mut BufWriter<File>> {
        let file = match self.file.take() {
            Some(file) => file,
            None => BufWriter::new(File::create(&self.path).map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("cannot create '{}': {e}", self.path.display()),
                )
            })?),
        };
        Ok(self.file.insert(file))
    }

    /// Creates the file even when nothing was written, then flushes it.
    fn finish(mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

impl Write for DeferredFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

pub fn process_file(config: &RunConfig) -> Result<Report, MergeError> {
    let input = open_input_stream(&config.input, config.compression)?;
    let mut source = PgnReaderState::new(input, config.input.display().to_string());

    let output = config.output_path();
    let mut writer = PgnWriter::new(DeferredFile::new(output.clone()));

    let summary = run(config.mode, &mut source, &mut writer)?;
    writer.into_inner().finish().map_err(MergeError::Sink)?;

    Ok(Report { summary, output })
}
