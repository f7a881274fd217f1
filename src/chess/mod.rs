mod error;
mod filter;
pub mod log;
mod reader;
pub mod session;
mod tree;
mod types;
mod visitor;
mod writer;

pub use error::{ErrorAccumulator, MergeError};
pub use filter::{MIN_PLIES, Rejection, STARTING_FEN, check_game, is_mergeable};
pub use reader::{
    CompressionMode, GameSource, MAX_CONSECUTIVE_FAULTS, PgnInput, PgnReaderState,
    ReadNextGameOutcome, open_input_stream,
};
pub use session::{Report, RunConfig, RunMode, RunSummary, output_file_name, process_file, run};
pub use tree::{MoveNode, MoveTree, NodeId};
pub use types::{GameRecord, Mainline, MovetextToken, play_san};
pub use visitor::GameVisitor;
pub use writer::{DEFAULT_COLUMNS, ExportOptions, GameSink, PgnWriter};
