use std::io;
use std::path::PathBuf;

/// Run-level failures. Per-record problems never surface here: they end up
/// in [`ErrorAccumulator`] on the record or as a transient fault.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("File '{}' not found.", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to open file '{}': {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed to initialize zstd decoder for '{}': {source}", path.display())]
    Decoder { path: PathBuf, source: io::Error },

    #[error(
        "Reader for '{source_name}' failed to resynchronize after {faults} consecutive parse faults"
    )]
    Resync { source_name: String, faults: usize },

    #[error("Failed to write output: {0}")]
    Sink(io::Error),

    #[error("Invalid compression value '{0}'. Supported values: 'zstd' or omitted.")]
    InvalidCompression(String),
}

#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorAccumulator, MergeError};
    use std::path::PathBuf;

    #[test]
    fn test_push_single_message() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("first error");

        assert_eq!(accumulator.take().as_deref(), Some("first error"));
    }

    #[test]
    fn test_push_multiple_messages_uses_separator() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("illegal move");
        accumulator.push("invalid FEN");

        assert_eq!(
            accumulator.take().as_deref(),
            Some("illegal move; invalid FEN")
        );
    }

    #[test]
    fn test_take_consumes_accumulator() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("error");

        assert_eq!(accumulator.take().as_deref(), Some("error"));
        assert!(accumulator.is_empty());
        assert!(accumulator.take().is_none());
    }

    #[test]
    fn test_input_not_found_message_names_path() {
        let err = MergeError::InputNotFound(PathBuf::from("missing.pgn"));
        assert_eq!(err.to_string(), "File 'missing.pgn' not found.");
    }

    #[test]
    fn test_resync_message_reports_fault_count() {
        let err = MergeError::Resync {
            source_name: "games.pgn".to_string(),
            faults: 1000,
        };
        assert!(err.to_string().contains("games.pgn"));
        assert!(err.to_string().contains("1000"));
    }
}
