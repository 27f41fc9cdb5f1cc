use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Failed to read input stream: {0}")]
    InputRead(#[source] io::Error),

    #[error("Failed to open file '{}': {source}", .path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create output '{}': {source}", .path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to initialize zstd decoder for '{}': {source}", .path.display())]
    Decompression {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write row: {0}")]
    SerializationWrite(#[from] csv::Error),

    #[error("Failed to encode or decode GameMoves: {0}")]
    MoveEncoding(#[from] serde_json::Error),

    #[error("Delivery protocol violation: {0}")]
    ProtocolViolation(&'static str),

    #[error("Delivery channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("{0} stage panicked")]
    StagePanicked(&'static str),

    #[error("{0}")]
    Config(String),
}

impl ConvertError {
    /// True when this error only reports that the peer stage went away.
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, Self::ChannelClosed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::ConvertError;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_open_input_message_includes_path() {
        let err = ConvertError::OpenInput {
            path: PathBuf::from("games.pgn.zst"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };

        let message = err.to_string();
        assert!(message.contains("games.pgn.zst"));
        assert!(message.contains("missing"));
    }

    #[test]
    fn test_protocol_violation_message() {
        let err = ConvertError::ProtocolViolation("termination signal sent twice");
        assert_eq!(
            err.to_string(),
            "Delivery protocol violation: termination signal sent twice"
        );
    }

    #[test]
    fn test_is_channel_closed() {
        assert!(ConvertError::ChannelClosed("serializer went away").is_channel_closed());
        assert!(!ConvertError::StagePanicked("parser").is_channel_closed());
    }

    #[test]
    fn test_json_error_converts() {
        let json_err = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
        let err: ConvertError = json_err.into();
        assert!(matches!(err, ConvertError::MoveEncoding(_)));
    }
}
