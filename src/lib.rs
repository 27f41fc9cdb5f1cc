//! Streaming conversion of PGN game archives into CSV rows.
//!
//! The parser and the serializer run as two stages joined by a bounded
//! channel; see [`chess::convert`].

pub mod chess;

pub use chess::{ConvertError, GameRecord, PipelineConfig, Result, convert, convert_file};
