mod boundary;
mod delivery;
mod error;
mod input;
pub mod log;
mod moves;
mod parser;
mod pipeline;
mod tokenizer;
mod types;
mod writer;

pub use boundary::{BoundaryDetector, SEPARATOR_LINES};
pub use delivery::{Delivery, RecordReceiver, RecordSender, channel};
pub use error::{ConvertError, Result};
pub use input::{CompressionMode, PgnInput, open_input, wrap_input};
pub use moves::{decode_moves, encode_moves};
pub use parser::{GameReader, ParseSummary, parse};
pub use pipeline::{
    ConversionSummary, DEFAULT_CHANNEL_CAPACITY, PipelineConfig, convert, convert_file,
};
pub use tokenizer::{Line, classify};
pub use types::{Clock, Evaluation, GameRecord, MoveEntry, MoveList};
pub use writer::{RowWriter, SerializeSummary, column_names, run};
