use super::delivery::channel;
use super::error::{ConvertError, Result};
use super::input::{CompressionMode, open_input};
use super::parser::{ParseSummary, parse};
use super::writer::{SerializeSummary, run};
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::thread;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PipelineConfig {
    /// Completed records the parser may hold ahead of the serializer.
    pub channel_capacity: usize,
    pub compression: CompressionMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            compression: CompressionMode::Auto,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConversionSummary {
    pub parse: ParseSummary,
    pub serialize: SerializeSummary,
}

fn pick_failure(parse: Result<ParseSummary>, serialize: Result<SerializeSummary>) -> ConvertError {
    match (parse, serialize) {
        // The parser only saw the channel close; the serializer has the cause.
        (Err(parse_err), Err(serialize_err)) if parse_err.is_channel_closed() => serialize_err,
        (Err(parse_err), _) => parse_err,
        (Ok(_), Err(serialize_err)) => serialize_err,
        (Ok(_), Ok(_)) => ConvertError::ProtocolViolation("no stage failed"),
    }
}

/// Run the parser and serializer as two concurrent stages joined by a
/// bounded channel of `config.channel_capacity` records.
///
/// `input` must already be decompressed.
pub fn convert<R, W>(input: R, output: W, config: &PipelineConfig) -> Result<ConversionSummary>
where
    R: Read + Send,
    W: Write + Send,
{
    let (sender, receiver) = channel(config.channel_capacity)?;

    thread::scope(|scope| {
        let serializer = scope.spawn(move || run(receiver, output));
        let parser = {
            let sender = sender.clone();
            scope.spawn(move || parse(input, sender))
        };

        let parse_result = parser
            .join()
            .unwrap_or(Err(ConvertError::StagePanicked("parser")));

        let parse_result = match parse_result {
            Ok(summary) => sender.finish().map(|_| summary),
            Err(err) => Err(err),
        };
        // Without a sender the serializer sees disconnection instead of
        // waiting for a termination signal that will never come.
        drop(sender);

        let serialize_result = serializer
            .join()
            .unwrap_or(Err(ConvertError::StagePanicked("serializer")));

        match (parse_result, serialize_result) {
            (Ok(parse), Ok(serialize)) => Ok(ConversionSummary { parse, serialize }),
            (parse, serialize) => Err(pick_failure(parse, serialize)),
        }
    })
}

/// Creating the output truncates it, so it must not be the archive itself.
fn ensure_distinct(input: &Path, output: &Path) -> Result<()> {
    let (Ok(input_real), Ok(output_real)) = (input.canonicalize(), output.canonicalize()) else {
        return Ok(());
    };
    if input_real == output_real {
        return Err(ConvertError::Config(format!(
            "Output '{}' is the input archive '{}'",
            output.display(),
            input.display()
        )));
    }
    Ok(())
}

/// Convert one archive file into one CSV file.
pub fn convert_file(input: &Path, output: &Path, config: &PipelineConfig) -> Result<ConversionSummary> {
    let reader = open_input(input, config.compression)?;
    ensure_distinct(input, output)?;

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).map_err(|source| ConvertError::CreateOutput {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = File::create(output).map_err(|source| ConvertError::CreateOutput {
        path: output.to_path_buf(),
        source,
    })?;

    log::info!("Converting '{}' to '{}'", input.display(), output.display());
    let summary = convert(reader, BufWriter::new(file), config)?;
    log::info!(
        "Wrote {} rows to '{}'",
        summary.serialize.rows,
        output.display()
    );
    Ok(summary)
}
