use super::error::{ConvertError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use zstd::stream::read::Decoder as ZstdDecoder;

pub type PgnInput = Box<dyn Read + Send>;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressionMode {
    /// Decide from the `.zst` extension or the zstd frame magic.
    #[default]
    Auto,
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else if normalized.eq_ignore_ascii_case("plain") {
            Ok(Self::Plain)
        } else if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(ConvertError::Config(format!(
                "Invalid compression value '{}'. Supported values: 'auto', 'plain' or 'zstd'.",
                normalized
            )))
        }
    }
}

impl std::str::FromStr for CompressionMode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn has_zstd_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zst") || ext.eq_ignore_ascii_case("zstd"))
}

/// Wrap an already-open byte stream in the decompression filter for `mode`.
/// `Auto` picks zstd for a `.zst`/`.zstd` path or when the first bytes are
/// the zstd frame magic.
pub fn wrap_input<R>(reader: R, mode: CompressionMode, path: &Path) -> Result<PgnInput>
where
    R: Read + Send + 'static,
{
    let zstd = |reader: BufReader<R>| {
        ZstdDecoder::with_buffer(reader)
            .map(|decoder| Box::new(decoder) as PgnInput)
            .map_err(|source| ConvertError::Decompression {
                path: path.to_path_buf(),
                source,
            })
    };

    let mut reader = BufReader::new(reader);
    match mode {
        CompressionMode::Plain => Ok(Box::new(reader)),
        CompressionMode::Zstd => zstd(reader),
        CompressionMode::Auto => {
            let head = reader.fill_buf().map_err(ConvertError::InputRead)?;
            if head.starts_with(&ZSTD_MAGIC) || has_zstd_extension(path) {
                zstd(reader)
            } else {
                Ok(Box::new(reader))
            }
        }
    }
}

/// Open an archive file as a decoded PGN byte stream.
pub fn open_input(path: &Path, mode: CompressionMode) -> Result<PgnInput> {
    let file = File::open(path).map_err(|source| ConvertError::OpenInput {
        path: path.to_path_buf(),
        source,
    })?;

    log::debug!("Opening '{}' with {:?} decoding", path.display(), mode);
    wrap_input(file, mode, path)
}
