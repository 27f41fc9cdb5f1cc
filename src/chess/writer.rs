use super::delivery::{Delivery, RecordReceiver};
use super::error::Result;
use super::moves::encode_moves;
use super::types::GameRecord;
use csv::{QuoteStyle, WriterBuilder};
use std::borrow::Cow;
use std::io::Write;

const CSV_COLUMN_COUNT: usize = 21;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CsvColumn {
    GameId,
    Event,
    Site,
    Date,
    Round,
    White,
    Black,
    Result,
    UtcDate,
    UtcTime,
    WhiteElo,
    BlackElo,
    WhiteRatingDiff,
    BlackRatingDiff,
    WhiteTitle,
    BlackTitle,
    Eco,
    Opening,
    TimeControl,
    Termination,
    GameMoves,
}

const CSV_COLUMNS: [CsvColumn; CSV_COLUMN_COUNT] = [
    CsvColumn::GameId,
    CsvColumn::Event,
    CsvColumn::Site,
    CsvColumn::Date,
    CsvColumn::Round,
    CsvColumn::White,
    CsvColumn::Black,
    CsvColumn::Result,
    CsvColumn::UtcDate,
    CsvColumn::UtcTime,
    CsvColumn::WhiteElo,
    CsvColumn::BlackElo,
    CsvColumn::WhiteRatingDiff,
    CsvColumn::BlackRatingDiff,
    CsvColumn::WhiteTitle,
    CsvColumn::BlackTitle,
    CsvColumn::Eco,
    CsvColumn::Opening,
    CsvColumn::TimeControl,
    CsvColumn::Termination,
    CsvColumn::GameMoves,
];

fn text(value: Option<&str>) -> Cow<'_, str> {
    Cow::Borrowed(value.unwrap_or_default())
}

fn number<T: ToString>(value: Option<T>) -> Cow<'static, str> {
    value.map_or(Cow::Borrowed(""), |v| Cow::Owned(v.to_string()))
}

impl CsvColumn {
    fn name(self) -> &'static str {
        match self {
            Self::GameId => "GameID",
            Self::Event => "Event",
            Self::Site => "Site",
            Self::Date => "Date",
            Self::Round => "Round",
            Self::White => "White",
            Self::Black => "Black",
            Self::Result => "Result",
            Self::UtcDate => "UTCDate",
            Self::UtcTime => "UTCTime",
            Self::WhiteElo => "WhiteElo",
            Self::BlackElo => "BlackElo",
            Self::WhiteRatingDiff => "WhiteRatingDiff",
            Self::BlackRatingDiff => "BlackRatingDiff",
            Self::WhiteTitle => "WhiteTitle",
            Self::BlackTitle => "BlackTitle",
            Self::Eco => "ECO",
            Self::Opening => "Opening",
            Self::TimeControl => "TimeControl",
            Self::Termination => "Termination",
            Self::GameMoves => "GameMoves",
        }
    }

    fn value(self, game: &GameRecord) -> Result<Cow<'_, str>> {
        let value = match self {
            Self::GameId => text(game.effective_game_id()),
            Self::Event => text(game.event.as_deref()),
            Self::Site => text(game.site.as_deref()),
            Self::Date => text(game.date.as_deref()),
            Self::Round => text(game.round.as_deref()),
            Self::White => text(game.white.as_deref()),
            Self::Black => text(game.black.as_deref()),
            Self::Result => text(game.result.as_deref()),
            Self::UtcDate => text(game.utc_date.as_deref()),
            Self::UtcTime => text(game.utc_time.as_deref()),
            Self::WhiteElo => number(game.white_elo),
            Self::BlackElo => number(game.black_elo),
            Self::WhiteRatingDiff => number(game.white_rating_diff),
            Self::BlackRatingDiff => number(game.black_rating_diff),
            Self::WhiteTitle => text(game.white_title.as_deref()),
            Self::BlackTitle => text(game.black_title.as_deref()),
            Self::Eco => text(game.eco.as_deref()),
            Self::Opening => text(game.opening.as_deref()),
            Self::TimeControl => text(game.time_control.as_deref()),
            Self::Termination => text(game.termination.as_deref()),
            Self::GameMoves => Cow::Owned(encode_moves(game.moves.as_deref())?),
        };
        Ok(value)
    }
}

/// Header row, in output column order.
pub fn column_names() -> [&'static str; CSV_COLUMN_COUNT] {
    CSV_COLUMNS.map(CsvColumn::name)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeSummary {
    pub rows: u64,
}

/// CSV row sink with minimal quoting.
pub struct RowWriter<W: Write> {
    inner: csv::Writer<W>,
    rows: u64,
}

impl<W: Write> RowWriter<W> {
    /// Wrap `writer` and emit the header row.
    pub fn new(writer: W) -> Result<Self> {
        let mut inner = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_writer(writer);
        inner.write_record(column_names())?;
        Ok(Self { inner, rows: 0 })
    }

    pub fn write_row(&mut self, game: &GameRecord) -> Result<()> {
        let mut fields: Vec<Cow<'_, str>> = Vec::with_capacity(CSV_COLUMN_COUNT);
        for column in CSV_COLUMNS {
            fields.push(column.value(game)?);
        }
        self.inner
            .write_record(fields.iter().map(|field| field.as_bytes()))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

/// Consume `source` until the termination signal, writing one row per
/// record. Every received item, the signal included, is acknowledged.
pub fn run<W: Write>(mut source: RecordReceiver, writer: W) -> Result<SerializeSummary> {
    let mut rows = RowWriter::new(writer)?;

    loop {
        match source.recv()? {
            Delivery::Record(game) => {
                rows.write_row(&game)?;
                source.ack();
            }
            Delivery::EndOfStream => {
                rows.flush()?;
                source.ack();
                break;
            }
        }
    }

    let summary = SerializeSummary { rows: rows.rows() };
    log::info!("Serialized {} rows", summary.rows);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::delivery::channel;
    use crate::chess::error::ConvertError;
    use crate::chess::moves::decode_moves;
    use crate::chess::types::{Clock, Evaluation, MoveEntry};
    use std::io;
    use std::sync::{Arc, Mutex};

    fn sample_game() -> GameRecord {
        let mut game = GameRecord::new();
        game.set_tag("Event", "Rated Blitz game");
        game.set_tag("Site", "https://lichess.org/j1dkb5dw");
        game.set_tag("White", "Smith, John");
        game.set_tag("Black", "O\"Neil");
        game.set_tag("WhiteElo", "1639");
        game.set_tag("WhiteRatingDiff", "-8");
        game.extend_moves([
            MoveEntry {
                san: "e4".to_string(),
                eval: Some(Evaluation::Pawns(0.2)),
                clk: Some(Clock(300)),
            },
            MoveEntry::plain("e5"),
        ]);
        game
    }

    fn read_rows(bytes: &[u8]) -> Vec<csv::StringRecord> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes)
            .records()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_columns_match_contract() {
        let expected = [
            "GameID",
            "Event",
            "Site",
            "Date",
            "Round",
            "White",
            "Black",
            "Result",
            "UTCDate",
            "UTCTime",
            "WhiteElo",
            "BlackElo",
            "WhiteRatingDiff",
            "BlackRatingDiff",
            "WhiteTitle",
            "BlackTitle",
            "ECO",
            "Opening",
            "TimeControl",
            "Termination",
            "GameMoves",
        ];
        assert_eq!(column_names(), expected);
    }

    #[test]
    fn test_row_values_and_quoting() {
        let mut out = Vec::new();
        {
            let mut writer = RowWriter::new(&mut out).unwrap();
            writer.write_row(&sample_game()).unwrap();
            writer.flush().unwrap();
        }

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.contains("\"Smith, John\""));

        let rows = read_rows(&out);
        assert_eq!(rows.len(), 2);
        let row = &rows[1];
        assert_eq!(&row[0], "j1dkb5dw");
        assert_eq!(&row[1], "Rated Blitz game");
        assert_eq!(&row[5], "Smith, John");
        assert_eq!(&row[6], "O\"Neil");
        assert_eq!(&row[10], "1639");
        assert_eq!(&row[11], "");
        assert_eq!(&row[12], "-8");
        assert_eq!(&row[13], "");

        let moves = decode_moves(&row[20]).unwrap().unwrap();
        assert_eq!(Some(&moves), sample_game().moves.as_ref());
    }

    #[test]
    fn test_game_without_moves_has_empty_moves_field() {
        let mut game = GameRecord::new();
        game.set_tag("Event", "Abandoned");

        let mut out = Vec::new();
        {
            let mut writer = RowWriter::new(&mut out).unwrap();
            writer.write_row(&game).unwrap();
            writer.flush().unwrap();
        }
        let rows = read_rows(&out);
        assert_eq!(&rows[1][20], "");
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_run_stops_at_termination_signal() {
        let (tx, rx) = channel(4).unwrap();
        tx.send(sample_game()).unwrap();
        tx.send(sample_game()).unwrap();
        tx.finish().unwrap();

        let buffer = SharedBuffer::default();
        let summary = run(rx, buffer.clone()).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(tx.pending(), 0);

        // The serializer has exited; nothing further is accepted or written.
        assert!(matches!(
            tx.send(sample_game()).unwrap_err(),
            ConvertError::ProtocolViolation(_)
        ));
        assert!(matches!(
            tx.finish().unwrap_err(),
            ConvertError::ProtocolViolation(_)
        ));
        let written = buffer.0.lock().unwrap().clone();
        assert_eq!(read_rows(&written).len(), 3);
    }

    #[test]
    fn test_run_without_termination_signal_fails() {
        let (tx, rx) = channel(4).unwrap();
        tx.send(sample_game()).unwrap();
        drop(tx);

        let err = run(rx, Vec::new()).unwrap_err();
        assert!(err.is_channel_closed());
    }

    struct RejectingWriter;

    impl Write for RejectingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_write_failure_is_serialization_error() {
        let (tx, rx) = channel(4).unwrap();
        tx.send(sample_game()).unwrap();
        tx.finish().unwrap();

        let err = run(rx, RejectingWriter).unwrap_err();
        assert!(matches!(err, ConvertError::SerializationWrite(_)));
    }
}
