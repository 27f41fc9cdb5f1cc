//! `GameMoves` column encoding.
//!
//! A move list is written as a compact JSON array with one object per move,
//! in play order:
//!
//! ```text
//! [{"move":"e4","eval":"0.2","clk":"0:05:00"},{"move":"e5","clk":"0:04:58"}]
//! ```
//!
//! `"move"` is always present and holds the SAN token without any check or
//! mate suffix (`Bb5+` is stored as `"Bb5"`), whether or not the move was
//! annotated. `"eval"` (a pawn score like `"-1.35"` or a mate distance like
//! `"#-2"`) and `"clk"` (`H:MM:SS`) appear only when the source move carried
//! that annotation. A game without a move line encodes
//! to an empty field.

use super::error::Result;
use super::types::{MoveEntry, MoveList};

pub fn encode_moves(moves: Option<&[MoveEntry]>) -> Result<String> {
    match moves {
        Some(moves) => Ok(serde_json::to_string(moves)?),
        None => Ok(String::new()),
    }
}

/// Inverse of [`encode_moves`].
pub fn decode_moves(encoded: &str) -> Result<Option<MoveList>> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(None);
    }

    let moves: Vec<MoveEntry> = serde_json::from_str(encoded)?;
    Ok(Some(moves.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::error::ConvertError;
    use crate::chess::tokenizer::{Line, classify};
    use crate::chess::types::{Clock, Evaluation};

    #[test]
    fn test_encoding_is_documented_shape() {
        let moves = [
            MoveEntry {
                san: "e4".to_string(),
                eval: Some(Evaluation::Pawns(0.2)),
                clk: Some(Clock(300)),
            },
            MoveEntry {
                san: "e5".to_string(),
                eval: None,
                clk: Some(Clock(298)),
            },
            MoveEntry::plain("Nf3"),
        ];

        assert_eq!(
            encode_moves(Some(&moves[..])).unwrap(),
            r#"[{"move":"e4","eval":"0.2","clk":"0:05:00"},{"move":"e5","clk":"0:04:58"},{"move":"Nf3"}]"#
        );
    }

    #[test]
    fn test_missing_moves_encode_to_empty_field() {
        assert_eq!(encode_moves(None).unwrap(), "");
        assert_eq!(decode_moves("").unwrap(), None);
    }

    #[test]
    fn test_round_trip_from_tokenized_line() {
        let line = "1. e4 { [%eval 0.17] [%clk 0:03:00] } 1... c5 { [%eval #-12] [%clk 0:02:58] } 2. Nf3 { [%clk 0:02:59] }";
        let Line::AnnotatedMoves(moves) = classify(line) else {
            panic!("expected annotated moves");
        };

        let encoded = encode_moves(Some(moves.as_slice())).unwrap();
        let decoded = decode_moves(&encoded).unwrap().unwrap();
        assert_eq!(decoded, moves);
    }

    #[test]
    fn test_decode_rejects_bad_annotation() {
        let err = decode_moves(r#"[{"move":"e4","clk":"five minutes"}]"#).unwrap_err();
        assert!(matches!(err, ConvertError::MoveEncoding(_)));
    }

    #[test]
    fn test_decode_rejects_missing_move() {
        assert!(decode_moves(r#"[{"eval":"0.3"}]"#).is_err());
    }
}
