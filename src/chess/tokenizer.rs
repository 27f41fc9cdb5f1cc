use super::types::{Clock, Evaluation, MoveEntry, MoveList};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[\s*(\w+)\s+"((?:[^"\\]|\\.)*)"\s*\]$"#).expect("valid tag line regex")
});

/// One move token or one `{ ... }` comment. Comments are matched whole so
/// move-like text inside them is never read as a move. Check and mate
/// suffixes fall outside the move token.
static MOVE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<comment>\{[^}]*\})",
        r"|(?P<san>[NBKRQ]?[a-h]?[1-8]?[\-x]?[a-h][1-8](?:=?[nbrqkNBRQK])?",
        r"|[PNBRQK]?@[a-h][1-8]",
        r"|--|Z0|0000|@@@@",
        r"|O-O(?:-O)?|0-0(?:-0)?)",
    ))
    .expect("valid move token regex")
});

static EVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%eval\s+([+-]?\d+(?:\.\d+)?|#[+-]?\d+)\]").expect("valid eval regex")
});

static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%clk\s+(\d+:\d{2}:\d{2})\]").expect("valid clock regex")
});

/// Classification of one decoded line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line<'a> {
    Tag { name: &'a str, value: Cow<'a, str> },
    AnnotatedMoves(MoveList),
    PlainMoves(MoveList),
    Other,
}

impl Line<'_> {
    pub fn is_tag(&self) -> bool {
        matches!(self, Self::Tag { .. })
    }
}

fn unescape_tag_value(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn annotate(entry: &mut MoveEntry, comment: &str) {
    // The regexes only admit well-formed values; a failed parse means an
    // out-of-range number, which is dropped like a missing one.
    entry.eval = EVAL_RE
        .captures(comment)
        .and_then(|caps| caps[1].parse::<Evaluation>().ok());
    entry.clk = CLOCK_RE
        .captures(comment)
        .and_then(|caps| caps[1].parse::<Clock>().ok());
}

/// Scan a movetext line in order. A comment belongs to the move right before
/// it; moves without one stay unannotated. Returns the moves and whether any
/// comment was attached.
fn scan_moves(line: &str) -> (MoveList, bool) {
    let mut moves = MoveList::new();
    let mut annotated = false;
    let mut open_move = false;

    for caps in MOVE_TOKEN_RE.captures_iter(line) {
        if let Some(san) = caps.name("san") {
            moves.push(MoveEntry::plain(san.as_str()));
            open_move = true;
        } else if let Some(comment) = caps.name("comment")
            && open_move
            && let Some(entry) = moves.last_mut()
        {
            annotate(entry, comment.as_str());
            annotated = true;
            open_move = false;
        }
    }
    (moves, annotated)
}

/// Classify a line. Rules are tried in order and the first match wins:
/// tag, annotated move list, plain move list, other.
pub fn classify(line: &str) -> Line<'_> {
    let line = line.trim();

    if let Some(caps) = TAG_RE.captures(line) {
        let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
            return Line::Other;
        };
        return Line::Tag {
            name: name.as_str(),
            value: unescape_tag_value(value.as_str()),
        };
    }

    if line.starts_with('[') {
        log::debug!("Malformed tag line treated as other: {}", line);
        return Line::Other;
    }

    match scan_moves(line) {
        (moves, _) if moves.is_empty() => Line::Other,
        (moves, true) => Line::AnnotatedMoves(moves),
        (moves, false) => Line::PlainMoves(moves),
    }
}
