use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

pub type MoveList = SmallVec<[MoveEntry; 8]>;

const LICHESS_SITE_PREFIX: &str = "https://lichess.org/";

/// Engine evaluation attached to a move by a `[%eval ...]` annotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// Score in pawns from White's point of view.
    Pawns(f64),
    /// Forced mate in N; negative when Black mates.
    Mate(i32),
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pawns(score) => write!(f, "{}", score),
            Self::Mate(distance) => write!(f, "#{}", distance),
        }
    }
}

impl FromStr for Evaluation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(distance) = s.strip_prefix('#') {
            distance
                .parse::<i32>()
                .map(Self::Mate)
                .map_err(|e| format!("invalid mate distance '{}': {}", s, e))
        } else {
            s.parse::<f64>()
                .ok()
                .filter(|score| score.is_finite())
                .map(Self::Pawns)
                .ok_or_else(|| format!("invalid evaluation '{}'", s))
        }
    }
}

/// Remaining clock time from a `[%clk H:MM:SS]` annotation, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Clock(pub u32);

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3600;
        let minutes = (self.0 % 3600) / 60;
        let seconds = self.0 % 60;
        write!(f, "{}:{:02}:{:02}", hours, minutes, seconds)
    }
}

impl FromStr for Clock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || format!("invalid clock '{}'", s);

        let mut parts = s.splitn(3, ':');
        let (Some(h), Some(m), Some(sec)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let hours: u32 = h.parse().map_err(|_| invalid())?;
        let minutes: u32 = m.parse().map_err(|_| invalid())?;
        let seconds: u32 = sec.parse().map_err(|_| invalid())?;
        if minutes > 59 || seconds > 59 {
            return Err(invalid());
        }

        hours
            .checked_mul(3600)
            .and_then(|total| total.checked_add(minutes * 60 + seconds))
            .map(Clock)
            .ok_or_else(invalid)
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(
    value: &Option<T>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}

fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: FromStr<Err = String>,
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| raw.parse::<T>().map_err(serde::de::Error::custom))
        .transpose()
}

/// One move of the mainline plus its optional inline annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveEntry {
    #[serde(rename = "move")]
    pub san: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_display",
        deserialize_with = "deserialize_from_str"
    )]
    pub eval: Option<Evaluation>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_display",
        deserialize_with = "deserialize_from_str"
    )]
    pub clk: Option<Clock>,
}

impl MoveEntry {
    pub fn plain(san: impl Into<String>) -> Self {
        Self {
            san: san.into(),
            eval: None,
            clk: None,
        }
    }
}

/// Stores parsed game data from PGN - matches the Lichess database export columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameRecord {
    // Core game info
    pub game_id: Option<String>,
    pub event: Option<String>,
    pub site: Option<String>,
    pub date: Option<String>,
    pub round: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,

    // Date/Time
    pub utc_date: Option<String>,
    pub utc_time: Option<String>,

    // Player info
    pub white_elo: Option<u32>,
    pub black_elo: Option<u32>,
    pub white_rating_diff: Option<i32>,
    pub black_rating_diff: Option<i32>,
    pub white_title: Option<String>,
    pub black_title: Option<String>,

    // Opening info
    pub eco: Option<String>,
    pub opening: Option<String>,

    // Game details
    pub time_control: Option<String>,
    pub termination: Option<String>,

    // Movetext; `None` until a move line is seen
    pub moves: Option<MoveList>,

    tag_count: usize,
}

enum Slot<'a> {
    Text(&'a mut Option<String>),
    Unsigned(&'a mut Option<u32>),
    Signed(&'a mut Option<i32>),
}

impl GameRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record with neither tags nor moves.
    pub fn is_empty(&self) -> bool {
        self.tag_count == 0 && self.moves.is_none()
    }

    /// Number of tag lines applied to this record, known or not.
    pub fn tag_count(&self) -> usize {
        self.tag_count
    }

    /// Identifier written to the `GameID` column: the `GameId` tag, or the
    /// last path segment of a lichess `Site` URL.
    pub fn effective_game_id(&self) -> Option<&str> {
        if let Some(id) = self.game_id.as_deref() {
            return Some(id);
        }

        let site = self.site.as_deref()?;
        let id = site.strip_prefix(LICHESS_SITE_PREFIX)?.trim_end_matches('/');
        (!id.is_empty() && !id.contains('/')).then_some(id)
    }

    fn slot(&mut self, lowered: &str) -> Option<Slot<'_>> {
        let slot = match lowered {
            "gameid" => Slot::Text(&mut self.game_id),
            "event" => Slot::Text(&mut self.event),
            "site" => Slot::Text(&mut self.site),
            "date" => Slot::Text(&mut self.date),
            "round" => Slot::Text(&mut self.round),
            "white" => Slot::Text(&mut self.white),
            "black" => Slot::Text(&mut self.black),
            "result" => Slot::Text(&mut self.result),
            "utcdate" => Slot::Text(&mut self.utc_date),
            "utctime" => Slot::Text(&mut self.utc_time),
            "whiteelo" => Slot::Unsigned(&mut self.white_elo),
            "blackelo" => Slot::Unsigned(&mut self.black_elo),
            "whiteratingdiff" => Slot::Signed(&mut self.white_rating_diff),
            "blackratingdiff" => Slot::Signed(&mut self.black_rating_diff),
            "whitetitle" => Slot::Text(&mut self.white_title),
            "blacktitle" => Slot::Text(&mut self.black_title),
            "eco" => Slot::Text(&mut self.eco),
            "opening" => Slot::Text(&mut self.opening),
            "timecontrol" => Slot::Text(&mut self.time_control),
            "termination" => Slot::Text(&mut self.termination),
            _ => return None,
        };
        Some(slot)
    }

    /// Apply one `[Name "Value"]` tag. The name is matched case-insensitively;
    /// unknown tags are counted but otherwise ignored. The last occurrence of a
    /// tag wins, and an empty value clears the field.
    pub fn set_tag(&mut self, name: &str, value: &str) {
        self.tag_count += 1;

        let lowered = name.to_ascii_lowercase();
        let value = value.trim();
        let Some(slot) = self.slot(&lowered) else {
            log::trace!("Ignoring unknown tag '{}'", name);
            return;
        };

        match slot {
            Slot::Text(field) => {
                *field = (!value.is_empty()).then(|| value.to_string());
            }
            Slot::Unsigned(field) => *field = parse_numeric(name, value),
            Slot::Signed(field) => *field = parse_numeric(name, value),
        }
    }

    /// Append moves parsed from one move line.
    pub fn extend_moves(&mut self, moves: impl IntoIterator<Item = MoveEntry>) {
        self.moves.get_or_insert_with(MoveList::new).extend(moves);
    }
}

fn parse_numeric<T: FromStr>(name: &str, raw: &str) -> Option<T> {
    if raw.is_empty() || raw == "?" || raw == "-" {
        return None;
    }
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Conversion error: {}='{}'", name, raw);
            None
        }
    }
}
