use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GameKind {
    Sub,
    App,
}

impl GameKind {
    fn prefix(self) -> char {
        match self {
            GameKind::Sub => 's',
            GameKind::App => 'a',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseGameIdentifierError {
    #[error("missing '/' separator in '{0}'")]
    MissingSeparator(String),
    #[error("unknown identifier kind '{0}'")]
    UnknownKind(String),
    #[error("invalid numeric id '{0}'")]
    InvalidId(String),
}

/// A (kind, numeric id) pair such as `s/123` (package) or `a/456` (application).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameIdentifier {
    pub kind: GameKind,
    pub id: u64,
}

impl GameIdentifier {
    pub fn new(kind: GameKind, id: u64) -> Self {
        Self { kind, id }
    }

    pub fn app(id: u64) -> Self {
        Self::new(GameKind::App, id)
    }

    pub fn sub(id: u64) -> Self {
        Self::new(GameKind::Sub, id)
    }

    /// Lenient parse used on feed tokens: malformed input yields `None`.
    pub fn try_parse(token: &str) -> Option<Self> {
        token.parse().ok()
    }
}

impl FromStr for GameIdentifier {
    type Err = ParseGameIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (kind, id) = trimmed
            .split_once('/')
            .ok_or_else(|| ParseGameIdentifierError::MissingSeparator(trimmed.to_string()))?;

        let kind = match kind.trim().to_ascii_lowercase().as_str() {
            "s" | "sub" => GameKind::Sub,
            "a" | "app" => GameKind::App,
            other => return Err(ParseGameIdentifierError::UnknownKind(other.to_string())),
        };

        let id = id.trim();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseGameIdentifierError::InvalidId(id.to_string()));
        }
        let id: u64 = id
            .parse()
            .map_err(|_| ParseGameIdentifierError::InvalidId(id.to_string()))?;
        if id == 0 {
            return Err(ParseGameIdentifierError::InvalidId(id.to_string()));
        }

        Ok(Self { kind, id })
    }
}

impl fmt::Display for GameIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.prefix(), self.id)
    }
}

impl From<GameIdentifier> for String {
    fn from(value: GameIdentifier) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for GameIdentifier {
    type Error = ParseGameIdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Classification bits attached to a feed entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EntryKind(u8);

impl EntryKind {
    pub const NONE: EntryKind = EntryKind(0);
    pub const FREE_TO_PLAY: EntryKind = EntryKind(1);
    pub const DLC: EntryKind = EntryKind(1 << 1);

    pub fn contains(self, other: EntryKind) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EntryKind {
    type Output = EntryKind;

    fn bitor(self, rhs: Self) -> Self::Output {
        EntryKind(self.0 | rhs.0)
    }
}

impl BitOrAssign for EntryKind {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// One deduplicated occurrence of a redeemable identifier in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditGameEntry {
    pub identifier: String,
    pub kind: EntryKind,
    // unix seconds, 0 when the comment carried no timestamp
    pub date: i64,
}

impl RedditGameEntry {
    pub fn new(identifier: impl Into<String>, kind: EntryKind, date: i64) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            date,
        }
    }

    pub fn is_free_to_play(&self) -> bool {
        self.kind.contains(EntryKind::FREE_TO_PLAY)
    }

    pub fn is_dlc(&self) -> bool {
        self.kind.contains(EntryKind::DLC)
    }

    pub fn game_identifier(&self) -> Option<GameIdentifier> {
        GameIdentifier::try_parse(&self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sub_and_app_tokens() {
        assert_eq!(GameIdentifier::try_parse("s/123"), Some(GameIdentifier::sub(123)));
        assert_eq!(GameIdentifier::try_parse("a/456"), Some(GameIdentifier::app(456)));
        assert_eq!(GameIdentifier::try_parse("A/7"), Some(GameIdentifier::app(7)));
    }

    #[test]
    fn rejects_malformed_tokens() {
        for token in ["x/1", "s/", "123", "", "a/-4", "s/+4", "a/12b", "s/0"] {
            assert!(
                GameIdentifier::try_parse(token).is_none(),
                "token {token:?} should not parse"
            );
        }
        assert!(matches!(
            "123".parse::<GameIdentifier>(),
            Err(ParseGameIdentifierError::MissingSeparator(_))
        ));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let gid = GameIdentifier::sub(100);
        assert_eq!(gid.to_string(), "s/100");
        assert_eq!(gid.to_string().parse::<GameIdentifier>().unwrap(), gid);
    }

    #[test]
    fn identifier_serializes_as_plain_string() {
        let json = serde_json::to_string(&GameIdentifier::app(200)).unwrap();
        assert_eq!(json, "\"a/200\"");
        let parsed: GameIdentifier = serde_json::from_str("\"s/9\"").unwrap();
        assert_eq!(parsed, GameIdentifier::sub(9));
        assert!(serde_json::from_str::<GameIdentifier>("\"q/9\"").is_err());
    }

    #[test]
    fn entry_kind_flags_combine() {
        let mut kind = EntryKind::NONE;
        assert!(kind.is_empty());
        kind |= EntryKind::FREE_TO_PLAY;
        assert!(kind.contains(EntryKind::FREE_TO_PLAY));
        assert!(!kind.contains(EntryKind::DLC));
        assert!(!kind.contains(EntryKind::NONE));

        let entry = RedditGameEntry::new("a/1", EntryKind::FREE_TO_PLAY | EntryKind::DLC, 5);
        assert!(entry.is_free_to_play());
        assert!(entry.is_dlc());
    }
}
