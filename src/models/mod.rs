pub mod game;
pub mod options;

pub use game::{EntryKind, GameIdentifier, GameKind, ParseGameIdentifierError, RedditGameEntry};
pub use options::{FreeGamesOptions, OPTIONS_VERSION};
