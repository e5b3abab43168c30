//! Command token catalog shared by the controller and the device.
//!
//! Tokens are the human-readable strings at the start of every body, e.g.
//! `GET; AI DIFFICULTY`. A `GET;` prefix marks a getter (no argument on the
//! request), a `SET;` prefix marks a setter (one argument, or two for goal
//! data).

use std::fmt;
use std::ops::RangeInclusive;

/// Prefix of every getter token.
pub const GETTER_PREFIX: &str = "GET; ";

/// Prefix of every setter token.
pub const SETTER_PREFIX: &str = "SET; ";

/// Substring that marks a setter body.
pub const SETTER_MARKER: &str = "SET;";

/// Substring that marks an error response body.
pub const ERROR_MARKER: &str = "ERROR";

/// Name of the device-originated goal event.
const GOAL_DATA: &str = "GOAL DATA";

/// Inactive value for activity-state settings.
pub const INACTIVE: i64 = 0;

/// Active value for activity-state settings.
pub const ACTIVE: i64 = 1;

/// A configurable device setting, readable and writable by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// AI opponent difficulty, 1-10.
    AiDifficulty,
    /// Whether the table AI is active, 0/1.
    AiState,
    /// Whether a game is running, 0/1. While active the device reports goals.
    GameState,
    /// Mode of play, see [`TableMode`].
    TableMode,
    /// Table lighting as a 24-bit RGB value.
    Lighting,
    /// Puck levitation air speed in percent, 0-100.
    AirSpeed,
}

impl Setting {
    pub const ALL: [Setting; 6] = [
        Setting::AiDifficulty,
        Setting::AiState,
        Setting::GameState,
        Setting::TableMode,
        Setting::Lighting,
        Setting::AirSpeed,
    ];

    /// Name as it appears after the `GET; `/`SET; ` prefix.
    pub fn name(self) -> &'static str {
        match self {
            Setting::AiDifficulty => "AI DIFFICULTY",
            Setting::AiState => "AI STATE",
            Setting::GameState => "GAME STATE",
            Setting::TableMode => "TABLE MODE",
            Setting::Lighting => "LIGHTING VALUE",
            Setting::AirSpeed => "TABLE AIR SPEED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|setting| setting.name() == name)
    }

    /// Range of values the device accepts for this setting.
    pub fn range(self) -> RangeInclusive<i64> {
        match self {
            Setting::AiDifficulty => 1..=10,
            Setting::AiState | Setting::GameState => INACTIVE..=ACTIVE,
            Setting::TableMode => 0..=2,
            Setting::Lighting => 0..=0x00FF_FFFF,
            Setting::AirSpeed => 0..=100,
        }
    }

    /// Clamp a requested value into [`range`](Self::range).
    pub fn normalize(self, value: i64) -> i64 {
        let range = self.range();
        value.clamp(*range.start(), *range.end())
    }

    /// Getter token for this setting.
    pub fn getter(self) -> Token {
        Token::Get(self)
    }

    /// Setter token for this setting.
    pub fn setter(self) -> Token {
        Token::Set(self)
    }
}

/// Which way a token moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Getter,
    Setter,
}

/// Argument shape a token carries on the request side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    None,
    One,
    Pair,
}

/// A command token from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// `GET; <setting>`: controller reads a setting.
    Get(Setting),
    /// `SET; <setting>`: controller writes a setting.
    Set(Setting),
    /// `SET; GOAL DATA`: device reports a goal (side, speed). Unsolicited only.
    GoalData,
}

impl Token {
    /// Parse a token string. Returns `None` for anything outside the catalog.
    pub fn parse(token: &str) -> Option<Self> {
        if let Some(name) = token.strip_prefix(GETTER_PREFIX) {
            return Setting::from_name(name).map(Token::Get);
        }
        let name = token.strip_prefix(SETTER_PREFIX)?;
        if name == GOAL_DATA {
            return Some(Token::GoalData);
        }
        Setting::from_name(name).map(Token::Set)
    }

    pub fn direction(self) -> Direction {
        match self {
            Token::Get(_) => Direction::Getter,
            Token::Set(_) | Token::GoalData => Direction::Setter,
        }
    }

    pub fn arg_shape(self) -> ArgShape {
        match self {
            Token::Get(_) => ArgShape::None,
            Token::Set(_) => ArgShape::One,
            Token::GoalData => ArgShape::Pair,
        }
    }

    /// The setting this token reads or writes, if any.
    pub fn setting(self) -> Option<Setting> {
        match self {
            Token::Get(setting) | Token::Set(setting) => Some(setting),
            Token::GoalData => None,
        }
    }

    /// True only for the device-originated goal event.
    pub fn is_unsolicited(self) -> bool {
        matches!(self, Token::GoalData)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Get(setting) => write!(f, "{GETTER_PREFIX}{}", setting.name()),
            Token::Set(setting) => write!(f, "{SETTER_PREFIX}{}", setting.name()),
            Token::GoalData => write!(f, "{SETTER_PREFIX}{GOAL_DATA}"),
        }
    }
}

/// True if a body carries the setter marker anywhere.
pub fn is_setter_body(body: &str) -> bool {
    body.contains(SETTER_MARKER)
}

/// True if a body carries the error marker anywhere.
pub fn is_error_body(body: &str) -> bool {
    body.contains(ERROR_MARKER)
}

/// Mode of play for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableMode {
    /// Two human players.
    #[default]
    Standard,
    /// One player uses accessibility controls.
    Accessibility,
    /// One side is played by the table AI.
    Ai,
}

impl TableMode {
    pub fn value(self) -> i64 {
        match self {
            TableMode::Standard => 0,
            TableMode::Accessibility => 1,
            TableMode::Ai => 2,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(TableMode::Standard),
            1 => Some(TableMode::Accessibility),
            2 => Some(TableMode::Ai),
            _ => None,
        }
    }
}

/// Side of the table a goal was scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Where a human player always plays.
    PlayerOne,
    /// Where the AI and accessibility hardware sit.
    Ai,
}

impl Side {
    pub fn value(self) -> i64 {
        match self {
            Side::PlayerOne => 0,
            Side::Ai => 1,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Side::PlayerOne),
            1 => Some(Side::Ai),
            _ => None,
        }
    }
}
