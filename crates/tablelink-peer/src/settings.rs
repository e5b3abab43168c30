use tablelink_frame::catalog::{ACTIVE, INACTIVE};
use tablelink_frame::{Setting, TableMode};
use tracing::{debug, warn};

use crate::dispatcher::Dispatcher;
use crate::error::{PeerError, Result};

/// The table configuration a controller shows and edits between games.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSettings {
    pub table_mode: TableMode,
    pub ai_difficulty: i64,
    pub ai_active: bool,
    /// 24-bit RGB.
    pub lighting: i64,
    /// Percent.
    pub air_speed: i64,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            table_mode: TableMode::Standard,
            ai_difficulty: 1,
            ai_active: false,
            lighting: 0,
            air_speed: 100,
        }
    }
}

impl TableSettings {
    /// Read every setting from the device. Fails on the first error.
    pub fn fetch(dispatcher: &Dispatcher) -> Result<Self> {
        Ok(Self {
            table_mode: table_mode(dispatcher.get(Setting::TableMode)?)?,
            ai_difficulty: dispatcher.get(Setting::AiDifficulty)?,
            ai_active: dispatcher.get(Setting::AiState)? == ACTIVE,
            lighting: dispatcher.get(Setting::Lighting)?,
            air_speed: dispatcher.get(Setting::AirSpeed)?,
        })
    }

    /// Read every setting, keeping the default for any that cannot be read.
    pub fn fetch_or_default(dispatcher: &Dispatcher) -> Self {
        let defaults = Self::default();
        Self {
            table_mode: or_default(
                Setting::TableMode,
                dispatcher.get(Setting::TableMode).and_then(table_mode),
                defaults.table_mode,
            ),
            ai_difficulty: or_default(
                Setting::AiDifficulty,
                dispatcher.get(Setting::AiDifficulty),
                defaults.ai_difficulty,
            ),
            ai_active: or_default(
                Setting::AiState,
                dispatcher.get(Setting::AiState).map(|value| value == ACTIVE),
                defaults.ai_active,
            ),
            lighting: or_default(
                Setting::Lighting,
                dispatcher.get(Setting::Lighting),
                defaults.lighting,
            ),
            air_speed: or_default(
                Setting::AirSpeed,
                dispatcher.get(Setting::AirSpeed),
                defaults.air_speed,
            ),
        }
    }

    /// Write every setting to the device. The AI state is written last.
    pub fn apply(&self, dispatcher: &Dispatcher) -> Result<()> {
        let ai_state = if self.ai_active { ACTIVE } else { INACTIVE };
        let writes = [
            (Setting::TableMode, self.table_mode.value()),
            (Setting::AiDifficulty, self.ai_difficulty),
            (Setting::Lighting, self.lighting),
            (Setting::AirSpeed, self.air_speed),
            (Setting::AiState, ai_state),
        ];
        for (setting, value) in writes {
            dispatcher.set(setting, value)?;
            debug!(setting = setting.name(), value, "setting applied");
        }
        Ok(())
    }
}

fn table_mode(value: i64) -> Result<TableMode> {
    TableMode::from_value(value)
        .ok_or_else(|| PeerError::MalformedResponse(format!("unknown table mode {value}")))
}

fn or_default<T: std::fmt::Debug>(setting: Setting, read: Result<T>, default: T) -> T {
    read.unwrap_or_else(|err| {
        warn!(setting = setting.name(), error = %err, ?default, "using default setting");
        default
    })
}
