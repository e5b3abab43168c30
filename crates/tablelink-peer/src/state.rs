use tablelink_frame::catalog::{ACTIVE, INACTIVE};
use tablelink_frame::{Setting, TableMode};

/// Settings held by a simulated device.
///
/// Every field stays inside the range of its [`Setting`]; writes go through
/// [`DeviceState::set`], which clamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub game_active: bool,
    pub ai_active: bool,
    pub ai_difficulty: i64,
    pub table_mode: TableMode,
    pub lighting: i64,
    pub air_speed: i64,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            game_active: false,
            ai_active: false,
            ai_difficulty: 1,
            table_mode: TableMode::Standard,
            lighting: 0,
            air_speed: 50,
        }
    }
}

impl DeviceState {
    /// Current wire value of a setting.
    pub fn value(&self, setting: Setting) -> i64 {
        match setting {
            Setting::AiDifficulty => self.ai_difficulty,
            Setting::AiState => flag(self.ai_active),
            Setting::GameState => flag(self.game_active),
            Setting::TableMode => self.table_mode.value(),
            Setting::Lighting => self.lighting,
            Setting::AirSpeed => self.air_speed,
        }
    }

    /// Store a setting, clamped into its range. Returns the stored value.
    pub fn set(&mut self, setting: Setting, value: i64) -> i64 {
        let value = setting.normalize(value);
        match setting {
            Setting::AiDifficulty => self.ai_difficulty = value,
            Setting::AiState => self.ai_active = value == ACTIVE,
            Setting::GameState => self.game_active = value == ACTIVE,
            Setting::TableMode => {
                self.table_mode = TableMode::from_value(value).unwrap_or_default();
            }
            Setting::Lighting => self.lighting = value,
            Setting::AirSpeed => self.air_speed = value,
        }
        value
    }
}

fn flag(active: bool) -> i64 {
    if active {
        ACTIVE
    } else {
        INACTIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_inside_every_range() {
        let state = DeviceState::default();
        for setting in Setting::ALL {
            assert!(setting.range().contains(&state.value(setting)));
        }
        assert!(!state.game_active);
    }

    #[test]
    fn set_clamps_and_reports_stored_value() {
        let mut state = DeviceState::default();
        assert_eq!(state.set(Setting::AirSpeed, 150), 100);
        assert_eq!(state.value(Setting::AirSpeed), 100);

        assert_eq!(state.set(Setting::AiDifficulty, -3), 1);
        assert_eq!(state.set(Setting::TableMode, 9), 2);
        assert_eq!(state.table_mode, TableMode::Ai);

        assert_eq!(state.set(Setting::GameState, 4), ACTIVE);
        assert!(state.game_active);
        assert_eq!(state.set(Setting::GameState, 0), INACTIVE);
        assert!(!state.game_active);
    }

    #[test]
    fn every_setting_reads_back_what_was_written() {
        let mut state = DeviceState::default();
        for setting in Setting::ALL {
            let target = *setting.range().end();
            state.set(setting, target);
            assert_eq!(state.value(setting), target, "{setting:?}");
        }
    }
}
