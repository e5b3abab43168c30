use std::time::Duration;

use tablelink_frame::DEFAULT_MAX_FRAME_LEN;

use crate::state::DeviceState;

/// Controller-side behavior of a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// How long `call` waits for a correlated response. Default: 2s.
    pub call_timeout: Duration,
    /// Unsolicited frames kept before the oldest is dropped. Default: 256.
    pub unsolicited_capacity: usize,
    /// Maximum frame length in bytes, terminator included. Default: 100.
    pub max_frame_len: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(2),
            unsolicited_capacity: 256,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Device-side behavior of a [`PeerSimulator`](crate::PeerSimulator).
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// State the device starts in for every new connection.
    pub initial_state: DeviceState,
    /// Upper bound on how long one read blocks. Default: 100ms.
    pub poll_interval: Duration,
    /// Shortest delay between goals while a game is active. Default: 1s.
    ///
    /// When both goal delays are whole seconds the delay is drawn in whole
    /// seconds; otherwise it may fall anywhere in the range.
    pub min_goal_delay: Duration,
    /// Longest delay between goals while a game is active. Default: 5s.
    pub max_goal_delay: Duration,
    /// Seed for goal timing and content. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Maximum frame length in bytes, terminator included. Default: 100.
    pub max_frame_len: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_state: DeviceState::default(),
            poll_interval: Duration::from_millis(100),
            min_goal_delay: Duration::from_secs(1),
            max_goal_delay: Duration::from_secs(5),
            seed: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}
