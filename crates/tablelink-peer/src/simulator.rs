//! Simulated table device.
//!
//! The simulator answers every request on the link and, while a game is
//! running, reports goals on its own at random intervals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tablelink_frame::{
    Frame, FrameConfig, FrameError, FrameReader, FrameWriter, Message, Setting, Side, Token,
    UNSOLICITED_ID,
};
use tablelink_transport::{LinkStream, TransportError};
use tracing::{debug, info, warn};

use crate::config::{DispatcherConfig, SimulatorConfig};
use crate::dispatcher::Dispatcher;
use crate::error::{PeerError, Result};
use crate::state::DeviceState;

/// Reply to a frame whose checksum does not match its body.
pub const ERROR_NONMATCHING_CHECKSUMS: &str = "ERROR! NONMATCHING CHECKSUMS";

/// Reply to a token outside the catalog, or one the controller may not send.
pub const ERROR_UNRECOGNIZED_MESSAGE: &str = "ERROR! UNRECOGNIZED MESSAGE";

/// Reply to a setter whose argument is not an integer.
pub const ERROR_INVALID_ARGUMENT: &str = "ERROR! INVALID ARGUMENT";

const MAX_GOAL_SPEED: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Inactive,
    Active { next_goal: Instant },
}

/// Device end of the table link.
pub struct PeerSimulator {
    reader: FrameReader<LinkStream>,
    writer: FrameWriter<LinkStream>,
    state: DeviceState,
    phase: Phase,
    rng: StdRng,
    config: SimulatorConfig,
}

impl PeerSimulator {
    /// Wrap a connected link. Reads block for at most `poll_interval`.
    pub fn new(stream: LinkStream, config: SimulatorConfig) -> Result<Self> {
        let frame_config = FrameConfig {
            max_frame_len: config.max_frame_len,
            read_timeout: Some(config.poll_interval),
            write_timeout: None,
        };
        let reader = FrameReader::with_config_link(stream.try_clone()?, frame_config.clone())?;
        let writer = FrameWriter::with_config_link(stream, frame_config)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut simulator = Self {
            reader,
            writer,
            state: config.initial_state.clone(),
            phase: Phase::Inactive,
            rng,
            config,
        };
        if simulator.state.game_active {
            simulator.phase = simulator.schedule_goal();
        }
        Ok(simulator)
    }

    /// Current device state.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// True while a game is running and goals are being reported.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active { .. })
    }

    /// Run one poll cycle: report a due goal, then handle at most one frame.
    ///
    /// Returns `Ok(false)` once the controller has closed the link.
    pub fn step(&mut self) -> Result<bool> {
        if let Phase::Active { next_goal } = self.phase {
            if Instant::now() >= next_goal {
                let goal = self.report_goal();
                if !still_open(goal)? {
                    return Ok(false);
                }
                self.phase = self.schedule_goal();
            }
        }

        match self.reader.read_frame() {
            Ok(frame) => {
                let reply = self.handle(frame);
                still_open(reply)
            }
            Err(err) if err.is_timeout() => Ok(true),
            Err(err) if err.is_malformed() => match err.frame_id() {
                Some(id) => {
                    warn!(id, error = %err, "garbled checksum field");
                    let reply = self.send_reply(id, ERROR_NONMATCHING_CHECKSUMS.to_string());
                    still_open(reply)
                }
                None => {
                    warn!(error = %err, "dropping undecodable frame");
                    Ok(true)
                }
            },
            Err(FrameError::ConnectionClosed) => {
                debug!("controller closed the link");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Serve the link until `running` clears or the controller disconnects.
    pub fn run_until(mut self, running: &AtomicBool) -> Result<DeviceState> {
        while running.load(Ordering::SeqCst) {
            if !self.step()? {
                break;
            }
        }
        Ok(self.state)
    }

    fn handle(&mut self, frame: Frame) -> Result<()> {
        debug!(id = frame.id, body = %frame.body, "request received");
        let reply = self.reply_body(&frame);
        self.send_reply(frame.id, reply)
    }

    fn send_reply(&mut self, id: u8, body: String) -> Result<()> {
        let message = Message::new(id, body)?;
        self.writer.send(&message)?;
        debug!(id, body = message.body(), "reply sent");
        Ok(())
    }

    fn reply_body(&mut self, frame: &Frame) -> String {
        if !frame.validate() {
            warn!(id = frame.id, received = frame.checksum, "checksum mismatch");
            return ERROR_NONMATCHING_CHECKSUMS.to_string();
        }

        match Token::parse(frame.token()) {
            Some(token @ Token::Get(setting)) => {
                format!("{token}:{}", self.state.value(setting))
            }
            Some(token @ Token::Set(setting)) => {
                match frame.args().and_then(|arg| arg.trim().parse::<i64>().ok()) {
                    Some(value) => {
                        self.apply(setting, value);
                        token.to_string()
                    }
                    None => ERROR_INVALID_ARGUMENT.to_string(),
                }
            }
            Some(Token::GoalData) | None => ERROR_UNRECOGNIZED_MESSAGE.to_string(),
        }
    }

    fn apply(&mut self, setting: Setting, value: i64) {
        let stored = self.state.set(setting, value);
        if stored != value {
            debug!(setting = setting.name(), requested = value, stored, "value clamped");
        }
        if setting != Setting::GameState {
            return;
        }

        match (self.phase, self.state.game_active) {
            (Phase::Inactive, true) => {
                self.phase = self.schedule_goal();
                info!("game started");
            }
            (Phase::Active { .. }, false) => {
                self.phase = Phase::Inactive;
                info!("game stopped");
            }
            _ => {}
        }
    }

    fn schedule_goal(&mut self) -> Phase {
        let (low, high) = if self.config.min_goal_delay <= self.config.max_goal_delay {
            (self.config.min_goal_delay, self.config.max_goal_delay)
        } else {
            (self.config.max_goal_delay, self.config.min_goal_delay)
        };
        let delay = goal_delay(&mut self.rng, low, high);
        debug!(?delay, "next goal scheduled");
        Phase::Active {
            next_goal: Instant::now() + delay,
        }
    }

    fn report_goal(&mut self) -> Result<()> {
        let side = if self.rng.gen_bool(0.5) {
            Side::Ai
        } else {
            Side::PlayerOne
        };
        let speed = self.rng.gen_range(1..=MAX_GOAL_SPEED);
        let body = format!("{}:{},{speed}", Token::GoalData, side.value());
        self.writer.send(&Message::new(UNSOLICITED_ID, body)?)?;
        info!(?side, speed, "goal reported");
        Ok(())
    }
}

/// Whole seconds when both bounds are whole seconds, as a real table sleeps;
/// any duration in range otherwise.
fn goal_delay(rng: &mut StdRng, low: Duration, high: Duration) -> Duration {
    if low.subsec_nanos() == 0 && high.subsec_nanos() == 0 {
        Duration::from_secs(rng.gen_range(low.as_secs()..=high.as_secs()))
    } else {
        rng.gen_range(low..=high)
    }
}

/// `Ok(false)` when a write failed because the controller went away.
fn still_open(written: Result<()>) -> Result<bool> {
    match written {
        Ok(()) => Ok(true),
        Err(PeerError::Frame(FrameError::ConnectionClosed)) => {
            debug!("controller closed the link mid-write");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// A simulator running on its own thread.
///
/// Dropping the handle stops the simulator and waits for it.
pub struct SimulatorHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<DeviceState>>>,
}

impl SimulatorHandle {
    /// True while the simulator thread has not exited.
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Stop the simulator and return its final state.
    pub fn stop(mut self) -> Result<DeviceState> {
        self.join()
    }

    fn join(&mut self) -> Result<DeviceState> {
        self.running.store(false, Ordering::SeqCst);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| {
                PeerError::Disconnected("simulator thread panicked".to_string())
            })?,
            None => Err(PeerError::Disconnected(
                "simulator already stopped".to_string(),
            )),
        }
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            if let Err(err) = self.join() {
                warn!(error = %err, "simulator stopped with error");
            }
        }
    }
}

/// Run a simulator on a background thread.
pub fn spawn(stream: LinkStream, config: SimulatorConfig) -> Result<SimulatorHandle> {
    let simulator = PeerSimulator::new(stream, config)?;
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let thread = thread::Builder::new()
        .name("tablelink-sim".to_string())
        .spawn(move || simulator.run_until(&flag))
        .map_err(TransportError::from)?;

    Ok(SimulatorHandle {
        running,
        thread: Some(thread),
    })
}

/// Connect a dispatcher to a simulator over an in-process link.
pub fn spawn_local(
    dispatcher_config: DispatcherConfig,
    simulator_config: SimulatorConfig,
) -> Result<(Dispatcher, SimulatorHandle)> {
    let (controller, device) = LinkStream::pair()?;
    let simulator = spawn(device, simulator_config)?;
    let dispatcher = Dispatcher::new(controller, dispatcher_config)?;
    Ok((dispatcher, simulator))
}
