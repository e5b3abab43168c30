use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tablelink_peer::{Dispatcher, DispatcherConfig, PeerError};
use tracing::{info, warn};

use crate::cmd::{connect_with_retry, install_ctrlc_handler, parse_duration, WatchArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_goal, print_summary, OutputFormat};

/// Longest single wait for a goal, so Ctrl-C is noticed promptly.
const WAIT_SLICE: Duration = Duration::from_millis(100);

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let timeout = parse_duration(&args.timeout)?;
    let dispatcher = connect_with_retry(
        &args.path,
        DispatcherConfig {
            call_timeout: timeout,
            ..DispatcherConfig::default()
        },
        timeout,
    )?;

    let running = install_ctrlc_handler()?;
    play(&dispatcher, duration, &running, format)?;
    Ok(SUCCESS)
}

/// Start a game, print goals until `duration` elapses or `running` clears,
/// then end the game. Returns the number of goals printed.
pub fn play(
    dispatcher: &Dispatcher,
    duration: Duration,
    running: &AtomicBool,
    format: OutputFormat,
) -> CliResult<usize> {
    dispatcher
        .set_game_active(true)
        .map_err(|err| peer_error("start game failed", err))?;
    info!(?duration, "game started");

    let started = Instant::now();
    let deadline = started + duration;
    let mut goals = 0usize;

    while running.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match dispatcher.wait_unsolicited(remaining.min(WAIT_SLICE)) {
            Ok(Some(goal)) => {
                goals += 1;
                print_goal(&goal, format);
            }
            Ok(None) => {}
            Err(err) if err.is_data_error() => {
                warn!(error = %err, "ignoring bad unsolicited message");
            }
            Err(err @ PeerError::Disconnected(_)) => {
                return Err(peer_error("table disconnected", err));
            }
            Err(err) => return Err(peer_error("watch failed", err)),
        }
    }

    dispatcher
        .set_game_active(false)
        .map_err(|err| peer_error("stop game failed", err))?;
    info!(goals, "game stopped");
    print_summary(goals, started.elapsed(), format);
    Ok(goals)
}
