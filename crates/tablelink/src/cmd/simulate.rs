use std::sync::atomic::Ordering;

use tablelink_peer::{SimulatorConfig, SimulatorListener};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_duration, SimulateArgs};
use crate::exit::{peer_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: SimulateArgs) -> CliResult<i32> {
    let config = simulator_config(&args)?;
    let listener = SimulatorListener::bind(&args.path, config)
        .map_err(|err| peer_error("bind failed", err))?;

    let running = install_ctrlc_handler()?;
    info!(path = ?listener.path(), "simulated table ready");

    listener
        .serve_until(&running)
        .map_err(|err| peer_error("simulator failed", err))?;

    info!(
        connections = listener.connections(),
        interrupted = !running.load(Ordering::SeqCst),
        "simulated table stopped"
    );
    Ok(SUCCESS)
}

fn simulator_config(args: &SimulateArgs) -> CliResult<SimulatorConfig> {
    let min_goal_delay = parse_duration(&args.min_goal_delay)?;
    let max_goal_delay = parse_duration(&args.max_goal_delay)?;
    if min_goal_delay > max_goal_delay {
        return Err(CliError::new(
            USAGE,
            format!("--min-goal-delay {min_goal_delay:?} exceeds --max-goal-delay {max_goal_delay:?}"),
        ));
    }

    Ok(SimulatorConfig {
        poll_interval: parse_duration(&args.poll_interval)?,
        min_goal_delay,
        max_goal_delay,
        seed: args.seed,
        ..SimulatorConfig::default()
    })
}
