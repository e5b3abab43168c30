use tablelink_peer::{spawn_local, DispatcherConfig, SimulatorConfig};
use tracing::info;

use crate::cmd::watch::play;
use crate::cmd::{install_ctrlc_handler, parse_duration, DemoArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: DemoArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let max_goal_delay = parse_duration(&args.max_goal_delay)?;
    let defaults = SimulatorConfig::default();

    let (dispatcher, simulator) = spawn_local(
        DispatcherConfig::default(),
        SimulatorConfig {
            min_goal_delay: defaults.min_goal_delay.min(max_goal_delay),
            max_goal_delay,
            seed: args.seed,
            ..defaults
        },
    )
    .map_err(|err| peer_error("demo setup failed", err))?;
    info!(seed = ?args.seed, "in-process table started");

    let running = install_ctrlc_handler()?;
    let goals = play(&dispatcher, duration, &running, format)?;

    let state = simulator
        .stop()
        .map_err(|err| peer_error("simulator failed", err))?;
    drop(dispatcher);
    info!(goals, final_state = ?state, "demo finished");
    Ok(SUCCESS)
}
