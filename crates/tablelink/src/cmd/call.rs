use tablelink_peer::DispatcherConfig;

use crate::cmd::{connect_with_retry, parse_duration, CallArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_response, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let config = DispatcherConfig {
        call_timeout: timeout,
        ..DispatcherConfig::default()
    };
    let dispatcher = connect_with_retry(&args.path, config, timeout)?;

    let command = args.command.trim();
    let response = dispatcher
        .call(command, args.args.trim())
        .map_err(|err| peer_error("call failed", err))?;

    print_response(command, &response, format);
    Ok(SUCCESS)
}
