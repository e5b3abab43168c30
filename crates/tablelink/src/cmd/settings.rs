use tablelink_peer::{DispatcherConfig, TableSettings};

use crate::cmd::{connect_with_retry, parse_duration, SettingsArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_settings, OutputFormat};

pub fn run(args: SettingsArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let dispatcher = connect_with_retry(
        &args.path,
        DispatcherConfig {
            call_timeout: timeout,
            ..DispatcherConfig::default()
        },
        timeout,
    )?;

    let settings =
        TableSettings::fetch(&dispatcher).map_err(|err| peer_error("settings failed", err))?;
    print_settings(&settings, format);
    Ok(SUCCESS)
}
