use consolewire_session::{connect, Script};
use tracing::info;

use crate::cmd::driver::{finish, read_banner, run_commands, Tally};
use crate::cmd::RunArgs;
use crate::exit::{session_error, CliResult};
use crate::output::OutputFormat;

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let script = resolve_script(&args)?;
    let config = args.connect.session_config()?;
    let addr = args.connect.addr();

    let mut session = connect(&addr, config).map_err(|err| session_error("connect failed", err))?;
    let mut tally = Tally::default();

    read_banner(&mut session, format, &mut tally)?;
    run_commands(&mut session, script.iter(), format, &mut tally)?;

    info!(
        exchanges = tally.exchanges,
        timeouts = tally.timeouts,
        decode_errors = tally.decode_errors,
        malformed_json = tally.malformed_json,
        dropped = session.saw_drop(),
        "script finished"
    );
    finish(session);

    Ok(tally.exit_code())
}

fn resolve_script(args: &RunArgs) -> CliResult<Script> {
    if let Some(path) = &args.script {
        return Script::from_file(path).map_err(|err| session_error("script", err));
    }
    if !args.commands.is_empty() {
        return Ok(Script::new(args.commands.iter().cloned()));
    }
    Ok(Script::default())
}
