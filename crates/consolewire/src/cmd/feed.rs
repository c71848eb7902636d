use consolewire_session::{connect, Script};
use tracing::info;

use crate::cmd::driver::{finish, read_banner, report, run_commands, stalled, Tally};
use crate::cmd::FeedArgs;
use crate::exit::{session_error, CliResult};
use crate::output::OutputFormat;

pub fn run(args: FeedArgs, format: OutputFormat) -> CliResult<i32> {
    let script = if args.commands.is_empty() {
        Script::payload_check()
    } else {
        Script::new(args.commands.iter().cloned())
    };
    let config = args.connect.session_config()?;
    let mode = config.extract_mode;
    let addr = args.connect.addr();

    let mut session = connect(&addr, config).map_err(|err| session_error("connect failed", err))?;
    let mut tally = Tally::default();

    read_banner(&mut session, format, &mut tally)?;

    'rounds: for round in 1..=args.rounds {
        info!(round, rounds = args.rounds, "starting feed round");
        for file in &args.files {
            if stalled(&session) {
                break 'rounds;
            }
            let label = file.display().to_string();
            let result = session.send_file(file);
            report(&label, result, mode, format, &mut tally)?;
            run_commands(&mut session, script.iter(), format, &mut tally)?;
        }
    }

    info!(
        exchanges = tally.exchanges,
        timeouts = tally.timeouts,
        decode_errors = tally.decode_errors,
        dropped = session.saw_drop(),
        "feed finished"
    );
    finish(session);

    Ok(tally.exit_code())
}
