use std::io::Write;

#[macro_use]
mod macros;

// helpers and other things
mod args;
mod compare;
mod error;
mod format;
mod stat;
mod summary;
mod table;
mod util;

// sub-commands
mod cmd;

const USAGE: &'static str = "\
A tool for benchmarking a compiler build against another and comparing logs.

USAGE:
    ccperf <command> ...

COMMANDS:
    compare   Compare benchmark logs as tables of percent changes.
    run       Benchmark two compiler builds and write a log to stdout.
    version   Print the version of ccperf.

";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    )
    .init();
    if let Err(err) = run(&mut lexopt::Parser::from_env()) {
        if std::env::var("RUST_BACKTRACE").map_or(false, |v| v == "1") {
            writeln!(&mut std::io::stderr(), "{:?}", err).unwrap();
        } else {
            writeln!(&mut std::io::stderr(), "{:#}", err).unwrap();
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let name = args::next_as_command(USAGE, p)?;
    match &*name {
        "compare" => cmd::compare::run(p),
        "run" => cmd::run::run(p),
        "version" => cmd::version::run(p),
        unk => anyhow::bail!("unrecognized command '{}'", unk),
    }
}
