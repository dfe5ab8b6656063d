use std::{io::Write, path::PathBuf};

use crate::{
    args::{self, Color, Filter, Usage},
    compare::Baseline,
    format::log::{LogReport, MetricKind},
    table::Table,
};

const USAGES: &[Usage] = &[
    Baseline::USAGE,
    Color::USAGE,
    Filter::USAGE_BENCH,
    Filter::USAGE_BENCH_NOT,
    OutputFormat::USAGE,
    MetricKind::USAGE,
];

fn usage_short() -> String {
    format!(
        "\
Compare benchmark logs.

USAGE:
    ccperf compare [OPTIONS] <log-path> ...

TIP:
    use -h for short docs and --help for long docs

OPTIONS:
{options}
",
        options = Usage::short(USAGES),
    )
    .trim()
    .to_string()
}

fn usage_long() -> String {
    format!(
        "\
Compare benchmark logs.

USAGE:
    ccperf compare [OPTIONS] <log-path> ...

    This command takes one or more file paths to logs written by the
    'ccperf run' command (or by older tools writing the same format). For
    each metric, it prints a table with one row per benchmark in the first
    log and one column per log. Each cell shows the experiment's summary
    value along with its percent change relative to a control value.

    The first log decides which benchmarks are shown and in what order. A
    benchmark of the first log that's missing from any other log is an error.

TIP:
    use -h for short docs and --help for long docs

OPTIONS:
{options}
",
        options = Usage::long(USAGES),
    )
    .trim()
    .to_string()
}

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let config = Config::parse(p)?;
    let mut reports = vec![];
    for path in config.log_paths.iter() {
        let report = LogReport::from_path(path)?;
        log::debug!(
            "read {} benchmarks from '{}'",
            report.len(),
            report.title()
        );
        if report.is_empty() {
            log::warn!("no benchmarks found in '{}'", report.title());
        }
        reports.push(report);
    }

    let mut tables = vec![];
    for &kind in config.metrics().iter() {
        let baseline =
            config.baseline.unwrap_or_else(|| Baseline::default_for(kind));
        tables.push(Table::build(&reports, kind, baseline, &config.filter)?);
    }

    match config.format {
        OutputFormat::Table => {
            let mut stdout = std::io::stdout();
            for (i, table) in tables.iter().enumerate() {
                if i > 0 {
                    writeln!(stdout, "")?;
                }
                writeln!(stdout, "{}", table.caption())?;
                stdout.flush()?;
                table.write_text(config.color.elastic_stdout())?;
            }
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for (i, table) in tables.iter().enumerate() {
                table.write_csv(&mut wtr, i == 0)?;
            }
        }
    }
    Ok(())
}

/// The arguments for this 'compare' command parsed from CLI args.
#[derive(Debug, Default)]
struct Config {
    /// File paths to logs. The first is the baseline log.
    log_paths: Vec<PathBuf>,
    /// The benchmark name filter.
    filter: Filter,
    /// The metrics to print tables for, in order. Empty means all of them.
    metrics: Vec<MetricKind>,
    /// A baseline policy forced on every table. When absent, each metric
    /// uses its own default.
    baseline: Option<Baseline>,
    /// How to print the tables.
    format: OutputFormat,
    /// The user's color choice. We default to 'Auto'.
    color: Color,
}

impl Config {
    /// Parse 'compare' args from the given CLI parser.
    fn parse(p: &mut lexopt::Parser) -> anyhow::Result<Config> {
        use lexopt::Arg;

        let mut c = Config::default();
        while let Some(arg) = p.next()? {
            match arg {
                Arg::Value(v) => c.log_paths.push(PathBuf::from(v)),
                Arg::Short('h') => anyhow::bail!("{}", usage_short()),
                Arg::Long("help") => anyhow::bail!("{}", usage_long()),
                Arg::Short('b') | Arg::Long("baseline") => {
                    c.baseline = Some(args::parse(p, "-b/--baseline")?);
                }
                Arg::Long("color") => {
                    c.color = args::parse(p, "--color")?;
                }
                Arg::Short('f') | Arg::Long("filter") => {
                    c.filter.arg_whitelist(p, "-f/--filter")?;
                }
                Arg::Short('F') | Arg::Long("filter-not") => {
                    c.filter.arg_blacklist(p, "-F/--filter-not")?;
                }
                Arg::Long("format") => {
                    c.format = args::parse(p, "--format")?;
                }
                Arg::Short('m') | Arg::Long("metric") => {
                    let kind: MetricKind = args::parse(p, "-m/--metric")?;
                    if !c.metrics.contains(&kind) {
                        c.metrics.push(kind);
                    }
                }
                _ => return Err(arg.unexpected().into()),
            }
        }
        anyhow::ensure!(!c.log_paths.is_empty(), "no log file paths given");
        Ok(c)
    }

    /// The metrics to print, in order.
    fn metrics(&self) -> Vec<MetricKind> {
        if self.metrics.is_empty() {
            MetricKind::ALL.to_vec()
        } else {
            self.metrics.clone()
        }
    }
}

/// The output format of the comparison.
#[derive(Clone, Copy, Debug)]
enum OutputFormat {
    /// Aligned text tables, each preceded by a caption.
    Table,
    /// CSV records, one per row, across all tables.
    Csv,
}

impl OutputFormat {
    const USAGE: Usage = Usage::new(
        "--format <kind>",
        "One of: table, csv.",
        r#"
How to print the comparison (default: table).

With 'table', each metric gets an aligned text table preceded by a one line
caption describing the metric and the baseline policy in effect. With 'csv',
every table is written as CSV records with a single header record. The first
column of each record names the metric.
"#,
    );
}

impl Default for OutputFormat {
    fn default() -> OutputFormat {
        OutputFormat::Table
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<OutputFormat> {
        let format = match s {
            "table" => OutputFormat::Table,
            "csv" => OutputFormat::Csv,
            unknown => anyhow::bail!(
                "unrecognized output format '{}', must be table or csv",
                unknown,
            ),
        };
        Ok(format)
    }
}
