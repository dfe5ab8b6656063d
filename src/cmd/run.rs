use std::{
    io::Write,
    path::{Path, PathBuf},
    process::Command,
    time::Instant,
};

use {anyhow::Context, bstr::ByteSlice};

use crate::{
    args::{self, Usage},
    format::{
        log::{MetricKind, Peer},
        matrix::{Invocation, Matrix},
        timereport::TimeReport,
    },
    summary, util,
};

/// The binaries in a build directory that are stripped of debug info before
/// anything is measured.
const STRIPPED: &[&str] = &["xgcc", "cc1", "cc1plus", "collect2"];

const USAGES: &[Usage] = &[
    Usage::new(
        "-c, --config <path>",
        "A TOML file describing the benchmark matrix.",
        r#"
A TOML file describing the benchmark matrix.

The matrix names the compiler binary to run inside each build directory, the
source files to compile, the argument template, the optimization levels and
how many iterations to run for each metric. Every field is optional. Fields
that are absent take their value from the built-in matrix, which compiles
kdecore.cc, empty.c, big-code.c and influence.i from 'test-sources/' with
'xgcc -S <source> -g' at each of -O0, -O1, -O2, -O3 and -Os.
"#,
    ),
    Usage::new(
        "--list",
        "List benchmarks, but don't run them.",
        r#"
List benchmarks to run, but don't run them.

This prints the test name of every compiler invocation in the matrix, one per
line, in the order they would be run. No build directories are needed.
"#,
    ),
    Usage::new(
        "--memory-iters <number>",
        "Memory samples per build per benchmark.",
        r#"
The number of times each build's GC memory usage is recorded for each
benchmark. This overrides the matrix. Zero skips memory comparisons.
"#,
    ),
    Usage::new(
        "--no-strip",
        "Don't strip debug info from compiler binaries.",
        r#"
Don't strip debug info from compiler binaries.

By default, the xgcc, cc1, cc1plus and collect2 binaries in each build
directory are passed to 'strip' before anything is measured. Note that this
modifies the build directories in place.
"#,
    ),
    Usage::new(
        "--wallclock-iters <number>",
        "Timings per build per benchmark.",
        r#"
The number of times each build is timed for each benchmark. This overrides the
matrix. Zero skips wallclock comparisons.
"#,
    ),
];

fn usage_short() -> String {
    format!(
        "\
Benchmark two compiler builds and write a log to stdout.

USAGE:
    ccperf run [OPTIONS] <control-dir> <experiment-dir>

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
Benchmark two compiler builds and write a log to stdout.

USAGE:
    ccperf run [OPTIONS] <control-dir> <experiment-dir>

    Each directory should be a compiler build directory containing the
    compiler driver (by default, 'xgcc') along with the binaries it runs.
    Each is invoked as '<dir>/<binary> -B <dir> <args> ...'.

    For every benchmark in the matrix, this first compares wallclock time and
    then GC memory usage as reported by '-ftime-report'. Control and
    experiment runs are interleaved. Each comparison is written to stdout as a
    header, one line per sample and a summary block. Redirect stdout to a file
    and give it to 'ccperf compare' to build tables from it.

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
    let matrix = config.matrix()?;
    let invocations = matrix.invocations();
    let mut stdout = std::io::stdout();
    if config.list {
        for inv in invocations.iter() {
            writeln!(stdout, "{}", inv.test_name())?;
        }
        return Ok(());
    }

    let (control, experiment) = match (&config.control, &config.experiment) {
        (Some(c), Some(e)) => {
            (Build::new(Peer::Control, c), Build::new(Peer::Experiment, e))
        }
        _ => anyhow::bail!(
            "both a control and an experiment build directory are required"
        ),
    };
    let builds = [control, experiment];
    if matrix.strip {
        for build in builds.iter() {
            build.strip_binaries()?;
        }
    }

    let start = Instant::now();
    for inv in invocations.iter() {
        let test = inv.test_name();
        log::info!("measuring '{}'", test);
        compare(
            &mut stdout,
            MetricKind::Wallclock,
            &test,
            matrix.wallclock_iters,
            |peer| builds[peer_index(peer)].wallclock(inv),
        )?;
        compare(
            &mut stdout,
            MetricKind::Memory,
            &test,
            matrix.memory_iters,
            |peer| builds[peer_index(peer)].memory(inv),
        )?;
    }
    writeln!(stdout, "total time taken: {}", start.elapsed().as_secs_f64())?;
    Ok(())
}

/// Measure one metric of one benchmark `iters` times for each peer, writing
/// the header, every sample and the summary block to `wtr`.
///
/// Peers alternate within each iteration so that slow drift in machine load
/// affects both of them alike. When `iters` is zero, nothing is written.
fn compare<W: Write>(
    mut wtr: W,
    kind: MetricKind,
    test: &str,
    iters: usize,
    mut measure: impl FnMut(Peer) -> anyhow::Result<f64>,
) -> anyhow::Result<()> {
    if iters == 0 {
        return Ok(());
    }
    writeln!(wtr, "{}: {}", kind.header_prefix(), test)?;
    let mut samples = [vec![], vec![]];
    for i in 0..iters {
        for &peer in Peer::ALL.iter() {
            write!(wtr, "  iteration {}: {}: {}: ", i, peer, test)?;
            wtr.flush()?;
            let value = measure(peer)?;
            match kind {
                MetricKind::Wallclock => {
                    writeln!(wtr, "time_taken: {}", value)?
                }
                MetricKind::Memory => writeln!(wtr, "total_ggc: {} KB", value)?,
            }
            wtr.flush()?;
            samples[peer_index(peer)].push(value);
        }
    }
    let [control, experiment] = &samples;
    write!(wtr, "{}", summary::render(kind, test, control, experiment))?;
    writeln!(wtr, "")?;
    wtr.flush()?;
    Ok(())
}

fn peer_index(peer: Peer) -> usize {
    match peer {
        Peer::Control => 0,
        Peer::Experiment => 1,
    }
}

/// A compiler build directory playing the part of one peer.
#[derive(Clone, Debug)]
struct Build {
    peer: Peer,
    dir: PathBuf,
}

impl Build {
    fn new<P: AsRef<Path>>(peer: Peer, dir: P) -> Build {
        Build { peer, dir: dir.as_ref().to_path_buf() }
    }

    /// The path to the named binary inside this build.
    fn binary(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// The command for running the given invocation with this build.
    fn command(&self, inv: &Invocation) -> Command {
        let mut cmd = Command::new(self.binary(&inv.binary));
        cmd.arg("-B").arg(&self.dir).args(&inv.args);
        cmd
    }

    /// Time a single run of the given invocation, in seconds.
    fn wallclock(&self, inv: &Invocation) -> anyhow::Result<f64> {
        let elapsed = util::timed(&mut self.command(inv))
            .with_context(|| format!("{}: failed to time compiler", self.peer))?;
        Ok(elapsed.as_secs_f64())
    }

    /// Run the given invocation with '-ftime-report' and return its total GC
    /// memory, in KB.
    fn memory(&self, inv: &Invocation) -> anyhow::Result<f64> {
        let mut cmd = self.command(inv);
        cmd.arg("-ftime-report");
        let stderr = util::stderr(&mut cmd).with_context(|| {
            format!("{}: failed to run compiler", self.peer)
        })?;
        let report = TimeReport::from_stderr(&stderr.to_str_lossy());
        for (name, stats) in report.iter() {
            log::trace!("{}: {}: {:?}", self.peer, name, stats);
        }
        match report.total() {
            Some(total) => Ok(total.ggc),
            None => anyhow::bail!(
                "{}: no TOTAL line in '-ftime-report' output of {:?}",
                self.peer,
                cmd,
            ),
        }
    }

    /// Strip debug info from the compiler binaries in this build. Binaries
    /// that are missing, or that aren't regular files executable by others,
    /// are skipped.
    fn strip_binaries(&self) -> anyhow::Result<()> {
        for name in STRIPPED.iter() {
            let path = self.binary(name);
            let md = match std::fs::metadata(&path) {
                Ok(md) => md,
                Err(err) => {
                    log::warn!(
                        "{}: skipping strip of {}: {}",
                        self.peer,
                        path.display(),
                        err
                    );
                    continue;
                }
            };
            if !md.is_file() || !is_other_executable(&md) {
                log::debug!(
                    "{}: not stripping {} since it isn't an executable file",
                    self.peer,
                    path.display(),
                );
                continue;
            }
            let mut cmd = Command::new("strip");
            cmd.arg(&path);
            if let Err(err) = util::output(&mut cmd) {
                log::warn!(
                    "{}: failed to strip {}: {:#}",
                    self.peer,
                    path.display(),
                    err
                );
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn is_other_executable(md: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    md.permissions().mode() & 0o001 != 0
}

#[cfg(not(unix))]
fn is_other_executable(_: &std::fs::Metadata) -> bool {
    true
}

/// The arguments for this 'run' command parsed from CLI args.
#[derive(Debug, Default)]
struct Config {
    /// The control build directory.
    control: Option<PathBuf>,
    /// The experiment build directory.
    experiment: Option<PathBuf>,
    /// The matrix file, if one was given.
    matrix_path: Option<PathBuf>,
    /// Overrides for the matrix's iteration counts.
    wallclock_iters: Option<usize>,
    memory_iters: Option<usize>,
    /// Whether stripping was disabled on the command line.
    no_strip: bool,
    /// When set, benchmarks are listed instead of run.
    list: bool,
}

impl Config {
    /// Parse 'run' args from the given CLI parser.
    fn parse(p: &mut lexopt::Parser) -> anyhow::Result<Config> {
        use lexopt::{Arg, ValueExt};

        let mut c = Config::default();
        while let Some(arg) = p.next()? {
            match arg {
                Arg::Value(v) => {
                    if c.control.is_none() {
                        c.control = Some(PathBuf::from(v));
                    } else if c.experiment.is_none() {
                        c.experiment = Some(PathBuf::from(v));
                    } else {
                        anyhow::bail!(
                            "unexpected extra argument {:?}",
                            v.string()?
                        );
                    }
                }
                Arg::Short('h') => anyhow::bail!("{}", usage_short()),
                Arg::Long("help") => anyhow::bail!("{}", usage_long()),
                Arg::Short('c') | Arg::Long("config") => {
                    c.matrix_path = Some(PathBuf::from(p.value()?));
                }
                Arg::Long("list") => {
                    c.list = true;
                }
                Arg::Long("memory-iters") => {
                    c.memory_iters = Some(args::parse(p, "--memory-iters")?);
                }
                Arg::Long("no-strip") => {
                    c.no_strip = true;
                }
                Arg::Long("wallclock-iters") => {
                    c.wallclock_iters =
                        Some(args::parse(p, "--wallclock-iters")?);
                }
                _ => return Err(arg.unexpected().into()),
            }
        }
        Ok(c)
    }

    /// Load the matrix and apply any overrides given on the command line.
    fn matrix(&self) -> anyhow::Result<Matrix> {
        let mut matrix = match self.matrix_path {
            None => Matrix::default(),
            Some(ref path) => Matrix::from_path(path)?,
        };
        if let Some(iters) = self.wallclock_iters {
            matrix.wallclock_iters = iters;
        }
        if let Some(iters) = self.memory_iters {
            matrix.memory_iters = iters;
        }
        if self.no_strip {
            matrix.strip = false;
        }
        matrix.validate()?;
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use crate::format::log::{BenchmarkKey, LogReport, SummaryPair};

    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Config> {
        let mut p = lexopt::Parser::from_args(args.iter().copied());
        Config::parse(&mut p)
    }

    #[test]
    fn written_log_is_read_back() {
        let test = "xgcc -S empty.c -g -O2";
        let mut wtr = vec![];
        let mut times = vec![0.25, 0.5, 0.125, 0.75, 0.5, 1.0, 0.375, 0.625];
        times.reverse();
        compare(&mut wtr, MetricKind::Wallclock, test, 4, |_| {
            Ok(times.pop().unwrap())
        })
        .unwrap();
        compare(&mut wtr, MetricKind::Memory, test, 2, |peer| {
            Ok(match peer {
                Peer::Control => 1189.0,
                Peer::Experiment => 1077.0,
            })
        })
        .unwrap();
        let log = String::from_utf8(wtr).unwrap();
        assert!(log.starts_with(
            "compare_wallclock: xgcc -S empty.c -g -O2\n  \
             iteration 0: control: xgcc -S empty.c -g -O2: time_taken: 0.25\n  \
             iteration 0: experiment: xgcc -S empty.c -g -O2: time_taken: 0.5\n"
        ));
        assert!(log.contains(
            "  iteration 1: experiment: xgcc -S empty.c -g -O2: \
             total_ggc: 1077 KB\n"
        ));

        let report = LogReport::parse("run", &log).unwrap();
        assert_eq!(2, report.len());
        assert_eq!(
            Some(&SummaryPair { control: 0.125, experiment: 0.5 }),
            report.get(&BenchmarkKey::new(MetricKind::Wallclock, test)),
        );
        assert_eq!(
            Some(&SummaryPair { control: 1189.0, experiment: 1077.0 }),
            report.get(&BenchmarkKey::new(MetricKind::Memory, test)),
        );
    }

    #[test]
    fn zero_iterations_writes_nothing() {
        let mut wtr = vec![];
        compare(&mut wtr, MetricKind::Memory, "xgcc", 0, |_| {
            panic!("nothing should be measured")
        })
        .unwrap();
        assert!(wtr.is_empty());
    }

    #[test]
    fn measurement_error_stops_comparison() {
        let mut wtr = vec![];
        let result = compare(&mut wtr, MetricKind::Memory, "xgcc", 3, |_| {
            anyhow::bail!("no TOTAL line")
        });
        assert!(result.is_err());
    }

    #[test]
    fn build_command() {
        let build = Build::new(Peer::Control, "/build/control");
        let inv = Invocation {
            binary: "xgcc".to_string(),
            args: vec!["-S".to_string(), "empty.c".to_string()],
        };
        let cmd = build.command(&inv);
        assert_eq!(OsStr::new("/build/control/xgcc"), cmd.get_program());
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(vec!["-B", "/build/control", "-S", "empty.c"], args);
    }

    #[test]
    fn config_overrides_matrix() {
        let c = parse(&[
            "--wallclock-iters",
            "2",
            "--memory-iters",
            "0",
            "--no-strip",
            "ctrl",
            "exp",
        ])
        .unwrap();
        assert_eq!(Some(PathBuf::from("ctrl")), c.control);
        assert_eq!(Some(PathBuf::from("exp")), c.experiment);
        let m = c.matrix().unwrap();
        assert_eq!(2, m.wallclock_iters);
        assert_eq!(0, m.memory_iters);
        assert!(!m.strip);
    }

    #[test]
    fn config_rejects_no_iterations() {
        let c =
            parse(&["--wallclock-iters", "0", "--memory-iters", "0"]).unwrap();
        assert!(c.matrix().is_err());
    }

    #[test]
    fn config_rejects_extra_dirs() {
        assert!(parse(&["a", "b", "c"]).is_err());
    }
}
