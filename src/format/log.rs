/*!
This module provides a parser for the free-text logs written while comparing
two compiler builds, and the ordered collection of per-benchmark results that
parsing produces.

A log is a sequence of benchmark blocks. Each block begins with a header line
naming the metric and the compiler invocation being measured, and is followed
by some mixture of per-iteration sample lines and precomputed summary lines.
Older tools wrote only the summary lines, newer ones write both, and
everything else in a log (banners, significance notes, blank lines) is noise
that we skip. For example:

```text
compare_wallclock: xgcc -S kdecore.cc -g -O0
  iteration 0: control: xgcc -S kdecore.cc -g -O0: time_taken: 1.2049
  iteration 0: experiment: xgcc -S kdecore.cc -g -O0: time_taken: 1.2113
### Wallclock time for xgcc -S kdecore.cc -g -O0 ###
Min: 1.2049 -> 1.2113: 1.0053x slower
```

Each line is classified into a `Record` by trying an ordered list of rules,
where the first rule to match wins. Records then drive a small state machine
that tracks the benchmark currently being read.
*/

use std::{collections::BTreeMap, path::Path};

use anyhow::Context;

use crate::{args::Usage, error::Error, stat};

/// The two things we measure about a compiler invocation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum MetricKind {
    /// Elapsed wallclock time of the whole invocation, in seconds.
    Wallclock,
    /// Total GC-managed memory reported by '-ftime-report', in KB.
    Memory,
}

impl MetricKind {
    pub const ALL: &'static [MetricKind] =
        &[MetricKind::Wallclock, MetricKind::Memory];

    pub const USAGE: Usage = Usage::new(
        "-m, --metric <kind>",
        "One of: wallclock, memory.",
        r#"
Only show results for the given metric.

By default, a table is printed for each metric: first wallclock time, then
GC memory usage. This flag may be given multiple times.
"#,
    );

    /// The literal that begins header lines for this metric in a log.
    pub fn header_prefix(&self) -> &'static str {
        match *self {
            MetricKind::Wallclock => "compare_wallclock",
            MetricKind::Memory => "compare_memory",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let nice = match *self {
            MetricKind::Wallclock => "wallclock",
            MetricKind::Memory => "memory",
        };
        write!(f, "{}", nice)
    }
}

impl std::str::FromStr for MetricKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<MetricKind> {
        let kind = match s {
            "wallclock" | "compare_wallclock" => MetricKind::Wallclock,
            "memory" | "compare_memory" => MetricKind::Memory,
            unknown => {
                anyhow::bail!(
                    "unrecognized metric '{}', must be \
                     one of wallclock or memory.",
                    unknown,
                )
            }
        };
        Ok(kind)
    }
}

/// One of the two compiler builds being compared.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Peer {
    Control,
    Experiment,
}

impl Peer {
    pub const ALL: &'static [Peer] = &[Peer::Control, Peer::Experiment];

    pub fn name(&self) -> &'static str {
        match *self {
            Peer::Control => "control",
            Peer::Experiment => "experiment",
        }
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Peer {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Peer> {
        Ok(match s {
            "control" => Peer::Control,
            "experiment" => Peer::Experiment,
            unknown => anyhow::bail!("unrecognized peer '{}'", unknown),
        })
    }
}

/// The identity of a single measured scenario: what was measured, and the
/// normalized compiler invocation it was measured for.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BenchmarkKey {
    pub kind: MetricKind,
    pub test: String,
}

impl BenchmarkKey {
    pub fn new<T: Into<String>>(kind: MetricKind, test: T) -> BenchmarkKey {
        BenchmarkKey { kind, test: test.into() }
    }

    /// The label shown for this benchmark in comparison tables. This is the
    /// test name with its leading binary name removed, along with a
    /// compilation mode flag ('-S', '-c' or '-E') directly after it, since
    /// those are shared by every row of a table.
    pub fn label(&self) -> &str {
        let rest = match self.test.split_once(' ') {
            Some((_, rest)) => rest,
            None => return &self.test,
        };
        match rest.split_once(' ') {
            Some(("-S" | "-c" | "-E", args)) => args,
            _ => rest,
        }
    }
}

impl std::fmt::Display for BenchmarkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.header_prefix(), self.test)
    }
}

/// The final scalar for each peer of one benchmark.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SummaryPair {
    pub control: f64,
    pub experiment: f64,
}

/// The results recovered from a single log, in the order in which each
/// benchmark first appeared in it.
#[derive(Clone, Debug)]
pub struct LogReport {
    title: String,
    entries: Vec<(BenchmarkKey, SummaryPair)>,
    /// Map from key to its index in 'entries'.
    index: BTreeMap<BenchmarkKey, usize>,
}

impl LogReport {
    /// Read and parse the log at the given path. The path itself becomes the
    /// title of the report.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<LogReport> {
        let path = path.as_ref();
        let title = match path.to_str() {
            Some(title) => title,
            None => anyhow::bail!(
                "{}: log path is not valid UTF-8",
                path.display()
            ),
        };
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read log {}", path.display()))?;
        LogReport::parse(title, &data)
            .with_context(|| format!("failed to parse log {}", path.display()))
    }

    /// Parse the given log contents in a single pass.
    ///
    /// Lines that aren't recognized are ignored. This only fails when the
    /// log is structurally broken (a summary line before any header) or when
    /// a benchmark's samples can't be summarized.
    pub fn parse(title: &str, text: &str) -> anyhow::Result<LogReport> {
        let mut report = LogReport {
            title: title.to_string(),
            entries: vec![],
            index: BTreeMap::new(),
        };
        let mut state = State::NoActiveKey;
        for (i, line) in text.lines().enumerate() {
            let lineno = i + 1;
            match Record::classify(line) {
                Record::Header(key) => {
                    if let State::Active(block) = state {
                        block.finish(&mut report)?;
                    }
                    log::trace!("{}:{}: starting '{}'", title, lineno, key);
                    state = State::Active(Block::new(key, lineno));
                }
                Record::Iteration {
                    iteration,
                    peer,
                    sample,
                    test,
                    value,
                } => {
                    match state {
                        State::NoActiveKey => {
                            log::debug!(
                                "{}:{}: ignoring iteration {} of '{}' for \
                                 {} since no benchmark header precedes it",
                                title,
                                lineno,
                                iteration,
                                test,
                                peer,
                            );
                        }
                        State::Active(ref mut block) => {
                            block.push(peer, sample, value)
                        }
                    }
                }
                Record::Summary(pair) => match state {
                    State::NoActiveKey => {
                        return Err(Error::format(lineno, line.trim()).into());
                    }
                    State::Active(ref mut block) => {
                        block.summarized = true;
                        report.insert(block.key.clone(), pair);
                    }
                },
                Record::Unrecognized => {}
            }
        }
        if let State::Active(block) = state {
            block.finish(&mut report)?;
        }
        Ok(report)
    }

    /// The title of this report. For reports read from a file, this is the
    /// file's path.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn get(&self, key: &BenchmarkKey) -> Option<&SummaryPair> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Iterate over every benchmark in this report, in log order.
    pub fn iter(&self) -> impl Iterator<Item = (&BenchmarkKey, &SummaryPair)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterate over the benchmarks of one metric, in log order.
    pub fn iter_kind(
        &self,
        kind: MetricKind,
    ) -> impl Iterator<Item = (&BenchmarkKey, &SummaryPair)> {
        self.iter().filter(move |(k, _)| k.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record the pair for the given key. A key seen before keeps its
    /// original position but takes the new pair.
    fn insert(&mut self, key: BenchmarkKey, pair: SummaryPair) {
        use std::collections::btree_map::Entry;

        match self.index.entry(key) {
            Entry::Occupied(e) => {
                self.entries[*e.get()].1 = pair;
            }
            Entry::Vacant(e) => {
                let idx = self.entries.len();
                self.entries.push((e.key().clone(), pair));
                e.insert(idx);
            }
        }
    }
}

/// The state of the parser between lines.
#[derive(Debug)]
enum State {
    /// No header has been seen yet.
    NoActiveKey,
    /// Samples are being collected for the benchmark of the last header.
    Active(Block),
}

/// The benchmark currently being read, along with the raw samples collected
/// for it so far.
#[derive(Debug)]
struct Block {
    key: BenchmarkKey,
    /// The line number of the header that started this block.
    line: usize,
    control: Vec<f64>,
    experiment: Vec<f64>,
    /// Set once a summary line has been seen for this block. When set, the
    /// summary line is authoritative and the raw samples are not used.
    summarized: bool,
    /// Set once a 'total_ggc' sample has been seen. Such series summarize to
    /// their peak instead of their median.
    peak: bool,
}

impl Block {
    fn new(key: BenchmarkKey, line: usize) -> Block {
        Block {
            key,
            line,
            control: vec![],
            experiment: vec![],
            summarized: false,
            peak: false,
        }
    }

    fn push(&mut self, peer: Peer, sample: Sample, value: f64) {
        if sample == Sample::TotalGgc {
            self.peak = true;
        }
        match peer {
            Peer::Control => self.control.push(value),
            Peer::Experiment => self.experiment.push(value),
        }
    }

    /// Close this block, adding its summary to the report if it has one.
    ///
    /// A block with a summary line has already been recorded. A block
    /// without samples for both peers records nothing.
    fn finish(self, report: &mut LogReport) -> anyhow::Result<()> {
        if self.summarized {
            return Ok(());
        }
        if self.control.is_empty() || self.experiment.is_empty() {
            log::debug!(
                "{}:{}: '{}' has {} control and {} experiment samples, \
                 skipping",
                report.title,
                self.line,
                self.key,
                self.control.len(),
                self.experiment.len(),
            );
            return Ok(());
        }
        let summarize = |xs: &[f64]| -> Result<f64, Error> {
            if self.peak {
                // OK because both series were checked to be non-empty.
                Ok(stat::max(xs).unwrap())
            } else {
                stat::median(xs)
            }
        };
        let context = || {
            format!(
                "line {}: failed to summarize samples for '{}'",
                self.line, self.key,
            )
        };
        let pair = SummaryPair {
            control: summarize(&self.control).with_context(context)?,
            experiment: summarize(&self.experiment).with_context(context)?,
        };
        report.insert(self.key, pair);
        Ok(())
    }
}

/// A single classified line of a log.
#[derive(Clone, Debug, PartialEq)]
pub enum Record<'a> {
    /// The start of a new benchmark, e.g.,
    /// 'compare_memory: xgcc -S empty.c -g -O2'.
    Header(BenchmarkKey),
    /// One sample for one peer, e.g.,
    /// 'iteration 3: control: xgcc -S empty.c -g -O2: time_taken: 0.0123'.
    Iteration {
        iteration: u64,
        peer: Peer,
        sample: Sample,
        test: &'a str,
        value: f64,
    },
    /// A precomputed summary for both peers, e.g.,
    /// 'Mem max: 1189.000 -> 1077.000: 1.1040x smaller'.
    Summary(SummaryPair),
    /// Anything else.
    Unrecognized,
}

/// The kind of value an iteration line carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sample {
    /// 'time_taken: <seconds>'
    TimeTaken,
    /// 'total_ggc: <n> KB'
    TotalGgc,
}

/// A rule for recognizing one shape of line.
type Rule = for<'a> fn(&'a str) -> Option<Record<'a>>;

/// The rules tried against every line, in priority order.
const RULES: &[Rule] = &[header, iteration, summary];

impl<'a> Record<'a> {
    /// Classify the given line using the first rule that recognizes it.
    pub fn classify(line: &'a str) -> Record<'a> {
        let line = line.trim_end();
        RULES.iter().find_map(|rule| rule(line)).unwrap_or(Record::Unrecognized)
    }
}

fn header(line: &str) -> Option<Record<'_>> {
    let re = regex!(
        r"^(?P<kind>compare_wallclock|compare_memory): (?P<label>.+)$"
    );
    let caps = re.captures(line)?;
    let kind = caps["kind"].parse().ok()?;
    Some(Record::Header(BenchmarkKey::new(kind, normalize_label(&caps["label"]))))
}

fn iteration(line: &str) -> Option<Record<'_>> {
    let re = regex!(
        r"(?x)
            ^\s*
            iteration\x20(?P<iteration>[0-9]+):\x20
            (?P<peer>control|experiment):\x20
            (?P<test>.+):\x20
            (?:
                time_taken:\x20(?P<time>
                    [-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?
                )
                |
                total_ggc:\x20(?P<ggc>
                    [-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?
                )\x20KB
            )
            $
        ",
    );
    let caps = re.captures(line)?;
    let (sample, value) = match caps.name("time") {
        Some(m) => (Sample::TimeTaken, m),
        None => (Sample::TotalGgc, caps.name("ggc")?),
    };
    Some(Record::Iteration {
        iteration: caps["iteration"].parse().ok()?,
        peer: caps["peer"].parse().ok()?,
        sample,
        test: caps.name("test")?.as_str(),
        value: value.as_str().parse().ok()?,
    })
}

fn summary(line: &str) -> Option<Record<'_>> {
    let re = regex!(
        r"(?x)
            ^(?:Min|Mem\x20max):\x20
            (?P<control>
                [-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?
            )
            \x20->\x20
            (?P<experiment>
                [-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?
            )
            :(?:\x20|$)
        ",
    );
    let caps = re.captures(line)?;
    Some(Record::Summary(SummaryPair {
        control: caps["control"].parse().ok()?,
        experiment: caps["experiment"].parse().ok()?,
    }))
}

/// Normalize a raw header label into a test name.
///
/// Directory prefixes of the test sources are dropped, and the older
/// `<binary> '<args>'` form (arguments quoted as one string) is rewritten to
/// the plain `<binary> <args>` form used by newer logs.
fn normalize_label(raw: &str) -> String {
    let label = raw.replace("test-sources/", "");
    let re = regex!(r"^(?P<binary>[^\s']+) '(?P<args>.*)'$");
    match re.captures(&label) {
        Some(caps) => format!("{} {}", &caps["binary"], &caps["args"]),
        None => label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallclock(test: &str) -> BenchmarkKey {
        BenchmarkKey::new(MetricKind::Wallclock, test)
    }

    fn memory(test: &str) -> BenchmarkKey {
        BenchmarkKey::new(MetricKind::Memory, test)
    }

    fn pair(control: f64, experiment: f64) -> SummaryPair {
        SummaryPair { control, experiment }
    }

    fn parse(text: &str) -> LogReport {
        LogReport::parse("test", text).unwrap()
    }

    fn parse_err(text: &str) -> Error {
        let err = LogReport::parse("test", text).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(err) => err.clone(),
            None => panic!("expected typed error, got: {:#}", err),
        }
    }

    #[test]
    fn classify_header() {
        assert_eq!(
            Record::Header(wallclock("xgcc -S kdecore.cc -g -O0")),
            Record::classify(
                "compare_wallclock: xgcc -S test-sources/kdecore.cc -g -O0"
            ),
        );
        assert_eq!(
            Record::Header(memory("xgcc -c empty.c -g")),
            Record::classify("compare_memory: xgcc '-c test-sources/empty.c -g'"),
        );
        assert_eq!(
            Record::Unrecognized,
            Record::classify("compare_cpu: xgcc -c empty.c")
        );
    }

    #[test]
    fn classify_iteration() {
        assert_eq!(
            Record::Iteration {
                iteration: 3,
                peer: Peer::Experiment,
                sample: Sample::TimeTaken,
                test: "xgcc -S empty.c -g -O2",
                value: 0.0123,
            },
            Record::classify(
                "iteration 3: experiment: xgcc -S empty.c -g -O2: \
                 time_taken: 0.0123"
            ),
        );
        assert_eq!(
            Record::Iteration {
                iteration: 0,
                peer: Peer::Control,
                sample: Sample::TimeTaken,
                test: "xgcc '-c test-sources/empty.c -g'",
                value: 1e-05,
            },
            Record::classify(
                "  iteration 0: control: xgcc '-c test-sources/empty.c -g': \
                 time_taken: 1e-05"
            ),
        );
        assert_eq!(
            Record::Iteration {
                iteration: 2,
                peer: Peer::Control,
                sample: Sample::TotalGgc,
                test: "xgcc -S empty.c -g -O2",
                value: 1189.0,
            },
            Record::classify(
                "  iteration 2: control: xgcc -S empty.c -g -O2: \
                 total_ggc: 1189.0 KB"
            ),
        );
        assert_eq!(
            Record::Unrecognized,
            Record::classify(
                "iteration 3: baseline: xgcc -S empty.c: time_taken: 0.1"
            ),
        );
        assert_eq!(
            Record::Unrecognized,
            Record::classify("iteration 3: control: xgcc -S empty.c: ")
        );
    }

    #[test]
    fn classify_summary() {
        assert_eq!(
            Record::Summary(pair(0.25, 0.3)),
            Record::classify("Min: 0.25 -> 0.3: 1.2000x slower"),
        );
        assert_eq!(
            Record::Summary(pair(1189.0, 1077.0)),
            Record::classify("Mem max: 1189.000 -> 1077.000: 1.1040x smaller"),
        );
        // Other statistics in the same block are noise.
        assert_eq!(
            Record::Unrecognized,
            Record::classify("Avg: 0.25 -> 0.3: 1.2000x slower"),
        );
        // The description may be empty, and trailing space is trimmed.
        assert_eq!(
            Record::Summary(pair(1.0, 2.0)),
            Record::classify("Min: 1.0 -> 2.0: "),
        );
        assert_eq!(
            Record::Summary(pair(1.0, 2.0)),
            Record::classify("Min: 1.0 -> 2.0:"),
        );
        assert_eq!(
            Record::Unrecognized,
            Record::classify("Min: 1.0 -> 2.0x"),
        );
        // So are summaries whose values aren't numbers.
        assert_eq!(
            Record::Unrecognized,
            Record::classify("Min: n/a -> n/a: incomparable"),
        );
    }

    #[test]
    fn ten_iterations_become_medians() {
        let control = [
            0.19, 0.11, 0.15, 0.10, 0.18, 0.12, 0.17, 0.13, 0.16, 0.14,
        ];
        let experiment = [
            0.21, 0.29, 0.20, 0.28, 0.22, 0.27, 0.23, 0.26, 0.24, 0.25,
        ];
        let mut log = String::from("compare_wallclock: xgcc '-O2 -c foo.c'\n");
        for i in 0..10 {
            log.push_str(&format!(
                "iteration {}: control: xgcc '-O2 -c foo.c': \
                 time_taken: {}\n",
                i, control[i],
            ));
            log.push_str(&format!(
                "iteration {}: experiment: xgcc '-O2 -c foo.c': \
                 time_taken: {}\n",
                i, experiment[i],
            ));
        }
        let report = parse(&log);
        assert_eq!(1, report.len());
        let (key, got) = report.iter().next().unwrap();
        assert_eq!(&wallclock("xgcc -O2 -c foo.c"), key);
        assert_eq!(
            &pair(
                stat::median(&control).unwrap(),
                stat::median(&experiment).unwrap()
            ),
            got,
        );
        assert_eq!(&pair(0.15, 0.25), got);
    }

    #[test]
    fn summary_line_is_used_directly() {
        let log = "\
compare_memory: xgcc -S empty.c -g -O0
Mem max: 1189 -> 1077: 1.1040x smaller
";
        let report = parse(log);
        assert_eq!(
            Some(&pair(1189.0, 1077.0)),
            report.get(&memory("xgcc -S empty.c -g -O0"))
        );
    }

    #[test]
    fn summary_line_overrides_samples() {
        // Three samples would be an unsupported median, but the summary line
        // means the samples are never summarized.
        let log = "\
compare_wallclock: xgcc -S empty.c -g -O1
  iteration 0: control: xgcc -S empty.c -g -O1: time_taken: 0.5
  iteration 0: experiment: xgcc -S empty.c -g -O1: time_taken: 0.6
  iteration 1: control: xgcc -S empty.c -g -O1: time_taken: 0.4
  iteration 1: experiment: xgcc -S empty.c -g -O1: time_taken: 0.7
  iteration 2: control: xgcc -S empty.c -g -O1: time_taken: 0.3
  iteration 2: experiment: xgcc -S empty.c -g -O1: time_taken: 0.8
### Wallclock time for xgcc -S empty.c -g -O1 ###
Min: 0.3 -> 0.6: 2.0000x slower
Avg: 0.4 -> 0.7: 1.7500x slower
";
        let report = parse(log);
        assert_eq!(
            Some(&pair(0.3, 0.6)),
            report.get(&wallclock("xgcc -S empty.c -g -O1"))
        );
    }

    #[test]
    fn summary_before_header_is_an_error() {
        let log = "\
some preamble
Min: 0.3 -> 0.6: 2.0000x slower
compare_wallclock: xgcc -S empty.c -g -O1
";
        assert_eq!(
            Error::Format {
                line: 2,
                text: "Min: 0.3 -> 0.6: 2.0000x slower".to_string(),
            },
            parse_err(log),
        );
    }

    #[test]
    fn header_without_samples_emits_nothing() {
        let log = "\
compare_wallclock: xgcc -S a.c -O0
compare_wallclock: xgcc -S b.c -O0
iteration 0: control: xgcc -S b.c -O0: time_taken: 2.0
iteration 0: experiment: xgcc -S b.c -O0: time_taken: 3.0
iteration 1: control: xgcc -S b.c -O0: time_taken: 1.0
iteration 1: experiment: xgcc -S b.c -O0: time_taken: 4.0
";
        let report = parse(log);
        assert_eq!(1, report.len());
        assert_eq!(None, report.get(&wallclock("xgcc -S a.c -O0")));
        assert_eq!(
            Some(&pair(2.0, 4.0)),
            report.get(&wallclock("xgcc -S b.c -O0"))
        );
    }

    #[test]
    fn one_sided_samples_emit_nothing() {
        let log = "\
compare_wallclock: xgcc -S a.c -O0
iteration 0: control: xgcc -S a.c -O0: time_taken: 2.0
iteration 1: control: xgcc -S a.c -O0: time_taken: 1.0
";
        assert!(parse(log).is_empty());
    }

    #[test]
    fn odd_samples_are_unsupported() {
        let log = "\
compare_wallclock: xgcc -S a.c -O0
iteration 0: control: xgcc -S a.c -O0: time_taken: 2.0
iteration 0: experiment: xgcc -S a.c -O0: time_taken: 2.5
";
        assert_eq!(Error::Unsupported { len: 1 }, parse_err(log));
    }

    #[test]
    fn memory_samples_use_peak() {
        let log = "\
compare_memory: xgcc -S a.c -O0
  iteration 0: control: xgcc -S a.c -O0: total_ggc: 1189.0 KB
  iteration 0: experiment: xgcc -S a.c -O0: total_ggc: 1077.0 KB
  iteration 1: control: xgcc -S a.c -O0: total_ggc: 1190.0 KB
  iteration 1: experiment: xgcc -S a.c -O0: total_ggc: 1075.0 KB
  iteration 2: control: xgcc -S a.c -O0: total_ggc: 1188.0 KB
  iteration 2: experiment: xgcc -S a.c -O0: total_ggc: 1076.0 KB
";
        let report = parse(log);
        assert_eq!(
            Some(&pair(1190.0, 1077.0)),
            report.get(&memory("xgcc -S a.c -O0"))
        );
    }

    #[test]
    fn memory_header_with_time_samples_uses_median() {
        let mut log = String::from("compare_memory: xgcc -S a.c -O0\n");
        for i in 1..=4 {
            log.push_str(&format!(
                "iteration {}: control: xgcc -S a.c -O0: time_taken: {}\n",
                i,
                i as f64,
            ));
            log.push_str(&format!(
                "iteration {}: experiment: xgcc -S a.c -O0: time_taken: {}\n",
                i,
                (i * 10) as f64,
            ));
        }
        let report = parse(&log);
        assert_eq!(
            Some(&pair(3.0, 30.0)),
            report.get(&memory("xgcc -S a.c -O0"))
        );
    }

    #[test]
    fn summary_with_empty_description() {
        let log = "compare_wallclock: xgcc -S a.c -O0\nMin: 1.0 -> 2.0: \n";
        let report = parse(log);
        assert_eq!(1, report.len());
        assert_eq!(
            Some(&pair(1.0, 2.0)),
            report.get(&wallclock("xgcc -S a.c -O0"))
        );
    }

    #[test]
    fn samples_before_any_header_are_ignored() {
        let log = "\
iteration 0: control: xgcc -S a.c -O0: time_taken: 2.0
iteration 0: experiment: xgcc -S a.c -O0: time_taken: 2.5
total time taken: 10.5
";
        assert!(parse(log).is_empty());
    }

    #[test]
    fn order_is_preserved_and_repeats_replace() {
        let log = "\
compare_wallclock: xgcc -S b.c -O0
Min: 1.0 -> 2.0: 2.0000x slower
compare_memory: xgcc -S b.c -O0
Mem max: 10 -> 20: 2.0000x larger
compare_wallclock: xgcc -S a.c -O0
Min: 3.0 -> 4.0: 1.3333x slower
compare_wallclock: xgcc -S b.c -O0
Min: 5.0 -> 6.0: 1.2000x slower
";
        let report = parse(log);
        let got: Vec<(BenchmarkKey, SummaryPair)> =
            report.iter().map(|(k, v)| (k.clone(), *v)).collect();
        assert_eq!(
            vec![
                (wallclock("xgcc -S b.c -O0"), pair(5.0, 6.0)),
                (memory("xgcc -S b.c -O0"), pair(10.0, 20.0)),
                (wallclock("xgcc -S a.c -O0"), pair(3.0, 4.0)),
            ],
            got,
        );
        let walls: Vec<&str> = report
            .iter_kind(MetricKind::Wallclock)
            .map(|(k, _)| k.test.as_str())
            .collect();
        assert_eq!(vec!["xgcc -S b.c -O0", "xgcc -S a.c -O0"], walls);
    }

    #[test]
    fn crlf_and_noise_are_tolerated() {
        let log = "compare_memory: xgcc -S a.c -O3\r\n\
                   ### Total ggc memory usage for xgcc -S a.c -O3 ###\r\n\
                   Mem max: 1189.000 -> 1077.000: 1.1040x smaller\r\n\
                   \r\n\
                   Significant (t=12.34)\r\n";
        let report = parse(log);
        assert_eq!(
            Some(&pair(1189.0, 1077.0)),
            report.get(&memory("xgcc -S a.c -O3"))
        );
    }

    #[test]
    fn label_strips_binary() {
        assert_eq!("a.c -O3", memory("xgcc -S a.c -O3").label());
        assert_eq!("a.c -g", memory("xgcc -c a.c -g").label());
        assert_eq!("-O2 -c foo.c", memory("xgcc -O2 -c foo.c").label());
        assert_eq!("-S", memory("xgcc -S").label());
        assert_eq!("xgcc", memory("xgcc").label());
        assert_eq!(
            "compare_memory: xgcc -S a.c -O3",
            memory("xgcc -S a.c -O3").to_string()
        );
    }
}
