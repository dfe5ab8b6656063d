/*!
Relative comparisons between a value and its baseline.

Everything here operates on already-aggregated scalars. The only subtlety is
that each metric has its own rounding rule: wallclock timings are rounded to
a fixed number of decimal places before any ratio is taken (so that jitter in
the far decimal places doesn't show up as a change), while memory figures are
compared as-is and only truncated when displayed.
*/

use crate::{args::Usage, error::Error, format::log::MetricKind};

/// The number of decimal places wallclock timings are rounded to before
/// computing a percent change.
const WALLCLOCK_PLACES: i32 = 5;

/// The relative change of a value with respect to a baseline, in percent.
///
/// Its `Display` impl is the canonical rendering, e.g., `+10.0%` or `-3.2%`.
/// Its `FromStr` impl parses that rendering back.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct PercentChange(f64);

impl PercentChange {
    /// Computes `100 * value / baseline - 100`.
    ///
    /// A zero baseline returns a `Division` error instead of an infinite or
    /// NaN change.
    pub fn new(value: f64, baseline: f64) -> Result<PercentChange, Error> {
        if baseline == 0.0 {
            return Err(Error::Division { value });
        }
        Ok(PercentChange((100.0 * value / baseline) - 100.0))
    }

    /// Computes the change of `value` relative to `baseline` using the
    /// rounding rule for the given metric.
    pub fn for_metric(
        kind: MetricKind,
        value: f64,
        baseline: f64,
    ) -> Result<PercentChange, Error> {
        match kind {
            MetricKind::Wallclock => PercentChange::new(
                round(value, WALLCLOCK_PLACES),
                round(baseline, WALLCLOCK_PLACES),
            ),
            MetricKind::Memory => PercentChange::new(value, baseline),
        }
    }

    /// The change in percent. Positive means the value grew.
    pub fn amount(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for PercentChange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.0.is_sign_negative() {
            write!(f, "{:.1}%", self.0)
        } else {
            write!(f, "+{:.1}%", self.0)
        }
    }
}

impl std::str::FromStr for PercentChange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<PercentChange> {
        let re = regex!(r"^(?P<sign>[-+])(?P<amount>[0-9]+(?:\.[0-9]+)?)%$");
        let caps = match re.captures(s) {
            Some(caps) => caps,
            None => anyhow::bail!(
                "percent change '{}' not in '(+|-)<decimal>%' format",
                s,
            ),
        };
        let amount: f64 = caps["amount"].parse()?;
        match &caps["sign"] {
            "+" => Ok(PercentChange(amount)),
            "-" => Ok(PercentChange(-amount)),
            sign => unreachable!("impossible sign '{}'", sign),
        }
    }
}

/// Renders the percent change of `value` against `baseline`, e.g., `+10.0%`.
///
/// The result is formatted to one decimal place and always carries a sign.
/// A zero baseline returns a `Division` error. Tables render their cells
/// through `PercentChange` directly, since they also need the sign of the
/// unrounded change for coloring.
#[cfg(test)]
pub fn percent_change(value: f64, baseline: f64) -> Result<String, Error> {
    PercentChange::new(value, baseline).map(|pc| pc.to_string())
}

/// Renders a single scalar the way it is shown in comparison tables for the
/// given metric. Wallclock timings are rounded; memory figures (in KB) are
/// truncated to integers.
pub fn display_value(kind: MetricKind, value: f64) -> String {
    match kind {
        MetricKind::Wallclock => round(value, WALLCLOCK_PLACES).to_string(),
        MetricKind::Memory => (value.trunc() as i64).to_string(),
    }
}

/// Round `x` to the given number of decimal places.
pub fn round(x: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (x * scale).round() / scale
}

/// Which control value each experiment in a table is compared against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Baseline {
    /// Each log is compared against its own control, i.e., the control runs
    /// that were interleaved with that log's experiment runs.
    Local,
    /// Every log is compared against the control of the first log.
    Global,
}

impl Baseline {
    pub const USAGE: Usage = Usage::new(
        "-b, --baseline <policy>",
        "One of: local, global.",
        r#"
Which control value percent changes are computed against.

With 'local', each log's experiment is compared against the control runs
recorded in that same log. Since control and experiment runs are interleaved
when a log is produced, this cancels out most drift in machine load between
logs. With 'global', every log's experiment is compared against the control of
the first log given.

When this flag is absent, wallclock tables use 'local' and memory tables use
'global'. Memory figures are deterministic, so there is no drift to cancel.
"#,
    );

    /// The policy used for the given metric when none was asked for.
    pub fn default_for(kind: MetricKind) -> Baseline {
        match kind {
            MetricKind::Wallclock => Baseline::Local,
            MetricKind::Memory => Baseline::Global,
        }
    }
}

impl std::fmt::Display for Baseline {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let nice = match *self {
            Baseline::Local => "local",
            Baseline::Global => "global",
        };
        write!(f, "{}", nice)
    }
}

impl std::str::FromStr for Baseline {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Baseline> {
        let baseline = match s {
            "local" => Baseline::Local,
            "global" => Baseline::Global,
            unknown => {
                anyhow::bail!(
                    "unrecognized baseline policy '{}', must be \
                     one of local or global.",
                    unknown,
                )
            }
        };
        Ok(baseline)
    }
}
