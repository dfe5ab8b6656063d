/*!
The summary block written after each benchmark in a log.

The block compares the two series of samples collected for a benchmark and
states, for a few statistics, how the experiment moved relative to control.
Its `Min:` and `Mem max:` lines are exactly the lines that `format::log`
picks up as precomputed summaries, so a log's final numbers don't depend on
re-deriving anything from its per-iteration lines.
*/

use std::fmt::Write;

use crate::{format::log::MetricKind, stat};

/// Render the summary block for the given control and experiment samples.
///
/// If either series is empty, then the block only contains its title and a
/// note saying that nothing was measured.
pub fn render(
    kind: MetricKind,
    test: &str,
    control: &[f64],
    experiment: &[f64],
) -> String {
    let mut out = String::new();
    let title = match kind {
        MetricKind::Wallclock => format!("Wallclock time for {}", test),
        MetricKind::Memory => format!("Total ggc memory usage for {}", test),
    };
    // Writing to a String never fails.
    writeln!(out, "### {} ###", title).unwrap();
    if control.is_empty() || experiment.is_empty() {
        writeln!(out, "No samples recorded").unwrap();
        return out;
    }
    match kind {
        MetricKind::Wallclock => {
            let lines: [(&str, fn(&[f64]) -> Option<f64>, Change); 3] = [
                ("Min", stat::min, Change::Time),
                ("Avg", stat::mean, Change::Time),
                ("Stddev", stat::stddev, Change::Size),
            ];
            for (name, f, change) in lines {
                // OK because both series are non-empty.
                let (c, e) = (f(control).unwrap(), f(experiment).unwrap());
                writeln!(
                    out,
                    "{}: {} -> {}: {}",
                    name,
                    c,
                    e,
                    change.describe(c, e)
                )
                .unwrap();
            }
        }
        MetricKind::Memory => {
            // OK because both series are non-empty.
            let c = stat::max(control).unwrap();
            let e = stat::max(experiment).unwrap();
            writeln!(
                out,
                "Mem max: {:.3} -> {:.3}: {}",
                c,
                e,
                Change::Size.describe(c, e)
            )
            .unwrap();
        }
    }
    out
}

/// How to describe the direction of a change.
#[derive(Clone, Copy, Debug)]
enum Change {
    /// Bigger is slower.
    Time,
    /// Bigger is larger.
    Size,
}

impl Change {
    /// Describe the change from `old` to `new` as a ratio of the bigger to
    /// the smaller, e.g., '1.2000x slower'.
    fn describe(&self, old: f64, new: f64) -> String {
        let (bigger, smaller) = match *self {
            Change::Time => ("slower", "faster"),
            Change::Size => ("larger", "smaller"),
        };
        if old == new {
            return "no change".to_string();
        }
        if old == 0.0 || new == 0.0 {
            return "incomparable (one result was zero)".to_string();
        }
        if new > old {
            format!("{:.4}x {}", new / old, bigger)
        } else {
            format!("{:.4}x {}", old / new, smaller)
        }
    }
}
