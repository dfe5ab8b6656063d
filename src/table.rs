/*!
This module turns a sequence of parsed logs into a comparison table for one
metric.

The first log is the baseline: it decides which benchmarks appear as rows and
in what order, and its control values fill the 'control' column. Every log,
including the first, then contributes one column of experiment values along
with their percent change. All logs are expected to cover the same set of
benchmarks. A benchmark that's missing from any of them is an error, rather
than a hole in the table.
*/

use {anyhow::Context, unicode_width::UnicodeWidthStr};

use crate::{
    args::Filter,
    compare::{display_value, Baseline, PercentChange},
    error::Error,
    format::log::{LogReport, MetricKind},
    util::write_divider,
};

/// A comparison table for a single metric across one or more logs.
#[derive(Clone, Debug)]
pub struct Table {
    pub kind: MetricKind,
    pub baseline: Baseline,
    /// The title of each log, in the order given. There is one cell per title
    /// in every row.
    pub titles: Vec<String>,
    pub rows: Vec<Row>,
}

/// A single benchmark in a comparison table.
#[derive(Clone, Debug)]
pub struct Row {
    /// The benchmark's label. See `BenchmarkKey::label`.
    pub label: String,
    /// The control value from the first log.
    pub control: f64,
    /// One cell per log.
    pub cells: Vec<Cell>,
}

/// The experiment value from one log and its change relative to the
/// baseline in effect for the table.
#[derive(Clone, Copy, Debug)]
pub struct Cell {
    pub kind: MetricKind,
    pub value: f64,
    pub change: PercentChange,
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({})", display_value(self.kind, self.value), self.change)
    }
}

impl Table {
    /// Build the table for `kind` from the given logs. The first log is the
    /// baseline. Only benchmarks whose test name passes `filter` are
    /// included.
    ///
    /// This returns a `MissingKey` error if a benchmark in the first log is
    /// absent from any other log, and a `Division` error if a baseline value
    /// is zero.
    pub fn build(
        reports: &[LogReport],
        kind: MetricKind,
        baseline: Baseline,
        filter: &Filter,
    ) -> anyhow::Result<Table> {
        let first = match reports.first() {
            Some(first) => first,
            None => anyhow::bail!("no logs to compare"),
        };
        let mut rows = vec![];
        for (key, base) in first.iter_kind(kind) {
            if !filter.include(&key.test) {
                continue;
            }
            let mut cells = vec![];
            for report in reports.iter() {
                let pair = report.get(key).ok_or_else(|| {
                    Error::missing_key(key, first.title(), report.title())
                })?;
                let reference = match baseline {
                    Baseline::Local => pair.control,
                    Baseline::Global => base.control,
                };
                let change =
                    PercentChange::for_metric(kind, pair.experiment, reference)
                        .with_context(|| {
                            format!(
                                "failed to compare '{}' in '{}'",
                                key,
                                report.title()
                            )
                        })?;
                cells.push(Cell { kind, value: pair.experiment, change });
            }
            rows.push(Row {
                label: key.label().to_string(),
                control: base.control,
                cells,
            });
        }
        if rows.is_empty() {
            log::debug!("no {} benchmarks in '{}'", kind, first.title());
        }
        Ok(Table {
            kind,
            baseline,
            titles: reports.iter().map(|r| r.title().to_string()).collect(),
            rows,
        })
    }

    /// A one line description of what this table shows.
    pub fn caption(&self) -> String {
        let what = match self.kind {
            MetricKind::Wallclock => "Wallclock time (s)",
            MetricKind::Memory => "Maximal ggc memory (KB)",
        };
        let against = match self.baseline {
            Baseline::Local => {
                "each log's change is relative to the control runs \
                 interleaved with that log's experiment"
            }
            Baseline::Global => {
                "each log's change is relative to the control of the first log"
            }
        };
        format!("{} ({})", what, against)
    }

    /// Write this table with tab separated columns. Use an elastic tabstop
    /// writer to align them.
    ///
    /// When colors are enabled on the writer given, improvements are green
    /// and regressions are red.
    pub fn write_text<W: termcolor::WriteColor>(
        &self,
        mut wtr: W,
    ) -> anyhow::Result<()> {
        // Write column names.
        write!(wtr, "benchmark\tcontrol")?;
        for title in self.titles.iter() {
            write!(wtr, "\t{}", title)?;
        }
        writeln!(wtr, "")?;

        // Write underlines beneath each column name to give some
        // separation.
        write_divider(&mut wtr, '-', "benchmark".width())?;
        write!(wtr, "\t")?;
        write_divider(&mut wtr, '-', "control".width())?;
        for title in self.titles.iter() {
            write!(wtr, "\t")?;
            write_divider(&mut wtr, '-', title.width())?;
        }
        writeln!(wtr, "")?;

        for row in self.rows.iter() {
            write!(
                wtr,
                "{}\t{}",
                row.label,
                display_value(self.kind, row.control)
            )?;
            for cell in row.cells.iter() {
                write!(wtr, "\t")?;
                let mut spec = termcolor::ColorSpec::new();
                if cell.change.amount() < 0.0 {
                    spec.set_fg(Some(termcolor::Color::Green));
                } else if cell.change.amount() > 0.0 {
                    spec.set_fg(Some(termcolor::Color::Red));
                }
                wtr.set_color(&spec)?;
                write!(wtr, "{}", cell)?;
                wtr.reset()?;
            }
            writeln!(wtr, "")?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write this table as CSV records, one per row. If `header` is true, then
    /// a header record is written first.
    ///
    /// Each log contributes two columns: the experiment value and the
    /// rendered percent change.
    pub fn write_csv<W: std::io::Write>(
        &self,
        wtr: &mut csv::Writer<W>,
        header: bool,
    ) -> anyhow::Result<()> {
        if header {
            let mut record = vec![
                "metric".to_string(),
                "benchmark".to_string(),
                "control".to_string(),
            ];
            for title in self.titles.iter() {
                record.push(title.clone());
                record.push(format!("{} change", title));
            }
            wtr.write_record(&record)?;
        }
        for row in self.rows.iter() {
            let mut record = vec![
                self.kind.to_string(),
                row.label.clone(),
                display_value(self.kind, row.control),
            ];
            for cell in row.cells.iter() {
                record.push(display_value(self.kind, cell.value));
                record.push(cell.change.to_string());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V2: &str = "\
compare_wallclock: xgcc '-S test-sources/empty.c -g -O0'
Min: 0.01 -> 0.011: 1.1000x slower
compare_memory: xgcc '-S test-sources/empty.c -g -O0'
Mem max: 1000 -> 1100: 1.1000x larger
compare_wallclock: xgcc '-S test-sources/kdecore.cc -g -O0'
Min: 2.0 -> 1.8: 1.1111x faster
compare_memory: xgcc '-S test-sources/kdecore.cc -g -O0'
Mem max: 50000 -> 50000: no change
";

    const V3: &str = "\
compare_wallclock: xgcc -S empty.c -g -O0
Min: 0.02 -> 0.019: 1.0526x faster
compare_memory: xgcc -S empty.c -g -O0
Mem max: 1001 -> 900: 1.1122x smaller
compare_wallclock: xgcc -S kdecore.cc -g -O0
Min: 2.5 -> 2.5: no change
compare_memory: xgcc -S kdecore.cc -g -O0
Mem max: 50100 -> 55000.7: 1.0978x larger
";

    fn reports() -> Vec<LogReport> {
        vec![
            LogReport::parse("v2", V2).unwrap(),
            LogReport::parse("v3", V3).unwrap(),
        ]
    }

    fn cells(table: &Table) -> Vec<Vec<String>> {
        table
            .rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn wallclock_local_baseline() {
        let table = Table::build(
            &reports(),
            MetricKind::Wallclock,
            Baseline::Local,
            &Filter::default(),
        )
        .unwrap();
        assert_eq!(vec!["v2", "v3"], table.titles);
        let labels: Vec<&str> =
            table.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(vec!["empty.c -g -O0", "kdecore.cc -g -O0"], labels);
        assert_eq!(0.01, table.rows[0].control);
        assert_eq!(
            vec![
                vec!["0.011 (+10.0%)", "0.019 (-5.0%)"],
                vec!["1.8 (-10.0%)", "2.5 (+0.0%)"],
            ],
            cells(&table),
        );
    }

    #[test]
    fn memory_global_baseline() {
        let table = Table::build(
            &reports(),
            MetricKind::Memory,
            Baseline::Global,
            &Filter::default(),
        )
        .unwrap();
        assert_eq!(
            vec![
                vec!["1100 (+10.0%)", "900 (-10.0%)"],
                vec!["50000 (+0.0%)", "55000 (+10.0%)"],
            ],
            cells(&table),
        );
    }

    #[test]
    fn filter_rows() {
        let mut filter = Filter::default();
        filter.whitelist("kdecore").unwrap();
        let table = Table::build(
            &reports(),
            MetricKind::Memory,
            Baseline::Local,
            &filter,
        )
        .unwrap();
        assert_eq!(1, table.rows.len());
        assert_eq!("kdecore.cc -g -O0", table.rows[0].label);
    }

    #[test]
    fn missing_key() {
        let partial = "\
compare_wallclock: xgcc -S empty.c -g -O0
Min: 0.02 -> 0.019: 1.0526x faster
";
        let reports = vec![
            LogReport::parse("v2", V2).unwrap(),
            LogReport::parse("partial", partial).unwrap(),
        ];
        let err = Table::build(
            &reports,
            MetricKind::Wallclock,
            Baseline::Local,
            &Filter::default(),
        )
        .unwrap_err();
        assert_eq!(
            Some(&Error::MissingKey {
                key: "compare_wallclock: xgcc -S kdecore.cc -g -O0"
                    .to_string(),
                baseline: "v2".to_string(),
                title: "partial".to_string(),
            }),
            err.downcast_ref::<Error>(),
        );
    }

    #[test]
    fn zero_baseline() {
        let zero = "\
compare_memory: xgcc -S empty.c -g -O0
Mem max: 0 -> 900: incomparable
";
        let reports = vec![LogReport::parse("zero", zero).unwrap()];
        let err = Table::build(
            &reports,
            MetricKind::Memory,
            Baseline::Local,
            &Filter::default(),
        )
        .unwrap_err();
        assert_eq!(
            Some(&Error::Division { value: 900.0 }),
            err.downcast_ref::<Error>(),
        );
    }

    #[test]
    fn no_reports() {
        assert!(Table::build(
            &[],
            MetricKind::Memory,
            Baseline::Local,
            &Filter::default(),
        )
        .is_err());
    }

    #[test]
    fn text_output() {
        let table = Table::build(
            &reports(),
            MetricKind::Memory,
            Baseline::Global,
            &Filter::default(),
        )
        .unwrap();
        let mut wtr = termcolor::NoColor::new(vec![]);
        table.write_text(&mut wtr).unwrap();
        let got = String::from_utf8(wtr.into_inner()).unwrap();
        let expected = "\
benchmark\tcontrol\tv2\tv3
---------\t-------\t--\t--
empty.c -g -O0\t1000\t1100 (+10.0%)\t900 (-10.0%)
kdecore.cc -g -O0\t50000\t50000 (+0.0%)\t55000 (+10.0%)
";
        assert_eq!(expected, got);
    }

    #[test]
    fn text_output_round_trips_changes() {
        let table = Table::build(
            &reports(),
            MetricKind::Wallclock,
            Baseline::Local,
            &Filter::default(),
        )
        .unwrap();
        let mut wtr = termcolor::NoColor::new(vec![]);
        table.write_text(&mut wtr).unwrap();
        let got = String::from_utf8(wtr.into_inner()).unwrap();
        let re = regex_lite::Regex::new(r"\(([-+][0-9.]+%)\)").unwrap();
        let parsed: Vec<PercentChange> = re
            .captures_iter(&got)
            .map(|caps| caps[1].parse().unwrap())
            .collect();
        let computed: Vec<PercentChange> = table
            .rows
            .iter()
            .flat_map(|r| r.cells.iter().map(|c| c.change))
            .collect();
        assert_eq!(computed.len(), parsed.len());
        for (c, p) in computed.iter().zip(parsed.iter()) {
            assert_eq!(c.to_string(), p.to_string());
            assert_eq!(
                c.amount() < 0.0,
                p.amount() < 0.0,
                "sign mismatch between {} and {}",
                c,
                p
            );
        }
    }

    #[test]
    fn csv_output() {
        let table = Table::build(
            &reports(),
            MetricKind::Memory,
            Baseline::Local,
            &Filter::default(),
        )
        .unwrap();
        let mut wtr = csv::Writer::from_writer(vec![]);
        table.write_csv(&mut wtr, true).unwrap();
        let got = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let expected = "\
metric,benchmark,control,v2,v2 change,v3,v3 change
memory,empty.c -g -O0,1000,1100,+10.0%,900,-10.1%
memory,kdecore.cc -g -O0,50000,50000,+0.0%,55000,+9.8%
";
        assert_eq!(expected, got);
    }
}
