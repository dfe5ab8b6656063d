/*!
A parser for the table a GCC-style compiler writes to stderr when given
'-ftime-report'.

Only two shapes of line matter. Per-phase lines look like this:

```text
 phase setup             :   0.00 ( 0%) usr   0.00 ( 0%) sys   0.00 ( 0%) wall    1077 kB (91%) ggc
```

and the final line totals everything:

```text
 TOTAL                 :   0.00             0.00             0.00               1189 kB
```

The 'ggc' column of the total is the figure we use as the memory usage of a
compilation.
*/

/// The timings and GC memory of a single line of a time report.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stats {
    /// User CPU time, in seconds.
    pub usr: f64,
    /// System CPU time, in seconds.
    pub sys: f64,
    /// Wallclock time, in seconds.
    pub wall: f64,
    /// GC-managed memory, in KB.
    pub ggc: f64,
}

/// A parsed time report, as an ordered sequence of (name, stats) pairs.
#[derive(Clone, Debug, Default)]
pub struct TimeReport {
    entries: Vec<(String, Stats)>,
}

impl TimeReport {
    /// The name under which the totals line is recorded.
    pub const TOTAL: &'static str = "TOTAL";

    /// Parse the stderr of a compiler run. Lines that aren't part of the
    /// time report are ignored.
    pub fn from_stderr(err: &str) -> TimeReport {
        let phase = regex!(
            r"(?x)
                ^\x20(?P<name>.*?)\s+:
                \s+(?P<usr>[0-9]+\.[0-9]+).+usr
                \s+(?P<sys>[0-9]+\.[0-9]+).+sys
                \s+(?P<wall>[0-9]+\.[0-9]+).+wall
                \s+(?P<ggc>[0-9]+)\x20kB.+ggc
            ",
        );
        let total = regex!(
            r"(?x)
                ^\x20TOTAL\s+:
                \s+(?P<usr>[0-9]+\.[0-9]+)
                \s+(?P<sys>[0-9]+\.[0-9]+)
                \s+(?P<wall>[0-9]+\.[0-9]+)
                \s+(?P<ggc>[0-9]+)\x20kB
                $
            ",
        );

        let mut report = TimeReport::default();
        for line in err.lines() {
            let line = line.trim_end();
            if let Some(caps) = total.captures(line) {
                report.insert(TimeReport::TOTAL, stats(&caps));
            } else if let Some(caps) = phase.captures(line) {
                report.insert(caps["name"].trim(), stats(&caps));
            }
        }
        report
    }

    pub fn get(&self, name: &str) -> Option<&Stats> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// The totals line, if the report had one.
    pub fn total(&self) -> Option<&Stats> {
        self.get(TimeReport::TOTAL)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Stats)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    fn insert(&mut self, name: &str, stats: Stats) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = stats,
            None => self.entries.push((name.to_string(), stats)),
        }
    }
}

fn stats(caps: &regex_lite::Captures<'_>) -> Stats {
    // OK because every group only matches ASCII digits and at most one dot.
    let field = |name: &str| caps[name].parse::<f64>().unwrap();
    Stats {
        usr: field("usr"),
        sys: field("sys"),
        wall: field("wall"),
        ggc: field("ggc"),
    }
}
