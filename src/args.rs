use std::{
    fmt::{Debug, Display, Write},
    str::FromStr,
};

use {
    anyhow::Context,
    lexopt::{Arg, Parser, ValueExt},
    regex_lite::Regex,
};

/// Parses the next argument as a sub-command name and returns it. If the
/// next argument isn't a plain value, then this returns an error.
///
/// When -h/--help is given instead, the usage text given is returned as an
/// error so that it gets printed.
pub fn next_as_command(usage: &str, p: &mut Parser) -> anyhow::Result<String> {
    let usage = usage.trim();
    let arg = match p.next()? {
        Some(arg) => arg,
        None => anyhow::bail!("{}", usage),
    };
    let cmd = match arg {
        Arg::Value(cmd) => cmd.string()?,
        Arg::Short('h') | Arg::Long("help") => anyhow::bail!("{}", usage),
        arg => return Err(arg.unexpected().into()),
    };
    Ok(cmd)
}

/// Parses the next 'p.value()' into 'T'. Any error messages will include the
/// given flag name in them.
pub fn parse<T>(p: &mut Parser, flag_name: &'static str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: Display + Debug + Send + Sync + 'static,
{
    // The 'FromStr' impls in this crate use 'anyhow::Error' as their error
    // type, and 'anyhow::Error' does not impl 'std::error::Error'. Hence the
    // funky bounds and the 'Error::msg' below.
    let osv = p.value().context(flag_name)?;
    let strv = match osv.to_str() {
        Some(strv) => strv,
        None => {
            let err = lexopt::Error::NonUnicodeValue(osv.into());
            return Err(anyhow::Error::from(err).context(flag_name));
        }
    };
    let parsed = match strv.parse() {
        Err(err) => {
            return Err(anyhow::Error::msg(err).context(flag_name));
        }
        Ok(parsed) => parsed,
    };
    Ok(parsed)
}

/// This defines a flag for controlling the use of color in the output.
#[derive(Clone, Copy, Debug)]
pub enum Color {
    /// Color is only enabled when the output is a tty.
    Auto,
    /// Color is always enabled.
    Always,
    /// Color is disabled.
    Never,
}

impl Color {
    pub const USAGE: Usage = Usage::new(
        "--color <mode>",
        "One of: auto, always, never.",
        r#"
Whether to use color (default: auto).

When enabled, the percent change cells of comparison tables are colorized:
improvements are green and regressions are red. The choices are: auto, always,
never.
"#,
    );

    /// Return a possibly colorized stdout, where the output supports elastic
    /// tabstops.
    pub fn elastic_stdout(&self) -> Box<dyn termcolor::WriteColor> {
        use {
            tabwriter::TabWriter,
            termcolor::{Ansi, NoColor},
        };

        if self.should_color() {
            Box::new(Ansi::new(TabWriter::new(std::io::stdout())))
        } else {
            Box::new(NoColor::new(TabWriter::new(std::io::stdout())))
        }
    }

    /// Return true if colors should be used. When the color choice is 'auto',
    /// this only returns true if stdout is a tty.
    pub fn should_color(&self) -> bool {
        use std::io::IsTerminal;
        match *self {
            Color::Auto => std::io::stdout().is_terminal(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

impl Default for Color {
    fn default() -> Color {
        Color::Auto
    }
}

impl std::str::FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Color> {
        let color = match s {
            "auto" => Color::Auto,
            "always" => Color::Always,
            "never" => Color::Never,
            unknown => {
                anyhow::bail!(
                    "unrecognized color config '{}', must be \
                     one of auto, always or never.",
                    unknown,
                )
            }
        };
        Ok(color)
    }
}

/// Filter is the implementation of whitelist/blacklist rules over benchmark
/// test names. If there are no rules, everything matches. If there's at least
/// one whitelist rule, then at least one whitelist rule needs to match to get
/// through the filter. If there are only blacklist rules, then a name gets
/// through as long as none of them match.
///
/// Rules have precedence: the last rule that matches decides. So a whitelist
/// rule that matches after a blacklist rule matched lets the name through.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    rules: Vec<FilterRule>,
}

impl Filter {
    pub const USAGE_BENCH: Usage = Usage::new(
        "-f, --filter <name> ...",
        "Filter by including a benchmark by a name regex pattern.",
        r#"
Filter by including a benchmark by a name regex pattern.

This flag may be given multiple times and works in concert with the
-F/--filter-not flag. The -f flag introduces a whitelist regex pattern while
-F introduces a blacklist regex pattern. Both combine to form a single filter
with the following rules. First, if there is at least one whitelist pattern,
then a benchmark must match at least one of them in order to be included.
Second, the order of the patterns matters. The last pattern that matches a
benchmark wins. For example, if '-f kdecore -F O0' is given, then even though
the first pattern matches 'xgcc -S kdecore.cc -g -O0', since '-F O0' came after
and is a blacklist pattern, that benchmark is excluded.

Patterns are matched against the full test name of a benchmark, which
includes the binary, e.g., 'xgcc -S kdecore.cc -g -O0'. Regexes use unanchored
search.
"#,
    );

    pub const USAGE_BENCH_NOT: Usage = Usage::new(
        "-F, --filter-not <name> ...",
        "Filter by excluding a benchmark by a name regex pattern.",
        r#"
Filter by excluding a benchmark by a name regex pattern.

This flag may be given multiple times and each time it contributes a blacklist
regex pattern to the filter for benchmark names. The rules for how this filter
works are described in more detail in the docs for the -f/--filter flag.
"#,
    );

    /// Add a whitelist pattern to this filter by parsing the pattern from the
    /// given arg parser. The flag name given is used in error messages.
    pub fn arg_whitelist(
        &mut self,
        p: &mut lexopt::Parser,
        flag_name: &'static str,
    ) -> anyhow::Result<()> {
        let pattern = arg_pattern(p, flag_name)?;
        self.whitelist(&pattern).context(flag_name)
    }

    /// Add a blacklist pattern to this filter by parsing the pattern from the
    /// given arg parser. The flag name given is used in error messages.
    pub fn arg_blacklist(
        &mut self,
        p: &mut lexopt::Parser,
        flag_name: &'static str,
    ) -> anyhow::Result<()> {
        let pattern = arg_pattern(p, flag_name)?;
        self.blacklist(&pattern).context(flag_name)
    }

    /// Add a whitelist pattern to this filter.
    ///
    /// If the pattern is not a valid regex, then this returns an error.
    pub fn whitelist(&mut self, pattern: &str) -> anyhow::Result<()> {
        let re =
            Regex::new(pattern).context("whitelist regex is not valid")?;
        self.rules.push(FilterRule { re, blacklist: false });
        Ok(())
    }

    /// Add a blacklist pattern to this filter.
    ///
    /// If the pattern is not a valid regex, then this returns an error.
    pub fn blacklist(&mut self, pattern: &str) -> anyhow::Result<()> {
        let re =
            Regex::new(pattern).context("blacklist regex is not valid")?;
        self.rules.push(FilterRule { re, blacklist: true });
        Ok(())
    }

    /// Return true if and only if the given subject passes this filter.
    pub fn include(&self, subject: &str) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        // With any whitelist rule present, a subject starts out excluded and
        // needs a whitelist match. With only blacklist rules, it starts out
        // included.
        let mut include = self.rules.iter().all(|r| r.blacklist);
        for rule in &self.rules {
            if rule.re.is_match(subject) {
                include = !rule.blacklist;
            }
        }
        include
    }
}

/// Pull a UTF-8 pattern for the given flag out of the arg parser.
fn arg_pattern(
    p: &mut lexopt::Parser,
    flag_name: &'static str,
) -> anyhow::Result<String> {
    let osval = p.value().context(flag_name)?;
    match osval.into_string() {
        Ok(strval) => Ok(strval),
        Err(osval) => {
            let err = lexopt::Error::NonUnicodeValue(osval);
            Err(anyhow::Error::from(err).context(flag_name))
        }
    }
}

/// A single rule in a filter, which is a combination of a regex and whether
/// it's a blacklist rule or not.
#[derive(Clone, Debug)]
struct FilterRule {
    re: Regex,
    blacklist: bool,
}

/// A type for expressing the documentation of a flag.
///
/// The `Usage::short` and `Usage::long` functions take a slice of usages and
/// format them into a human readable display. It does simple word wrapping and
/// column alignment for you.
#[derive(Clone, Debug)]
pub struct Usage {
    /// The format of the flag, for example, '-c, --config <path>'.
    pub format: &'static str,
    /// A very short description of the flag. Should fit on one line along with
    /// the format.
    pub short: &'static str,
    /// A longer form description of the flag. May be multiple paragraphs long
    /// (but doesn't have to be).
    pub long: &'static str,
}

impl Usage {
    /// Create a new usage from the given components.
    pub const fn new(
        format: &'static str,
        short: &'static str,
        long: &'static str,
    ) -> Usage {
        Usage { format, short, long }
    }

    /// Format a two column table from the given usages, where the first
    /// column is the format and the second column is the short description.
    pub fn short(usages: &[Usage]) -> String {
        const MIN_SPACE: usize = 2;

        let mut result = String::new();
        let max_len = match usages.iter().map(|u| u.format.len()).max() {
            None => return result,
            Some(len) => len,
        };
        for usage in usages.iter() {
            let padlen = MIN_SPACE + (max_len - usage.format.len());
            let padding = " ".repeat(padlen);
            writeln!(result, "    {}{}{}", usage.format, padding, usage.short)
                .unwrap();
        }
        result
    }

    /// Print the format of each usage and its long description below the
    /// format. This also does appropriate indentation with the assumption that
    /// it is in an OPTIONS section of a bigger usage message.
    pub fn long(usages: &[Usage]) -> String {
        let wrap_opts = textwrap::Options::new(79)
            .initial_indent("        ")
            .subsequent_indent("        ");
        let mut result = String::new();
        for (i, usage) in usages.iter().enumerate() {
            if i > 0 {
                writeln!(result, "").unwrap();
            }
            writeln!(result, "    {}", usage.format).unwrap();
            for (i, paragraph) in usage.long.trim().split("\n\n").enumerate() {
                if i > 0 {
                    result.push('\n');
                }
                let flattened = paragraph.replace("\n", " ");
                for line in textwrap::wrap(&flattened, &wrap_opts) {
                    result.push_str(&line);
                    result.push('\n');
                }
            }
        }
        result
    }
}
