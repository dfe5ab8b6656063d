/*!
The benchmark matrix: which compiler invocations to measure, and how many
times.

A matrix can be loaded from a TOML file. Every field is optional, and any
field that is absent takes its value from the built-in default matrix:

```toml
binary = "xgcc"
source-files = ["test-sources/kdecore.cc", "test-sources/empty.c"]
args = ["-S", "{source}", "-g"]
optimization-levels = ["-O0", "-O2"]
wallclock-iters = 10
memory-iters = 3
strip = true
```

Every source file is combined with every optimization level. The arguments
for one invocation are `args` with `{source}` replaced by the source file,
followed by the optimization level.
*/

use std::path::Path;

use anyhow::Context;

/// The placeholder in `args` that is replaced by each source file.
const SOURCE_PLACEHOLDER: &str = "{source}";

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Matrix {
    /// The name of the compiler driver inside each build directory.
    pub binary: String,
    /// The source files to compile.
    pub source_files: Vec<String>,
    /// The argument template for each compilation.
    pub args: Vec<String>,
    /// The optimization flags each source file is compiled with.
    pub optimization_levels: Vec<String>,
    /// How many times each peer is timed per invocation.
    pub wallclock_iters: usize,
    /// How many times each peer's memory usage is recorded per invocation.
    pub memory_iters: usize,
    /// Whether to strip debug info from the compiler binaries first.
    pub strip: bool,
}

impl Default for Matrix {
    fn default() -> Matrix {
        let strings = |xs: &[&str]| -> Vec<String> {
            xs.iter().map(|x| x.to_string()).collect()
        };
        Matrix {
            binary: "xgcc".to_string(),
            source_files: strings(&[
                "test-sources/kdecore.cc",
                "test-sources/empty.c",
                "test-sources/big-code.c",
                "test-sources/influence.i",
            ]),
            args: strings(&["-S", SOURCE_PLACEHOLDER, "-g"]),
            optimization_levels: strings(&["-O0", "-O1", "-O2", "-O3", "-Os"]),
            wallclock_iters: 10,
            memory_iters: 3,
            strip: true,
        }
    }
}

impl Matrix {
    /// Read a matrix from the TOML file at the given path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Matrix> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).with_context(|| {
            format!("failed to read matrix from {}", path.display())
        })?;
        Matrix::from_toml(&data)
            .with_context(|| format!("error in matrix {}", path.display()))
    }

    /// Parse a matrix from TOML data and check that it's usable.
    pub fn from_toml(data: &str) -> anyhow::Result<Matrix> {
        let matrix: Matrix =
            toml::from_str(data).context("failed to decode TOML")?;
        matrix.validate()?;
        Ok(matrix)
    }

    /// Returns an error if this matrix can't produce any measurements.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.binary.is_empty(), "'binary' must not be empty");
        anyhow::ensure!(
            !self.source_files.is_empty(),
            "'source-files' must not be empty",
        );
        anyhow::ensure!(
            !self.optimization_levels.is_empty(),
            "'optimization-levels' must not be empty",
        );
        anyhow::ensure!(
            self.args.iter().any(|a| a.contains(SOURCE_PLACEHOLDER)),
            "'args' must contain the '{}' placeholder",
            SOURCE_PLACEHOLDER,
        );
        anyhow::ensure!(
            self.wallclock_iters > 0 || self.memory_iters > 0,
            "at least one of 'wallclock-iters' or 'memory-iters' \
             must be non-zero",
        );
        Ok(())
    }

    /// Return every invocation in this matrix, in order. Source files vary
    /// slowest.
    pub fn invocations(&self) -> Vec<Invocation> {
        let mut invs = vec![];
        for source in self.source_files.iter() {
            for level in self.optimization_levels.iter() {
                let mut args: Vec<String> = self
                    .args
                    .iter()
                    .map(|a| a.replace(SOURCE_PLACEHOLDER, source))
                    .collect();
                args.push(level.clone());
                invs.push(Invocation { binary: self.binary.clone(), args });
            }
        }
        invs
    }
}

/// A single compiler invocation, without the build-specific parts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invocation {
    pub binary: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// The name used for this invocation in logs. Any argument containing a
    /// path separator is reduced to its final component, so that the name
    /// doesn't depend on where the sources live.
    pub fn test_name(&self) -> String {
        let mut name = self.binary.clone();
        for arg in self.args.iter() {
            name.push(' ');
            if arg.contains('/') {
                let base = Path::new(arg)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(arg);
                name.push_str(base);
            } else {
                name.push_str(arg);
            }
        }
        name
    }
}
