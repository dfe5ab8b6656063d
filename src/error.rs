use thiserror::Error;

/// The ways in which turning benchmark logs into a comparison can fail.
///
/// Every one of these is fatal to the current run. The inputs are static
/// files, so nothing is retried. At the command level these are wrapped in
/// `anyhow` context, but they can still be recovered with `downcast_ref`.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// A precomputed summary line appeared before any benchmark header, so
    /// there is no benchmark to attach it to.
    #[error(
        "line {line}: summary line {text:?} appears before any \
         benchmark header"
    )]
    Format { line: usize, text: String },
    /// The median was requested for a series whose length it doesn't
    /// support. Only non-empty series of even length are supported.
    #[error(
        "median of a series with {len} samples is unsupported \
         (only non-empty even-length series are)"
    )]
    Unsupported { len: usize },
    /// A percent change was requested against a zero baseline.
    #[error("cannot compute percent change of {value} against a zero baseline")]
    Division { value: f64 },
    /// A benchmark in the baseline log is absent from another log.
    #[error("benchmark '{key}' from '{baseline}' is missing from '{title}'")]
    MissingKey { key: String, baseline: String, title: String },
}

impl Error {
    pub fn format<T: Into<String>>(line: usize, text: T) -> Error {
        Error::Format { line, text: text.into() }
    }

    pub fn missing_key<K: std::fmt::Display>(
        key: K,
        baseline: &str,
        title: &str,
    ) -> Error {
        Error::MissingKey {
            key: key.to_string(),
            baseline: baseline.to_string(),
            title: title.to_string(),
        }
    }
}
