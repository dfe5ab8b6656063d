use std::{
    process::{Command, Stdio},
    time::{Duration, Instant},
};

use {
    anyhow::Context,
    bstr::{BString, ByteSlice},
};

/// The ccperf Cargo package version. This environment variable is guaranteed
/// to be made available by Cargo.
pub const CCPERF_VERSION: &'static str = env!("CARGO_PKG_VERSION");

/// The commit revision hash that ccperf was built from. This environment
/// variable is set by a custom build script, and is only available when `git`
/// is available.
pub const CCPERF_REVISION: Option<&'static str> =
    option_env!("CCPERF_REVISION");

/// Returns a complete version string for `ccperf`.
///
/// If `git` was available while building `ccperf`, then this includes the
/// revision hash.
pub fn version() -> String {
    let mut s = CCPERF_VERSION.to_string();
    if let Some(rev) = CCPERF_REVISION {
        s.push_str(&format!(" (rev {})", rev));
    }
    s
}

/// Write the given divider character `width` times to the given writer.
pub fn write_divider<W: std::io::Write>(
    mut wtr: W,
    divider: char,
    width: usize,
) -> anyhow::Result<()> {
    let div: String = std::iter::repeat(divider).take(width).collect();
    write!(wtr, "{}", div)?;
    Ok(())
}

/// Runs the given command to completion and returns how long it took.
///
/// The command's stdout is discarded while its stderr is inherited, so that
/// compiler diagnostics stay visible. A command that runs but exits
/// unsuccessfully is logged as a warning and still timed. Only failing to
/// start the command at all is an error.
pub fn timed(cmd: &mut Command) -> anyhow::Result<Duration> {
    log::debug!("running command: {:?}", cmd);
    cmd.stdin(Stdio::null()).stdout(Stdio::null());
    let start = Instant::now();
    let status = cmd.status().context("failed to run command")?;
    let elapsed = start.elapsed();
    if !status.success() {
        log::warn!("command {:?} failed with {:?}", cmd, status);
    }
    Ok(elapsed)
}

/// Runs the given command to completion and returns everything it wrote to
/// stderr.
///
/// Like `timed`, an unsuccessful exit is only a warning. Callers look for
/// what they need in stderr and report their own error when it's absent. On
/// failure, the last line of stderr is included in the warning.
pub fn stderr(cmd: &mut Command) -> anyhow::Result<BString> {
    log::debug!("running command: {:?}", cmd);
    cmd.stdin(Stdio::null());
    let out =
        cmd.output().context("failed to run command and wait for output")?;
    if !out.status.success() {
        let last = out.stderr.lines().last().unwrap_or(b"");
        log::warn!(
            "command {:?} failed with {:?}, last line of stderr: {:?}",
            cmd,
            out.status,
            last.as_bstr(),
        );
    }
    Ok(BString::from(out.stderr))
}

/// This runs the given command synchronously. If there was a problem running
/// the command, then stderr is inspected and its last line is used to
/// construct the error message returned. (The entire stderr is logged at debug
/// level however.)
pub fn output(cmd: &mut Command) -> anyhow::Result<BString> {
    log::debug!("running command: {:?}", cmd);
    let out =
        cmd.output().context("failed to run command and wait for output")?;
    if out.status.success() {
        if !out.stderr.is_empty() {
            log::debug!(
                "success, but stderr is not empty: {}",
                out.stderr.as_bstr()
            );
        }
        return Ok(BString::from(out.stdout));
    }
    log::debug!("command failed, exit status: {:?}", out.status);
    log::debug!("stderr: {}", out.stderr.as_bstr());
    let last = match out.stderr.lines().last() {
        Some(last) => last,
        None => {
            anyhow::bail!(
                "command failed with {:?} but stderr is empty",
                out.status,
            )
        }
    };
    Err(anyhow::anyhow!(
        "command failed, last line of stderr: {:?}",
        last.as_bstr(),
    ))
}
