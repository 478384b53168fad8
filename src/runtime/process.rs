//! External process execution.

use anyhow::{Context, Result, bail};
use log::debug;
use std::process::Command;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn run_command_impl(&self, program: &str, args: &[String]) -> Result<Vec<u8>> {
        debug!("Running {} {}", program, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run '{}'", program))?;

        if !output.status.success() {
            bail!(
                "'{} {}' exited with {}: {}",
                program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(output.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};

    #[test]
    fn test_run_command_captures_stdout() {
        let runtime = RealRuntime;
        let out = runtime
            .run_command("echo", &["[]".to_string()])
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "[]");
    }

    #[test]
    fn test_run_command_reports_failure() {
        let runtime = RealRuntime;
        let err = runtime.run_command("false", &[]).unwrap_err();
        assert!(err.to_string().contains("'false ' exited with"));
    }

    #[test]
    fn test_run_command_missing_program() {
        let runtime = RealRuntime;
        let err = runtime
            .run_command("bfm-no-such-program", &[])
            .unwrap_err();
        assert!(err.to_string().contains("Failed to run 'bfm-no-such-program'"));
    }
}
