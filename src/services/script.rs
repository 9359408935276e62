use crate::error::{ChainError, Result};
use log::debug;
use std::path::Path;
use std::process::Command;

/// Runs a staged script against a staged dataset.
pub trait ScriptRunner: Send + Sync {
    /// Combined output of a successful run
    fn run(&self, script: &Path, data: &Path) -> Result<String>;
}

/// Invokes `<interpreter> <script> <data>`
pub struct PythonRunner {
    interpreter: String,
}

impl Default for PythonRunner {
    fn default() -> Self {
        Self::new("python")
    }
}

impl PythonRunner {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl ScriptRunner for PythonRunner {
    fn run(&self, script: &Path, data: &Path) -> Result<String> {
        let output = Command::new(&self.interpreter)
            .arg(script)
            .arg(data)
            .output()
            .map_err(|e| ChainError::Script(format!("Failed to start {}: {e}", self.interpreter)))?;

        // stdout first, then stderr
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ChainError::Script(format!(
                "{} exited with {}, output: {combined}",
                script.display(),
                output.status
            )));
        }
        debug!("{} produced {} bytes", script.display(), combined.len());
        Ok(combined)
    }
}
