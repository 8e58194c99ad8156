//! Environment shared by every child process.

use std::path::Path;

/// Builder for environment variables applied on top of the inherited
/// environment of every child.
#[derive(Debug, Clone, Default)]
pub struct EnvSet {
    vars: Vec<(String, String)>,
}

impl EnvSet {
    /// Create an empty environment set.
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    /// The display the child should open for itself.
    pub fn with_display(mut self, display: &str) -> Self {
        self.vars.push(("DISPLAY".into(), display.into()));
        self
    }

    /// Prefix the inherited `PATH` with the helper directory.
    pub fn with_helper_path(self, helper_dir: &Path) -> Self {
        let current = std::env::var("PATH").unwrap_or_default();
        self.with_helper_path_over(helper_dir, &current)
    }

    fn with_helper_path_over(mut self, helper_dir: &Path, current: &str) -> Self {
        let path = if current.is_empty() {
            helper_dir.display().to_string()
        } else {
            format!("{}:{}", helper_dir.display(), current)
        };
        self.vars.push(("PATH".into(), path));
        self
    }

    /// Build the final environment variable list.
    pub fn build(self) -> Vec<(String, String)> {
        self.vars
    }
}
