//! Environment-variable resolution for manifest templates.
//!
//! Placeholders come in two forms, matching what the manifests actually use:
//! - `${NAME}` - required; resolution fails if `NAME` is not set
//! - `${NAME:-default}` - falls back to `default` when `NAME` is unset or
//!   set to the empty string
//!
//! Substitution is a single pass; a default value is inserted literally and
//! never re-expanded.

use crate::{ConfigError, ConfigResult};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// Regex for matching ${NAME} and ${NAME:-default} placeholders
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").unwrap()
});

/// The set of variables templates resolve against.
///
/// Always an explicit map; nothing here reads `std::env` behind your back.
/// Use [`Environment::from_process`] to capture the process environment.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Set a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Builder-style [`set`](Self::set), convenient in tests.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|s| s.as_str())
    }

    /// Substitute every placeholder in `input`.
    ///
    /// Fails with [`ConfigError::UnresolvedVariable`] naming the variable
    /// when a placeholder without a default refers to an unset variable.
    pub fn interpolate(&self, input: &str) -> ConfigResult<String> {
        let mut out = String::with_capacity(input.len());
        let mut last = 0;

        for caps in VAR_REGEX.captures_iter(input) {
            let matched = caps.get(0).unwrap();
            out.push_str(&input[last..matched.start()]);
            last = matched.end();

            let name = &caps[1];
            match self.get(name) {
                Some(value) if !value.is_empty() => out.push_str(value),
                Some(_) => {
                    // Set but empty: the default wins, like the shell's `:-`.
                    if let Some(default) = caps.get(2) {
                        out.push_str(default.as_str());
                    }
                }
                None => match caps.get(2) {
                    Some(default) => out.push_str(default.as_str()),
                    None => return Err(ConfigError::UnresolvedVariable(name.to_string())),
                },
            }
        }

        out.push_str(&input[last..]);
        Ok(out)
    }

    /// Substitute placeholders in a list of templates.
    pub fn interpolate_vec(&self, inputs: &[String]) -> ConfigResult<Vec<String>> {
        inputs.iter().map(|s| self.interpolate(s)).collect()
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}
