//! Environment variable interpolation for config files.
//!
//! Supported forms:
//! - `$VAR` or `${VAR}`: value of VAR, error if unset
//! - `${VAR:-fallback}`: fallback when VAR is unset or empty
//! - `${VAR-fallback}`: fallback only when VAR is unset
//! - `$$`: a literal `$`

use regex::{Captures, Regex};
use snafu::prelude::*;
use std::env;
use std::sync::LazyLock;

use crate::error::{ConfigError, EnvInterpolationSnafu};

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?P<escape>\$\$)
        |
        \$\{
            (?P<braced>[A-Za-z_][A-Za-z0-9_]*)
            (?: (?P<op>:?-) (?P<fallback>[^}]*) )?
        \}
        |
        \$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)
        ",
    )
    .expect("interpolation pattern is valid")
});

/// Replace every variable reference in `input`.
///
/// All problems are collected before failing so a single run reports every
/// missing variable.
pub fn interpolate(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut problems = Vec::new();
    let mut last = 0;

    for caps in REFERENCE.captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        output.push_str(&input[last..whole.start()]);
        last = whole.end();

        match resolve(&caps) {
            Ok(value) => output.push_str(&value),
            Err(problem) => {
                problems.push(problem);
                output.push_str(whole.as_str());
            }
        }
    }
    output.push_str(&input[last..]);

    ensure!(
        problems.is_empty(),
        EnvInterpolationSnafu {
            message: problems.join("\n")
        }
    );
    Ok(output)
}

fn resolve(caps: &Captures<'_>) -> Result<String, String> {
    if caps.name("escape").is_some() {
        return Ok("$".to_string());
    }

    let name = caps
        .name("braced")
        .or_else(|| caps.name("bare"))
        .map(|m| m.as_str())
        .unwrap_or_default();
    let op = caps.name("op").map(|m| m.as_str());
    let fallback = caps.name("fallback").map(|m| m.as_str());

    match env::var(name) {
        Ok(value) if value.contains(['\n', '\r']) => Err(format!(
            "environment variable '{name}' contains a line break"
        )),
        Ok(value) if value.is_empty() && op == Some(":-") => {
            Ok(fallback.unwrap_or_default().to_string())
        }
        Ok(value) => Ok(value),
        Err(_) => fallback
            .map(str::to_string)
            .ok_or_else(|| format!("environment variable '{name}' is not set")),
    }
}
