use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterpolationError {
    #[error("Required environment variable not found: {0}")]
    RequiredVarNotFound(String),

    #[error("Recursive interpolation limit exceeded")]
    RecursionLimit,
}

pub type InterpolationResult<T> = Result<T, InterpolationError>;

const MAX_RECURSION_DEPTH: usize = 10;

// ${NAME} or ${NAME:-default}
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("Invalid regex pattern")
});

/// Replaces `${NAME}` and `${NAME:-default}` references with environment values
pub fn interpolate(input: &str) -> InterpolationResult<String> {
    interpolate_with_depth(input, 0)
}

fn interpolate_with_depth(input: &str, depth: usize) -> InterpolationResult<String> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(InterpolationError::RecursionLimit);
    }

    let mut result = String::with_capacity(input.len());
    let mut last = 0;

    for cap in VAR_PATTERN.captures_iter(input) {
        let Some(whole) = cap.get(0) else {
            continue;
        };
        let name = &cap[1];

        let value = match std::env::var(name) {
            Ok(value) => value,
            Err(_) => match cap.get(2) {
                Some(default) => interpolate_with_depth(default.as_str(), depth + 1)?,
                None => return Err(InterpolationError::RequiredVarNotFound(name.to_string())),
            },
        };

        result.push_str(&input[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }

    result.push_str(&input[last..]);
    Ok(result)
}

/// Interpolates every string in a parsed TOML document, recursively
pub fn interpolate_toml(value: &mut toml::Value) -> InterpolationResult<()> {
    match value {
        toml::Value::String(s) => {
            *s = interpolate(s)?;
        }
        toml::Value::Array(arr) => {
            for item in arr {
                interpolate_toml(item)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, v) in table.iter_mut() {
                interpolate_toml(v)?;
            }
        }
        _ => {}
    }
    Ok(())
}
