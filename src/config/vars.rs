use std::{collections::HashMap, sync::LazyLock};

use regex::{Captures, Regex};

// `$$` escapes a dollar sign. Names are word characters and `.`.
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$|
        \$([[:word:].]+)|
        \$\{([[:word:].]+)(?:(:?-|:?\?)([^}]*))?\}",
    )
    .expect("invalid variable pattern")
});

/// Replaces environment variable references in `input`.
///
/// Supports `$VAR`, `${VAR}`, `${VAR:-default}`, `${VAR-default}`,
/// `${VAR:?error}` and `${VAR?error}` with shell semantics. Unknown variables
/// become empty strings and are reported as warnings; failed `?` checks are
/// errors. Returns the interpolated text and the warnings.
pub fn interpolate(
    input: &str,
    vars: &HashMap<String, String>,
) -> Result<(String, Vec<String>), Vec<String>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let output = VARIABLE.replace_all(input, |caps: &Captures<'_>| {
        let Some(name) = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) else {
            return "$".to_owned();
        };
        let value = vars.get(name).map(String::as_str);
        let operator = caps.get(3).map_or("", |m| m.as_str());
        let argument = caps.get(4).map_or("", |m| m.as_str());

        let resolved = match (operator, value) {
            (":-", Some(v)) if !v.is_empty() => v,
            (":-", _) => argument,
            ("-", v) => v.unwrap_or(argument),
            (":?", Some(v)) if !v.is_empty() => v,
            ("?", Some(v)) => v,
            (":?" | "?", _) => {
                errors.push(format!(
                    "Required environment variable {:?} is missing or empty: {}",
                    name, argument
                ));
                ""
            }
            (_, Some(v)) => v,
            (_, None) => {
                warnings.push(format!("Unknown environment variable {:?} in config.", name));
                ""
            }
        };
        resolved.to_owned()
    });

    if errors.is_empty() {
        Ok((output.into_owned(), warnings))
    } else {
        Err(errors)
    }
}
