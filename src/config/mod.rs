//! Loading the output configuration.
//!
//! The file is read, `${VAR}` references are replaced from the environment,
//! and the result is deserialized and validated as an [`InfluxDbConfig`].

use std::{collections::HashMap, fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

pub mod format;
mod vars;

pub use self::format::{Format, FormatHint};
use crate::sinks::influxdb::InfluxDbConfig;

/// A secret that never shows up in logs.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SensitiveString(String);

impl SensitiveString {
    pub fn inner(&self) -> &str {
        &self.0
    }
}

impl From<String> for SensitiveString {
    fn from(value: String) -> Self {
        SensitiveString(value)
    }
}

impl From<&str> for SensitiveString {
    fn from(value: &str) -> Self {
        SensitiveString(value.to_owned())
    }
}

impl fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"**REDACTED**\"")
    }
}

impl fmt::Display for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("**REDACTED**")
    }
}

pub fn load_from_path(path: &Path, format: FormatHint) -> Result<InfluxDbConfig, Vec<String>> {
    let format = format
        .or_else(|| Format::from_path(path).ok())
        .unwrap_or_default();
    let content = fs::read_to_string(path)
        .map_err(|error| vec![format!("Could not read config file {:?}: {}", path, error)])?;

    load_from_str(&content, format)
}

pub fn load_from_str(content: &str, format: Format) -> Result<InfluxDbConfig, Vec<String>> {
    let vars = std::env::vars().collect::<HashMap<_, _>>();
    load_with_vars(content, format, &vars)
}

fn load_with_vars(
    content: &str,
    format: Format,
    vars: &HashMap<String, String>,
) -> Result<InfluxDbConfig, Vec<String>> {
    let (content, warnings) = vars::interpolate(content, vars)?;
    for warning in warnings {
        warn!("{}", warning);
    }

    let config: InfluxDbConfig = format::deserialize(&content, format)?;
    config.validate().map_err(|error| vec![error.to_string()])?;

    debug!(message = "Configuration loaded.", address = %config.address, database = %config.database);
    Ok(config)
}
