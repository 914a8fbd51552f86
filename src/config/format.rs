//! Configuration file formats.

use std::{fmt, path::Path, str::FromStr};

use serde::de;

/// An explicit format, or `None` to guess it from the file name.
pub type FormatHint = Option<Format>;

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Format {
    #[default]
    Toml,
    Json,
    Yaml,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "toml" => Ok(Format::Toml),
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            _ => Err(format!("Invalid format: {}", s)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Toml => "toml",
            Format::Json => "json",
            Format::Yaml => "yaml",
        })
    }
}

impl Format {
    /// Guesses the format from the file extension. Extensions are case
    /// sensitive.
    pub fn from_path<T: AsRef<Path>>(path: T) -> Result<Self, T> {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Format::Toml),
            Some("yaml" | "yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(path),
        }
    }
}

pub fn deserialize<T>(content: &str, format: Format) -> Result<T, Vec<String>>
where
    T: de::DeserializeOwned,
{
    match format {
        Format::Toml => toml::from_str(content).map_err(|e| vec![e.to_string()]),
        Format::Yaml => serde_yaml::from_str(content).map_err(|e| vec![e.to_string()]),
        Format::Json => serde_json::from_str(content).map_err(|e| vec![e.to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[test]
    fn from_path() {
        let cases = [
            ("", None),
            ("output", None),
            ("output.conf", None),
            ("output.toml.bak", None),
            ("output.TOML", None),
            (".toml", None),
            ("output.toml", Some(Format::Toml)),
            ("/etc/influxdb-output/output.toml", Some(Format::Toml)),
            ("output.yaml", Some(Format::Yaml)),
            ("output.yml", Some(Format::Yaml)),
            ("dir/output.json", Some(Format::Json)),
        ];

        for (input, expected) in cases {
            assert_eq!(expected, Format::from_path(input).ok(), "{}", input);
        }
    }

    #[test]
    fn from_str() {
        assert_eq!("TOML".parse::<Format>(), Ok(Format::Toml));
        assert_eq!("yml".parse::<Format>(), Ok(Format::Yaml));
        assert!("ini".parse::<Format>().is_err());
    }

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    struct Sample {
        database: String,
        tag_fields: Vec<String>,
    }

    #[test]
    fn formats_agree() {
        let expected = Sample {
            database: "beats".into(),
            tag_fields: vec!["host".into()],
        };
        let inputs = [
            (Format::Toml, "database = \"beats\"\ntag_fields = [\"host\"]"),
            (Format::Yaml, "database: beats\ntag_fields:\n  - host"),
            (Format::Json, r#"{"database": "beats", "tag_fields": ["host"]}"#),
        ];

        for (format, input) in inputs {
            assert_eq!(
                deserialize::<Sample>(input, format),
                Ok(expected.clone()),
                "{}",
                format
            );
        }
    }

    #[test]
    fn reports_parse_errors() {
        let errors = deserialize::<Sample>("database = ", Format::Toml).unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
