use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CaptureError, Result};

/// Recorder parameters as handed over by the test-runner configuration.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    pub values: BTreeMap<String, String>,
}

impl Parameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// First present key wins; used for legacy aliases.
    #[must_use]
    pub fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        let value = raw.trim().to_ascii_lowercase();
        match value.as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(CaptureError::invalid_parameter(key, raw)),
        }
    }

    pub fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<u32>()
                    .map_err(|_| CaptureError::invalid_parameter(key, raw))
            })
            .transpose()
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| CaptureError::invalid_parameter(key, raw))
            })
            .transpose()
    }
}

pub fn load_parameters(path: &Path) -> Result<Parameters> {
    let content = std::fs::read_to_string(path)?;
    Ok(Parameters {
        values: parse_parameter_content(&content),
    })
}

#[must_use]
pub fn parse_parameter_content(content: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim().to_string();
        let mut value = value_raw.trim().to_string();

        if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
            value = value[1..value.len() - 1].to_string();
        }

        values.insert(key, value);
    }

    values
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::error::CaptureError;

    use super::{Parameters, load_parameters, parse_parameter_content};

    #[test]
    fn parse_env_fragment() {
        let parsed = parse_parameter_content(
            r#"
                # comment
                tagFilter=javascript
                size="1280x720"
                not a pair
            "#,
        );

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("tagFilter"), Some(&"javascript".to_string()));
        assert_eq!(parsed.get("size"), Some(&"1280x720".to_string()));
    }

    #[test]
    fn typed_getters_parse_and_reject_values_as_expected() {
        let params = Parameters::new()
            .with("bool_true", "yes")
            .with("bool_false", "off")
            .with("u32_value", "30")
            .with("u64_value", "900000")
            .with("bad_bool", "maybe")
            .with("bad_u32", "-1");

        assert_eq!(params.get_bool("bool_true").expect("bool"), Some(true));
        assert_eq!(params.get_bool("bool_false").expect("bool"), Some(false));
        assert_eq!(params.get_bool("absent").expect("absent bool"), None);
        assert_eq!(params.get_u32("u32_value").expect("u32"), Some(30));
        assert_eq!(params.get_u64("u64_value").expect("u64"), Some(900_000));

        match params.get_bool("bad_bool").expect_err("bad bool") {
            CaptureError::InvalidParameter { key, value } => {
                assert_eq!(key, "bad_bool");
                assert_eq!(value, "maybe");
            }
            other => panic!("expected InvalidParameter, got {other}"),
        }
        assert!(params.get_u32("bad_u32").is_err());
    }

    #[test]
    fn get_any_prefers_first_listed_key() {
        let params = Parameters::new()
            .with("pathToFfmpeg", "/usr/bin/ffmpeg")
            .with("recorderPath", "/opt/ffmpeg");
        assert_eq!(
            params.get_any(&["recorderPath", "pathToFfmpeg"]),
            Some("/opt/ffmpeg")
        );
        assert_eq!(params.get_any(&["missing"]), None);
    }

    #[test]
    fn load_parameters_reads_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("capture.env");
        std::fs::write(&path, "display=:99\nreportsPath=\"out/videos\"\n").expect("write params");

        let params = load_parameters(&path).expect("load params");
        assert_eq!(params.get("display"), Some(":99"));
        assert_eq!(params.get("reportsPath"), Some("out/videos"));
    }
}
