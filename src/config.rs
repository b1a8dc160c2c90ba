//! Startup configuration
//!
//! Read once from an optional TOML file, then overridden by command-line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{AuthorizationSet, DEFAULT_NOTIFY_TIMEOUT, MqttConfig};
use crate::detection::ocr::OcrModelPaths;

/// Contents of the configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub authorized_plates: Vec<String>,
    #[serde(default)]
    pub ocr: OcrSection,
    pub notify: Option<MqttConfig>,
}

/// Model locations; unset paths fall back to the `ocrs` cache
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OcrSection {
    pub detection_model: Option<PathBuf>,
    pub recognition_model: Option<PathBuf>,
}

/// Values given on the command line; each one wins over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Added to the file's list, not replacing it
    pub authorized: Vec<String>,
    pub detection_model: Option<PathBuf>,
    pub recognition_model: Option<PathBuf>,
    pub mqtt_host: Option<String>,
    pub mqtt_port: Option<u16>,
    pub mqtt_topic: Option<String>,
    pub notify_timeout: Option<Duration>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub authorized: AuthorizationSet,
    pub ocr_models: OcrModelPaths,
    /// `None` disables notification
    pub notify: Option<MqttConfig>,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Split `--authorized` values on commas, so both repeated flags and
/// `A,B,C` lists work
fn split_plates(values: &[String]) -> impl Iterator<Item = &str> {
    values.iter().flat_map(|v| v.split(','))
}

fn resolve_ocr(section: OcrSection, overrides: &Overrides) -> Result<OcrModelPaths> {
    let detection = overrides.detection_model.clone().or(section.detection_model);
    let recognition = overrides.recognition_model.clone().or(section.recognition_model);
    if let (Some(detection_model), Some(recognition_model)) = (&detection, &recognition) {
        return Ok(OcrModelPaths {
            detection_model: detection_model.clone(),
            recognition_model: recognition_model.clone(),
        });
    }

    let defaults = OcrModelPaths::from_cache_dir().map_err(anyhow::Error::from)?;
    Ok(OcrModelPaths {
        detection_model: detection.unwrap_or(defaults.detection_model),
        recognition_model: recognition.unwrap_or(defaults.recognition_model),
    })
}

fn resolve_notify(file: Option<MqttConfig>, overrides: &Overrides) -> Result<Option<MqttConfig>> {
    let mut config = match (file, &overrides.mqtt_host) {
        (Some(mut config), host) => {
            if let Some(host) = host {
                config.host = host.clone();
            }
            config
        }
        (None, Some(host)) => {
            let topic = overrides
                .mqtt_topic
                .clone()
                .context("--mqtt-topic is required when --mqtt-host is given")?;
            MqttConfig {
                host: host.clone(),
                port: 1883,
                topic,
                client_id: "plategate".to_string(),
                timeout: DEFAULT_NOTIFY_TIMEOUT,
            }
        }
        (None, None) => return Ok(None),
    };

    if let Some(port) = overrides.mqtt_port {
        config.port = port;
    }
    if let Some(topic) = &overrides.mqtt_topic {
        config.topic = topic.clone();
    }
    if let Some(timeout) = overrides.notify_timeout {
        config.timeout = timeout;
    }
    Ok(Some(config))
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: &Overrides) -> Result<Self> {
        let plates: Vec<&str> = file
            .authorized_plates
            .iter()
            .map(String::as_str)
            .chain(split_plates(&overrides.authorized))
            .collect();

        Ok(Self {
            authorized: AuthorizationSet::new(plates),
            ocr_models: resolve_ocr(file.ocr, overrides)?,
            notify: resolve_notify(file.notify, overrides)?,
        })
    }

    /// Read the optional file and apply overrides
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let file = match path {
            Some(path) => load_config(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn explicit_models() -> Overrides {
        Overrides {
            detection_model: Some(PathBuf::from("/m/det.rten")),
            recognition_model: Some(PathBuf::from("/m/rec.rten")),
            ..Default::default()
        }
    }

    #[test]
    fn full_file_is_loaded() {
        let file = write_config(
            r#"
authorized_plates = ["CKN364", "MXL 931"]

[ocr]
detection_model = "/models/det.rten"
recognition_model = "/models/rec.rten"

[notify]
host = "broker.local"
port = 1884
topic = "parking/access"
timeout_secs = 8
"#,
        );
        let settings = Settings::load(Some(file.path()), &Overrides::default()).unwrap();
        assert!(settings.authorized.contains("CKN364"));
        assert!(settings.authorized.contains("MXL931"));
        assert_eq!(settings.ocr_models.detection_model, PathBuf::from("/models/det.rten"));

        let notify = settings.notify.unwrap();
        assert_eq!(notify.host, "broker.local");
        assert_eq!(notify.port, 1884);
        assert_eq!(notify.timeout, Duration::from_secs(8));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_config("authorised = [\"CKN364\"]\n");
        assert!(Settings::load(Some(file.path()), &Overrides::default()).is_err());
    }

    #[test]
    fn cli_plates_extend_file_plates() {
        let file = FileConfig {
            authorized_plates: vec!["CKN364".into()],
            ..Default::default()
        };
        let overrides = Overrides {
            authorized: vec!["MXL931,ABC123".into(), "XYZ9".into()],
            ..explicit_models()
        };
        let settings = Settings::resolve(file, &overrides).unwrap();
        assert_eq!(settings.authorized.len(), 4);
        assert!(settings.authorized.contains("ABC123"));
    }

    #[test]
    fn notification_disabled_without_host() {
        let settings = Settings::resolve(FileConfig::default(), &explicit_models()).unwrap();
        assert!(settings.notify.is_none());
    }

    #[test]
    fn cli_host_requires_topic() {
        let overrides = Overrides {
            mqtt_host: Some("localhost".into()),
            ..explicit_models()
        };
        assert!(Settings::resolve(FileConfig::default(), &overrides).is_err());
    }

    #[test]
    fn cli_overrides_file_notify_settings() {
        let file = FileConfig {
            notify: Some(MqttConfig {
                host: "a".into(),
                port: 1883,
                topic: "t".into(),
                client_id: "plategate".into(),
                timeout: DEFAULT_NOTIFY_TIMEOUT,
            }),
            ..Default::default()
        };
        let overrides = Overrides {
            mqtt_port: Some(2883),
            notify_timeout: Some(Duration::from_secs(9)),
            ..explicit_models()
        };
        let notify = Settings::resolve(file, &overrides).unwrap().notify.unwrap();
        assert_eq!(notify.host, "a");
        assert_eq!(notify.port, 2883);
        assert_eq!(notify.timeout, Duration::from_secs(9));
    }
}
