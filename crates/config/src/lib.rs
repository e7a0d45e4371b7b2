//! Configuration for hoist.
//!
//! Values are layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. `config.toml` in the platform configuration directory
//! 3. An explicitly requested file (TOML, YAML or JSON, by extension)
//! 4. `HOIST_*` environment variables, using `__` to separate nested keys
//!    (e.g. `HOIST_LIMITS__MAX_BATCH_MB=100`)

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use hoist_compress::{BYTES_PER_MB, CompressOptions};
use hoist_storage::{DEFAULT_AUTHORIZATION_ENDPOINT, UploadOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APPLICATION: &str = "hoist";
const ENV_PREFIX: &str = "HOIST_";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    pub compression: Compression,
    pub upload: Upload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Largest accepted batch, in megabytes (1 MB = 1,048,576 bytes).
    pub max_batch_mb: u64,
}
impl Default for Limits {
    fn default() -> Self {
        Self { max_batch_mb: 500 }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Compression {
    pub enabled: bool,
    pub max_size_mb: f64,
    pub max_dimension: u32,
    pub initial_quality: u8,
    /// Per-image budget before the original bytes are used instead.
    pub timeout_secs: u64,
}
impl Default for Compression {
    fn default() -> Self {
        let options = CompressOptions::default();
        Self {
            enabled: true,
            max_size_mb: 1.0,
            max_dimension: options.max_dimension,
            initial_quality: options.initial_quality,
            timeout_secs: 60,
        }
    }
}
impl Compression {
    pub fn options(&self) -> CompressOptions {
        CompressOptions {
            max_size_bytes: (self.max_size_mb * BYTES_PER_MB as f64) as u64,
            max_dimension: self.max_dimension,
            initial_quality: self.initial_quality,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Upload {
    /// Server-side endpoint used to authorize (sign) each upload.
    pub authorization_endpoint: String,
}
impl Default for Upload {
    fn default() -> Self {
        Self {
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
        }
    }
}
impl Upload {
    pub fn options(&self) -> UploadOptions {
        UploadOptions::new(&self.authorization_endpoint)
    }
}

/// Where uploads go.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Target {
    Local {
        root: PathBuf,
    },
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        public_url: Option<String>,
        key_id: String,
        key_secret: String,
    },
}

impl Config {
    /// Build the layered [`Figment`] without extracting it.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = default_path() {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate the configuration.
    ///
    /// A missing default file is fine; a missing `explicit` file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit
            && !path.is_file()
        {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let config: Config = Self::figment(explicit).extract().map_err(|e| ErrorKind::Load(e.to_string()))?;
        config.validate()?;
        // Not `?config`: the S3 target carries credentials.
        tracing::debug!(
            max_batch_mb = config.limits.max_batch_mb,
            compression = config.compression.enabled,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limits.max_batch_mb == 0 {
            exn::bail!(ErrorKind::Invalid("limits.max_batch_mb", "must be greater than zero"));
        }
        if !(self.compression.max_size_mb.is_finite() && self.compression.max_size_mb > 0.0) {
            exn::bail!(ErrorKind::Invalid("compression.max_size_mb", "must be a positive number"));
        }
        if self.compression.max_dimension == 0 {
            exn::bail!(ErrorKind::Invalid("compression.max_dimension", "must be greater than zero"));
        }
        if !(1..=100).contains(&self.compression.initial_quality) {
            exn::bail!(ErrorKind::Invalid("compression.initial_quality", "must be between 1 and 100"));
        }
        if let Some(Target::Local { root }) = &self.target
            && !root.is_absolute()
        {
            exn::bail!(ErrorKind::Invalid("target.root", "must be an absolute path"));
        }
        Ok(())
    }

    /// Largest accepted batch, in bytes.
    pub fn max_batch_bytes(&self) -> u64 {
        self.limits.max_batch_mb.saturating_mul(BYTES_PER_MB)
    }
}

/// Location of the per-user configuration file, if the platform has one.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APPLICATION).map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.limits.max_batch_mb, 500);
        assert_eq!(config.max_batch_bytes(), 500 * 1_048_576);
        assert!(config.compression.enabled);
        assert_eq!(config.compression.options(), CompressOptions::default());
        assert_eq!(config.upload.options().authorization_endpoint, DEFAULT_AUTHORIZATION_ENDPOINT);
        assert_eq!(config.target, None);
        config.validate().unwrap();
    }

    #[test]
    fn test_explicit_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "hoist.toml",
                r#"
                [limits]
                max_batch_mb = 100

                [compression]
                enabled = false

                [target]
                type = "local"
                root = "/srv/uploads"
                "#,
            )?;
            let config = Config::load(Some(Path::new("hoist.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.limits.max_batch_mb, 100);
            assert!(!config.compression.enabled);
            // Untouched keys keep their defaults
            assert_eq!(config.compression.max_dimension, 1920);
            assert_eq!(config.target, Some(Target::Local { root: PathBuf::from("/srv/uploads") }));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "hoist.yaml",
                "target:\n  type: s3\n  bucket: media\n  region: auto\n  key_id: id\n  key_secret: secret\n",
            )?;
            let config = Config::load(Some(Path::new("hoist.yaml"))).map_err(|e| e.to_string())?;
            match config.target {
                Some(Target::S3 { bucket, prefix, .. }) => {
                    assert_eq!(bucket, "media");
                    assert_eq!(prefix, None);
                },
                other => panic!("unexpected target: {other:?}"),
            }
            Ok(())
        });
    }

    #[rstest]
    #[case("hoist.toml", "[limits]\nmax_batch_mb = 42\n")]
    #[case("hoist.yaml", "limits:\n  max_batch_mb: 42\n")]
    #[case("hoist.yml", "limits:\n  max_batch_mb: 42\n")]
    #[case("hoist.json", r#"{"limits": {"max_batch_mb": 42}}"#)]
    fn test_format_follows_extension(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = Config::load(Some(Path::new(name))).map_err(|e| e.to_string())?;
            assert_eq!(config.limits.max_batch_mb, 42);
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file("hoist.toml", "[limits]\nmax_batch_mb = 100\n")?;
            jail.set_env("HOIST_LIMITS__MAX_BATCH_MB", "250");
            jail.set_env("HOIST_UPLOAD__AUTHORIZATION_ENDPOINT", "/api/media/upload");
            let config = Config::load(Some(Path::new("hoist.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.limits.max_batch_mb, 250);
            assert_eq!(config.upload.authorization_endpoint, "/api/media/upload");
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.compression.initial_quality = 0;
        assert!(matches!(&*config.validate().unwrap_err(), ErrorKind::Invalid("compression.initial_quality", _)));

        let mut config = Config::default();
        config.target = Some(Target::Local { root: PathBuf::from("relative/uploads") });
        assert!(matches!(&*config.validate().unwrap_err(), ErrorKind::Invalid("target.root", _)));

        let mut config = Config::default();
        config.compression.max_size_mb = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compression_options_in_bytes() {
        let compression = Compression { max_size_mb: 0.5, ..Compression::default() };
        assert_eq!(compression.options().max_size_bytes, 524_288);
        assert_eq!(compression.timeout(), Duration::from_secs(60));
    }
}
