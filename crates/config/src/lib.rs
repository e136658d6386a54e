//! Layered configuration.
//!
//! Values are merged from, lowest priority first:
//!
//! 1. built-in defaults,
//! 2. a config file (TOML, YAML or JSON by extension): an explicit path, or
//!    `config.toml` in the platform config directory if it exists,
//! 3. `FILECAT_`-prefixed environment variables, nested keys split on `__`
//!    (`FILECAT_CREDENTIALS__KEY_ID`).
//!
//! ```toml
//! bucket_url = "s3://samples/data"
//! file_glob = "csv/*.csv"
//! files_per_page = 50
//!
//! [credentials]
//! kind = "s3"
//! key_id = "..."
//! key_secret = "..."
//! endpoint = "https://s3.us-west-004.backblazeb2.com"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use filecat_catalog::{Credentials, DEFAULT_FILES_PER_PAGE, DEFAULT_PATTERN, RunOptions, Source};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "FILECAT_";
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Location identifier to catalogue. Required.
    pub bucket_url: String,
    pub credentials: Credentials,
    pub file_glob: String,
    /// Signed so that a negative value is reported rather than wrapped.
    pub files_per_page: i64,
    pub extract_content: bool,
    /// Backends kept open between runs. Zero disables the cache.
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket_url: String::new(),
            credentials: Credentials::None,
            file_glob: DEFAULT_PATTERN.to_string(),
            files_per_page: DEFAULT_FILES_PER_PAGE as i64,
            extract_content: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Config {
    /// Default config file: `<config dir>/filecat/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "filecat").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// All layers, unextracted, so callers can merge their own overrides on
    /// top.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](ErrorKind::NotFound) if an explicit `path` doesn't
    ///   exist. The default path is skipped when missing.
    /// - [`UnsupportedFormat`](ErrorKind::UnsupportedFormat) if the file
    ///   extension isn't `toml`, `yaml`/`yml` or `json`.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.is_file()),
        };
        let figment = match file {
            Some(file) => {
                tracing::debug!(path = %file.display(), "Loading config file");
                Self::merge_file(figment, &file)?
            },
            None => figment,
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        let figment = match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        };
        Ok(figment)
    }

    /// Load every layer and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(path)?)
    }

    /// Extract and validate.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks serde can't express.
    pub fn validate(&self) -> Result<()> {
        if self.bucket_url.is_empty() {
            exn::bail!(ErrorKind::Invalid("bucket_url is required".to_string()));
        }
        if self.files_per_page <= 0 {
            exn::bail!(ErrorKind::Invalid(format!(
                "files_per_page must be positive, got {}",
                self.files_per_page
            )));
        }
        if self.file_glob.is_empty() {
            exn::bail!(ErrorKind::Invalid("file_glob is empty".to_string()));
        }
        Ok(())
    }

    pub fn source(&self) -> Source {
        Source::Located {
            location: self.bucket_url.clone(),
            credentials: self.credentials.clone(),
        }
    }

    pub fn run_options(&self) -> Result<RunOptions> {
        let files_per_page = usize::try_from(self.files_per_page)
            .or_raise(|| ErrorKind::Invalid(format!("files_per_page out of range: {}", self.files_per_page)))?;
        Ok(RunOptions {
            file_glob: Some(self.file_glob.clone()),
            files_per_page,
            extract_content: self.extract_content,
        })
    }

    pub fn cache_capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.cache_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn with_file(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn file_only(path: &Path) -> Result<Config> {
        let figment = Config::merge_file(Figment::from(Serialized::defaults(Config::default())), path)?;
        Config::from_figment(&figment)
    }

    #[rstest]
    #[case("config.toml", "bucket_url = \"/srv/data\"\nfiles_per_page = 2\n")]
    #[case("config.yaml", "bucket_url: /srv/data\nfiles_per_page: 2\n")]
    #[case("config.YML", "bucket_url: /srv/data\nfiles_per_page: 2\n")]
    #[case("config.json", r#"{"bucket_url": "/srv/data", "files_per_page": 2}"#)]
    fn test_formats(#[case] name: &str, #[case] contents: &str) {
        let (_dir, path) = with_file(name, contents);
        let config = file_only(&path).unwrap();
        assert_eq!(config.bucket_url, "/srv/data");
        assert_eq!(config.files_per_page, 2);
        assert_eq!(config.file_glob, "*");
        assert_eq!(config.credentials, Credentials::None);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_credentials_table() {
        let (_dir, path) = with_file(
            "config.toml",
            r#"
                bucket_url = "gitfs://samples"

                [credentials]
                kind = "git"
                repo_path = "/srv/repo"
                reference = "v1.0"
            "#,
        );
        let config = file_only(&path).unwrap();
        assert_eq!(
            config.credentials,
            Credentials::Git {
                repo_path: Some(PathBuf::from("/srv/repo")),
                reference: Some("v1.0".to_string()),
            }
        );
    }

    #[rstest]
    #[case("files_per_page = 0")]
    #[case("files_per_page = -5")]
    #[case("file_glob = \"\"")]
    fn test_invalid(#[case] line: &str) {
        let (_dir, path) = with_file("config.toml", &format!("bucket_url = \"/srv\"\n{line}\n"));
        let err = file_only(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_bucket_url_required() {
        let err = Config::from_figment(&Figment::from(Serialized::defaults(Config::default()))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_wrong_type() {
        let (_dir, path) = with_file("config.toml", "bucket_url = \"/srv\"\nextract_content = \"yes please\"\n");
        let err = file_only(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::figment(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let (_dir, path) = with_file("config.ini", "bucket_url=/srv\n");
        let err = Config::figment(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_overrides_merge_on_top() {
        let (_dir, path) = with_file("config.toml", "bucket_url = \"/srv\"\nfiles_per_page = 10\n");
        let figment = Config::merge_file(Figment::from(Serialized::defaults(Config::default())), &path)
            .unwrap()
            .merge(Serialized::default("files_per_page", 3));
        let config = Config::from_figment(&figment).unwrap();
        assert_eq!(config.files_per_page, 3);
        assert_eq!(config.bucket_url, "/srv");
    }

    #[test]
    fn test_run_options() {
        let config = Config {
            bucket_url: "/srv".to_string(),
            files_per_page: 7,
            extract_content: true,
            cache_capacity: 0,
            ..Config::default()
        };
        let options = config.run_options().unwrap();
        assert_eq!(options.files_per_page, 7);
        assert_eq!(options.file_glob.as_deref(), Some("*"));
        assert!(options.extract_content);
        assert_eq!(config.cache_capacity(), None);
        assert!(matches!(config.source(), Source::Located { location, .. } if location == "/srv"));
    }
}
