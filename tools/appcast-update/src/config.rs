//! Updater configuration and the release descriptor read from the environment.

use std::env::VarError;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::AppcastError;

pub const ENV_VERSION: &str = "GHOSTTY_VERSION";
pub const ENV_BUILD: &str = "GHOSTTY_BUILD";
pub const ENV_COMMIT: &str = "GHOSTTY_COMMIT";
pub const ENV_COMMIT_LONG: &str = "GHOSTTY_COMMIT_LONG";

/// File locations and the fixed literals stamped into every new item.
#[derive(Debug, Clone)]
pub struct Config {
  /// Output of Sparkle's `sign_update` for the release artifact.
  pub signature_path: PathBuf,
  /// Existing appcast, read once and never written.
  pub feed_path: PathBuf,
  /// Destination of the rewritten appcast.
  pub output_path: PathBuf,
  /// Max number of pre-existing items kept after pruning.
  pub retain_limit: usize,
  /// Value of `sparkle:minimumSystemVersion` on the new item.
  pub minimum_system_version: String,
  /// MIME type set on the new item's enclosure.
  pub enclosure_type: String,
  /// Base URL of release artifacts; the version is appended as a path segment.
  pub download_base: String,
  /// Base URL of the release notes pages.
  pub release_notes_base: String,
  /// Repository URL used for the commit link in the description.
  pub repository: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      signature_path: PathBuf::from("sign_update.txt"),
      feed_path: PathBuf::from("appcast.xml"),
      output_path: PathBuf::from("appcast_new.xml"),
      retain_limit: 15,
      minimum_system_version: "13.0.0".into(),
      enclosure_type: "application/octet-stream".into(),
      download_base: "https://release.files.ghostty.org".into(),
      release_notes_base: "https://ghostty.org/docs/install/release-notes".into(),
      repository: "https://github.com/ghostty-org/ghostty".into(),
    }
  }
}

impl Config {
  /// Default configuration with all three files resolved under `dir`.
  pub fn in_dir(dir: &Path) -> Self {
    let mut config = Self::default();
    config.signature_path = dir.join(&config.signature_path);
    config.feed_path = dir.join(&config.feed_path);
    config.output_path = dir.join(&config.output_path);
    config
  }
}

/// Identifiers of the release being published, plus the instant the run started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
  /// Dotted `X.Y.Z` version.
  pub version: String,
  pub build: String,
  pub commit: String,
  pub commit_long: String,
  pub now: DateTime<Utc>,
}

impl Release {
  pub fn from_env() -> Result<Self, AppcastError> {
    Self::from_lookup(|key| std::env::var(key), Utc::now())
  }

  /// Build from an arbitrary variable lookup. Any absent or non-unicode variable is fatal.
  pub fn from_lookup<F>(lookup: F, now: DateTime<Utc>) -> Result<Self, AppcastError>
  where
    F: Fn(&str) -> Result<String, VarError>,
  {
    let get = |key: &'static str| {
      lookup(key).map_err(|e| match e {
        VarError::NotPresent => AppcastError::MissingEnv(key),
        VarError::NotUnicode(_) => AppcastError::InvalidEnv(key),
      })
    };
    Ok(Self {
      version: get(ENV_VERSION)?,
      build: get(ENV_BUILD)?,
      commit: get(ENV_COMMIT)?,
      commit_long: get(ENV_COMMIT_LONG)?,
      now,
    })
  }

  /// Version with dots replaced by dashes, as used in release notes slugs.
  pub fn version_slug(&self) -> String {
    self.version.replace('.', "-")
  }
}
