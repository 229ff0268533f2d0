//! Structured error types for the appcast updater.
//!
//! Every variant is fatal: the run stops and no output file is written.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppcastError {
  #[error("missing environment variable {0}")]
  MissingEnv(&'static str),

  #[error("environment variable {0} is not valid unicode")]
  InvalidEnv(&'static str),

  #[error("io: {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("signature: {token:?}: {reason}")]
  Signature { token: String, reason: String },

  #[error("xml: {0}")]
  Xml(#[from] quick_xml::Error),

  #[error("feed: {0}")]
  Feed(String),

  #[error("pubDate: {value:?}: {source}")]
  PubDate {
    value: String,
    #[source]
    source: chrono::ParseError,
  },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl AppcastError {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  pub fn signature(token: &str, reason: &str) -> Self {
    Self::Signature {
      token: token.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn feed(msg: impl Into<String>) -> Self {
    Self::Feed(msg.into())
  }
}
