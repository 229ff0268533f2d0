//! Run summary emitted on stdout as one JSON line.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::AppcastError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
  pub build: String,
  pub version: String,
  /// `pubDate` stamped on the new item.
  pub pub_date: String,
  /// Existing items whose `sparkle:version` matched the current build.
  pub removed_same_build: usize,
  /// Existing items without a `pubDate`.
  pub removed_undated: usize,
  /// Oldest items dropped beyond the retention limit.
  pub pruned: usize,
  /// Existing items carried over into the new feed.
  pub retained: usize,
  /// Items in the new feed, including the appended one.
  pub total_items: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output: Option<PathBuf>,
}

impl UpdateReport {
  /// Compact JSON, newline-terminated.
  pub fn to_json_line(&self) -> Result<String, AppcastError> {
    let mut line = serde_json::to_string(self)?;
    line.push('\n');
    Ok(line)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn json_line_is_single_terminated_line() {
    let report = UpdateReport {
      build: "42".into(),
      version: "1.2.0".into(),
      pub_date: "Sat, 01 Feb 2025 08:30:00 +0000".into(),
      removed_same_build: 1,
      removed_undated: 0,
      pruned: 2,
      retained: 15,
      total_items: 16,
      output: None,
    };
    let line = report.to_json_line().unwrap();
    assert!(line.ends_with('\n'));
    assert_eq!(line.matches('\n').count(), 1);

    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["pruned"], 2);
    assert!(value.get("output").is_none());
  }
}
