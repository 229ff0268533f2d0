//! Ghostty appcast updater.
//!
//! Rewrites a Sparkle appcast for a tagged release: drops stale and
//! undated items, prunes to the newest entries, and appends one item for
//! the current build whose enclosure carries the `sign_update` signature.
//!
//! Single pass, no network; the input feed is never modified in place.

pub mod config;
pub mod error;
pub mod feed;
pub mod item;
pub mod signature;
pub mod types;
pub mod xml;

use std::fs;

use tracing::info;

pub use config::{Config, Release};
pub use error::AppcastError;
pub use signature::SignatureAttrs;
pub use types::UpdateReport;
pub use xml::Document;

/// Apply the whole update to an in-memory feed.
pub fn update_feed(
  doc: &mut Document,
  config: &Config,
  release: &Release,
  signature: &SignatureAttrs,
) -> Result<UpdateReport, AppcastError> {
  let new_item = item::build(config, release, signature, &doc.namespaces);
  let channel = feed::channel_mut(doc)?;

  let removed = feed::remove_stale(channel, &release.build);
  let pruned = feed::prune(channel, config.retain_limit)?;
  let retained = channel.children_named(&feed::item_name()).count();

  channel.push(new_item);

  Ok(UpdateReport {
    build: release.build.clone(),
    version: release.version.clone(),
    pub_date: feed::format_pub_date(release.now),
    removed_same_build: removed.same_build,
    removed_undated: removed.undated,
    pruned,
    retained,
    total_items: retained + 1,
    output: None,
  })
}

/// Read the signature and feed files, update, and write the new feed once.
pub fn run(config: &Config, release: &Release) -> Result<UpdateReport, AppcastError> {
  let raw_signature = fs::read_to_string(&config.signature_path)
    .map_err(|e| AppcastError::io(&config.signature_path, e))?;
  let signature = signature::parse(&raw_signature)?;

  let raw_feed =
    fs::read_to_string(&config.feed_path).map_err(|e| AppcastError::io(&config.feed_path, e))?;
  let mut doc = Document::parse(&raw_feed)?;
  info!(
    path = %config.feed_path.display(),
    attributes = signature.len(),
    "loaded appcast"
  );

  let mut report = update_feed(&mut doc, config, release, &signature)?;

  fs::write(&config.output_path, doc.to_xml())
    .map_err(|e| AppcastError::io(&config.output_path, e))?;
  info!(
    path = %config.output_path.display(),
    build = %report.build,
    removed_same_build = report.removed_same_build,
    removed_undated = report.removed_undated,
    pruned = report.pruned,
    items = report.total_items,
    "wrote appcast"
  );

  report.output = Some(config.output_path.clone());
  Ok(report)
}
