//! Channel lookup, stale-entry filtering and retention pruning.

use chrono::{DateTime, FixedOffset, Utc, Weekday};
use tracing::debug;

use crate::error::AppcastError;
use crate::xml::{Document, Element, Name};

/// strftime format of `<pubDate>` (RFC 2822 style, numeric offset).
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// [`PUB_DATE_FORMAT`] without the weekday; the weekday name is validated separately.
const PUB_DATE_PARSE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

pub fn channel_name() -> Name {
  Name::local("channel")
}

pub fn item_name() -> Name {
  Name::local("item")
}

pub fn pub_date_name() -> Name {
  Name::local("pubDate")
}

pub fn version_name() -> Name {
  Name::sparkle("version")
}

/// How many items each removal step dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removed {
  pub same_build: usize,
  pub undated: usize,
}

/// Parse a `<pubDate>`. A weekday name is required but need not agree with the date.
pub fn parse_pub_date(value: &str) -> Result<DateTime<FixedOffset>, AppcastError> {
  let trimmed = value.trim();
  let parsed = match trimmed.split_once(", ") {
    Some((weekday, rest)) if is_weekday(weekday) => {
      DateTime::parse_from_str(rest, PUB_DATE_PARSE_FORMAT)
    }
    // Fails on the missing weekday, with chrono's own error.
    _ => DateTime::parse_from_str(trimmed, PUB_DATE_FORMAT),
  };
  parsed.map_err(|source| AppcastError::PubDate {
    value: value.to_string(),
    source,
  })
}

fn is_weekday(name: &str) -> bool {
  name.parse::<Weekday>().is_ok()
}

pub fn format_pub_date(at: DateTime<Utc>) -> String {
  at.format(PUB_DATE_FORMAT).to_string()
}

/// The first `<channel>` under the document root.
pub fn channel_mut(doc: &mut Document) -> Result<&mut Element, AppcastError> {
  doc
    .root
    .child_mut(&channel_name())
    .ok_or_else(|| AppcastError::feed("no <channel> element under the root"))
}

/// Whether the item's `sparkle:version` text equals `build` exactly.
fn is_same_build(item: &Element, build: &str) -> bool {
  item
    .child(&version_name())
    .is_some_and(|v| v.text() == build)
}

/// Drop items for `build` and items without a `<pubDate>`, in a single pass.
pub fn remove_stale(channel: &mut Element, build: &str) -> Removed {
  let item = item_name();
  let pub_date = pub_date_name();
  let mut removed = Removed::default();

  channel.retain_elements(|el| {
    if el.name != item {
      return true;
    }
    if is_same_build(el, build) {
      debug!(build, "dropping item for the current build");
      removed.same_build += 1;
      return false;
    }
    if el.child(&pub_date).is_none() {
      debug!("dropping item without pubDate");
      removed.undated += 1;
      return false;
    }
    true
  });

  removed
}

/// Keep the `limit` most recent items. Survivors stay in document order.
/// Returns how many items were pruned.
pub fn prune(channel: &mut Element, limit: usize) -> Result<usize, AppcastError> {
  let item = item_name();
  let pub_date = pub_date_name();

  let mut dated: Vec<(usize, DateTime<FixedOffset>)> = Vec::new();
  for (index, el) in channel.children_named(&item).enumerate() {
    let text = el.child(&pub_date).map(Element::text).unwrap_or_default();
    dated.push((index, parse_pub_date(&text)?));
  }

  if dated.len() <= limit {
    return Ok(0);
  }

  // Stable: items with equal dates keep their document order.
  dated.sort_by_key(|(_, at)| *at);
  let excess = dated.len() - limit;
  let mut keep = vec![true; dated.len()];
  for (index, at) in &dated[..excess] {
    debug!(pub_date = %at, "pruning item beyond retention limit");
    keep[*index] = false;
  }

  let mut position = 0;
  channel.retain_elements(|el| {
    if el.name != item {
      return true;
    }
    let kept = keep[position];
    position += 1;
    kept
  });

  Ok(excess)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn item(build: &str, pub_date: Option<&str>) -> Element {
    let mut el = Element::new(item_name());
    el.push(Element::with_text(Name::local("title"), format!("Build {}", build)));
    if let Some(date) = pub_date {
      el.push(Element::with_text(pub_date_name(), date));
    }
    el.push(Element::with_text(version_name(), build));
    el
  }

  fn builds(channel: &Element) -> Vec<String> {
    channel
      .children_named(&item_name())
      .map(|el| el.child(&version_name()).unwrap().text())
      .collect()
  }

  fn day(n: u32) -> String {
    format_pub_date(Utc.with_ymd_and_hms(2024, 1, n, 12, 0, 0).unwrap())
  }

  #[test]
  fn pub_date_format_round_trips() {
    let at = Utc.with_ymd_and_hms(2024, 12, 26, 18, 4, 5).unwrap();
    let text = format_pub_date(at);
    assert_eq!(text, "Thu, 26 Dec 2024 18:04:05 +0000");
    assert_eq!(parse_pub_date(&text).unwrap(), at);
  }

  #[test]
  fn pub_date_accepts_non_utc_offsets() {
    let at = parse_pub_date("Mon, 01 Jan 2024 09:00:00 -0800").unwrap();
    assert_eq!(at.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 1, 1, 17, 0, 0).unwrap());
  }

  #[test]
  fn pub_date_ignores_mismatched_weekday() {
    // 2 Jan 2024 was a Tuesday.
    let at = parse_pub_date("Mon, 02 Jan 2024 00:00:00 +0000").unwrap();
    assert_eq!(at, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
  }

  #[test]
  fn pub_date_requires_a_weekday_name() {
    assert!(parse_pub_date("02 Jan 2024 00:00:00 +0000").is_err());
    assert!(parse_pub_date("Xyz, 02 Jan 2024 00:00:00 +0000").is_err());
  }

  #[test]
  fn malformed_pub_date_is_fatal() {
    let err = parse_pub_date("yesterday").unwrap_err();
    assert!(err.to_string().contains("yesterday"));
  }

  #[test]
  fn remove_stale_uses_combined_predicate() {
    let mut channel = Element::new(channel_name());
    channel.push(Element::with_text(Name::local("title"), "Ghostty"));
    channel.push(item("1", Some(&day(1))));
    channel.push(item("2", None));
    channel.push(item("3", None));
    channel.push(item("3", Some(&day(3))));
    channel.push(item("4", Some(&day(4))));

    let removed = remove_stale(&mut channel, "3");
    assert_eq!(removed, Removed { same_build: 2, undated: 1 });
    assert_eq!(builds(&channel), vec!["1", "4"]);
    assert!(channel.child(&Name::local("title")).is_some());
  }

  #[test]
  fn same_build_match_is_exact() {
    let mut channel = Element::new(channel_name());
    channel.push(item(" 3 ", Some(&day(1))));
    channel.push(item("3", Some(&day(2))));

    let removed = remove_stale(&mut channel, "3");
    assert_eq!(removed.same_build, 1);
    assert_eq!(builds(&channel), vec![" 3 "]);
  }

  #[test]
  fn prune_keeps_newest_in_document_order() {
    let mut channel = Element::new(channel_name());
    // Document order deliberately differs from chronological order.
    for n in [5, 1, 4, 2, 3] {
      channel.push(item(&n.to_string(), Some(&day(n))));
    }

    let pruned = prune(&mut channel, 3).unwrap();
    assert_eq!(pruned, 2);
    assert_eq!(builds(&channel), vec!["5", "4", "3"]);
  }

  #[test]
  fn prune_under_limit_is_noop() {
    let mut channel = Element::new(channel_name());
    channel.push(item("1", Some(&day(1))));
    assert_eq!(prune(&mut channel, 15).unwrap(), 0);
    assert_eq!(builds(&channel), vec!["1"]);
  }

  #[test]
  fn prune_fails_on_bad_date() {
    let mut channel = Element::new(channel_name());
    channel.push(item("1", Some("not a date")));
    assert!(prune(&mut channel, 15).is_err());
  }
}
