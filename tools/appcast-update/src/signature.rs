//! Parser for the attribute line printed by Sparkle's `sign_update`.
//!
//! The line looks like `sparkle:edSignature="MEUC...==" length="12345"`.
//! Tokens are separated by single spaces and split on their first `=`, so
//! values may contain `=`. A value starting with `"` loses its first and
//! last characters; there is no escaping. Spaces inside quoted values are
//! not supported.

use crate::error::AppcastError;

/// Insertion-ordered attribute set. A repeated key overwrites the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureAttrs(Vec<(String, String)>);

impl SignatureAttrs {
  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    let value = value.into();
    match self.0.iter_mut().find(|(k, _)| *k == key) {
      Some(slot) => slot.1 = value,
      None => self.0.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// Parse a `key=value key="value"` blob into its attribute set.
pub fn parse(blob: &str) -> Result<SignatureAttrs, AppcastError> {
  let mut attrs = SignatureAttrs::default();
  let blob = blob.trim();
  if blob.is_empty() {
    return Ok(attrs);
  }

  for token in blob.split(' ') {
    let (key, value) = token
      .split_once('=')
      .ok_or_else(|| AppcastError::signature(token, "expected key=value"))?;
    if key.is_empty() {
      return Err(AppcastError::signature(token, "empty key"));
    }
    attrs.insert(key, unquote(value.trim()));
  }

  Ok(attrs)
}

/// Drop the first and last character when the value opens with a double quote.
fn unquote(value: &str) -> &str {
  if !value.starts_with('"') {
    return value;
  }
  let inner = &value[1..];
  match inner.char_indices().last() {
    Some((last, _)) => &inner[..last],
    None => inner,
  }
}
