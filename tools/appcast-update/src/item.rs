//! Builds the `<item>` describing the release being published.

use crate::config::{Config, Release};
use crate::feed::{format_pub_date, item_name, pub_date_name, version_name};
use crate::signature::SignatureAttrs;
use crate::xml::{Element, Name, Namespaces};

/// Release notes page for this version.
pub fn release_notes_url(config: &Config, release: &Release) -> String {
  format!("{}/{}", config.release_notes_base, release.version_slug())
}

/// Download URL of the disk image for this version.
pub fn download_url(config: &Config, release: &Release) -> String {
  format!("{}/{}/Ghostty.dmg", config.download_base, release.version)
}

/// HTML body shown by Sparkle in the update dialog.
pub fn description(config: &Config, release: &Release) -> String {
  let notes = release_notes_url(config, release);
  let notes_label = notes.strip_prefix("https://").unwrap_or(&notes);
  format!(
    r#"
<h1>Ghostty v{version}</h1>
<p>
This release was built from commit <code><a href="{repo}/commits/{commit_long}">{commit}</a></code>
on {date}.
</p>
<p>
We don't currently generate release notes for auto-updates.
You can view the complete changelog and release notes
at <a href="{notes}">{notes_label}</a>.
</p>
"#,
    version = release.version,
    repo = config.repository,
    commit_long = release.commit_long,
    commit = release.commit,
    date = release.now.format("%Y-%m-%d"),
    notes = notes,
    notes_label = notes_label,
  )
}

/// Assemble the new item. Signature attributes are applied last and may
/// overwrite `url` or `type`.
pub fn build(
  config: &Config,
  release: &Release,
  signature: &SignatureAttrs,
  namespaces: &Namespaces,
) -> Element {
  let mut item = Element::new(item_name());
  item.push(Element::with_text(
    Name::local("title"),
    format!("Build {}", release.build),
  ));
  item.push(Element::with_text(pub_date_name(), format_pub_date(release.now)));
  item.push(Element::with_text(version_name(), release.build.as_str()));
  item.push(Element::with_text(
    Name::sparkle("shortVersionString"),
    release.version.as_str(),
  ));
  item.push(Element::with_text(
    Name::sparkle("minimumSystemVersion"),
    config.minimum_system_version.as_str(),
  ));
  item.push(Element::with_text(
    Name::sparkle("fullReleaseNotesLink"),
    release_notes_url(config, release),
  ));
  item.push(Element::with_text(
    Name::local("description"),
    description(config, release),
  ));

  let mut enclosure = Element::new(Name::local("enclosure"));
  enclosure.set_attribute(Name::local("url"), download_url(config, release));
  enclosure.set_attribute(Name::local("type"), config.enclosure_type.as_str());
  for (key, value) in signature.iter() {
    enclosure.set_attribute(namespaces.resolve_raw(key), value);
  }
  item.push(enclosure);

  item
}
