use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::task::{
  Priority,
  Status
};

/// Category filter value that matches
/// every category. Never a real
/// category.
pub const ALL_CATEGORIES: &str = "all";
pub const DEFAULT_FALLBACK_COLOR: &str =
  "#6B7280";

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct CategoryDef {
  pub name:  String,
  #[serde(default)]
  pub color: String
}

impl CategoryDef {
  fn new(
    name: &str,
    color: &str
  ) -> Self {
    Self {
      name:  name.to_string(),
      color: color.to_string()
    }
  }
}

/// The enumerated category/status/
/// priority domain shared by the
/// validator, the projector and the
/// aggregator.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct Domain {
  #[serde(default)]
  pub version:        u32,
  #[serde(
    default = "default_fallback_color"
  )]
  pub fallback_color: String,
  #[serde(
    default = "default_categories"
  )]
  pub categories:     Vec<CategoryDef>
}

fn default_fallback_color() -> String {
  DEFAULT_FALLBACK_COLOR.to_string()
}

fn default_categories()
-> Vec<CategoryDef> {
  vec![
    CategoryDef::new("work", "#3B82F6"),
    CategoryDef::new(
      "study", "#10B981"
    ),
    CategoryDef::new(
      "health", "#F59E0B"
    ),
    CategoryDef::new(
      "personal", "#8B5CF6"
    ),
    CategoryDef::new(
      "other", "#6B7280"
    ),
  ]
}

impl Default for Domain {
  fn default() -> Self {
    Self {
      version:        1,
      fallback_color:
        default_fallback_color(),
      categories:     default_categories()
    }
  }
}

impl Domain {
  #[tracing::instrument(skip(raw))]
  pub fn from_toml_str(
    raw: &str
  ) -> anyhow::Result<Self> {
    let mut domain =
      toml::from_str::<Domain>(raw)
        .context(
          "failed parsing category \
           domain"
        )?;
    sanitize_domain(&mut domain);
    info!(
      version = domain.version,
      categories =
        domain.categories.len(),
      "loaded category domain"
    );
    Ok(domain)
  }

  #[tracing::instrument]
  pub fn load(
    path: &Path
  ) -> anyhow::Result<Self> {
    let raw = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    Self::from_toml_str(&raw)
      .with_context(|| {
        format!(
          "invalid domain file {}",
          path.display()
        )
      })
  }

  pub fn contains(
    &self,
    category: &str
  ) -> bool {
    self
      .categories
      .iter()
      .any(|def| def.name == category)
  }

  /// Display colour for a category,
  /// falling back for unknown names.
  pub fn color_for(
    &self,
    category: &str
  ) -> &str {
    self
      .categories
      .iter()
      .find(|def| def.name == category)
      .map(|def| def.color.as_str())
      .unwrap_or(&self.fallback_color)
  }

  pub fn category_names(
    &self
  ) -> impl Iterator<Item = &str> {
    self
      .categories
      .iter()
      .map(|def| def.name.as_str())
  }

  /// Category preselected in a blank
  /// draft.
  pub fn default_category(
    &self
  ) -> &str {
    self
      .categories
      .first()
      .map(|def| def.name.as_str())
      .unwrap_or("other")
  }

  pub fn statuses(
    &self
  ) -> &'static [Status] {
    &Status::ALL
  }

  pub fn priorities(
    &self
  ) -> &'static [Priority] {
    &Priority::ALL
  }
}

fn sanitize_domain(domain: &mut Domain) {
  if !is_hex_color(&domain.fallback_color)
  {
    warn!(
      color = %domain.fallback_color,
      "invalid fallback colour; using default"
    );
    domain.fallback_color =
      default_fallback_color();
  }

  let mut seen = BTreeSet::new();
  let mut kept = Vec::with_capacity(
    domain.categories.len()
  );
  for mut def in
    std::mem::take(&mut domain.categories)
  {
    def.name = def.name.trim().to_string();
    if def.name.is_empty()
      || def
        .name
        .eq_ignore_ascii_case(
          ALL_CATEGORIES
        )
    {
      debug!(name = %def.name, "skipping reserved or blank category");
      continue;
    }
    if !seen.insert(def.name.clone()) {
      warn!(name = %def.name, "duplicate category ignored");
      continue;
    }
    if !is_hex_color(&def.color) {
      warn!(
        name = %def.name,
        color = %def.color,
        "invalid category colour; using fallback"
      );
      def.color =
        domain.fallback_color.clone();
    }
    kept.push(def);
  }

  if kept.is_empty() {
    warn!(
      "category domain was empty; \
       using defaults"
    );
    kept = default_categories();
  }
  domain.categories = kept;
}

fn is_hex_color(raw: &str) -> bool {
  let Some(hex) = raw.strip_prefix('#')
  else {
    return false;
  };
  matches!(hex.len(), 3 | 6)
    && hex
      .chars()
      .all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn unknown_category_uses_fallback_color()
   {
    let domain = Domain::default();
    assert_eq!(
      domain.color_for("work"),
      "#3B82F6"
    );
    assert_eq!(
      domain.color_for("gardening"),
      DEFAULT_FALLBACK_COLOR
    );
    assert!(!domain.contains(
      ALL_CATEGORIES
    ));
    assert_eq!(
      domain.default_category(),
      "work"
    );
  }

  #[test]
  fn sanitize_drops_sentinel_blank_and_duplicates()
   {
    let domain = Domain::from_toml_str(
      r##"
        version = 2
        fallback_color = "not-a-colour"

        [[categories]]
        name = "All"
        color = "#000000"

        [[categories]]
        name = "  garden "
        color = "#0f0"

        [[categories]]
        name = ""
        color = "#111111"

        [[categories]]
        name = "garden"
        color = "#222222"

        [[categories]]
        name = "errands"
        color = "blue"
      "##
    )
    .expect("parse domain");

    assert_eq!(
      domain.fallback_color,
      DEFAULT_FALLBACK_COLOR
    );
    let names = domain
      .category_names()
      .collect::<Vec<_>>();
    assert_eq!(
      names,
      vec!["garden", "errands"]
    );
    assert_eq!(
      domain.color_for("garden"),
      "#0f0"
    );
    assert_eq!(
      domain.color_for("errands"),
      DEFAULT_FALLBACK_COLOR
    );
  }

  #[test]
  fn empty_category_list_restores_defaults()
   {
    let domain = Domain::from_toml_str(
      "categories = []"
    )
    .expect("parse domain");
    assert_eq!(
      domain.categories,
      Domain::default().categories
    );
  }

  #[test]
  fn loads_domain_from_file() {
    let mut file =
      tempfile::NamedTempFile::new()
        .expect("temp file");
    writeln!(
      file,
      "[[categories]]\nname = \
       \"reading\"\ncolor = \
       \"#123456\""
    )
    .expect("write domain");

    let domain = Domain::load(file.path())
      .expect("load domain");
    assert!(domain.contains("reading"));
    assert!(!domain.contains("work"));
  }
}
