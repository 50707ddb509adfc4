//! Identifier schemes and the process-wide scheme registry.
//!
//! Schemes are loaded once at startup and are read-only afterwards. The
//! registry is shared behind an `Arc` and passed explicitly to whoever needs
//! to parse or dereference ids.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  id::{SchemeId, ScopedId},
};

/// Placeholder substituted with an id value inside URI templates.
pub const ID_PLACEHOLDER: &str = "{$id}";

// ─── Scheme ──────────────────────────────────────────────────────────────────

/// A namespace for external identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
  pub id:            String,
  #[serde(default)]
  pub aliases:       Vec<String>,
  pub display_name:  String,
  #[serde(default)]
  pub description:   Option<String>,
  /// Human-facing record URI, e.g. `https://d-nb.info/gnd/{$id}`.
  #[serde(default)]
  pub authority_uri: Option<String>,
  /// Machine-readable source URI (RDF, JSON, ...).
  #[serde(default)]
  pub source_uri:    Option<String>,
}

impl Scheme {
  pub fn scheme_id(&self) -> SchemeId { SchemeId::new(self.id.clone()) }

  /// Case-insensitive match against the id and every alias.
  pub fn answers_to(&self, name: &str) -> bool {
    self.id.eq_ignore_ascii_case(name)
      || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
  }

  pub fn authority_uri_for(&self, value: &str) -> Option<String> {
    self
      .authority_uri
      .as_deref()
      .map(|t| t.replace(ID_PLACEHOLDER, value))
  }

  pub fn source_uri_for(&self, value: &str) -> Option<String> {
    self
      .source_uri
      .as_deref()
      .map(|t| t.replace(ID_PLACEHOLDER, value))
  }

  /// Reverse a URI template: return the id value if `uri` was produced by
  /// one of this scheme's templates. `http` and `https` are treated alike.
  /// When several templates match, the shortest value wins.
  pub fn extract_value(&self, uri: &str) -> Option<String> {
    [self.authority_uri.as_deref(), self.source_uri.as_deref()]
      .into_iter()
      .flatten()
      .filter_map(|template| match_template(template, uri))
      .min_by_key(String::len)
  }
}

fn strip_protocol(s: &str) -> &str {
  s.split_once("://").map_or(s, |(_, rest)| rest)
}

fn match_template(template: &str, uri: &str) -> Option<String> {
  let (prefix, suffix) = strip_protocol(template).split_once(ID_PLACEHOLDER)?;
  let value = strip_protocol(uri)
    .strip_prefix(prefix)?
    .strip_suffix(suffix)?;
  (!value.is_empty() && !value.contains('/')).then(|| value.to_owned())
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// The immutable set of known schemes.
#[derive(Debug, Clone)]
pub struct SchemeRegistry {
  schemes: Vec<Arc<Scheme>>,
}

impl SchemeRegistry {
  /// Build a registry, rejecting ids or aliases that collide
  /// case-insensitively.
  pub fn new(schemes: Vec<Scheme>) -> Result<Self> {
    let mut seen: Vec<String> = Vec::new();
    for scheme in &schemes {
      for name in std::iter::once(&scheme.id).chain(&scheme.aliases) {
        let folded = name.to_ascii_lowercase();
        if seen.contains(&folded) {
          return Err(Error::DuplicateScheme(name.clone()));
        }
        seen.push(folded);
      }
    }
    Ok(Self { schemes: schemes.into_iter().map(Arc::new).collect() })
  }

  /// The schemes shipped with the service: the German national authority
  /// file, VIAF, ORCID and the Library of Congress name authority file.
  pub fn builtin() -> Self {
    let schemes = vec![
      Scheme {
        id:            "DNB".into(),
        aliases:       vec!["gnd".into()],
        display_name:  "Gemeinsame Normdatei".into(),
        description:   Some("Integrated Authority File of the German National Library".into()),
        authority_uri: Some("http://d-nb.info/gnd/{$id}".into()),
        source_uri:    Some("http://d-nb.info/gnd/{$id}/about/lds".into()),
      },
      Scheme {
        id:            "VIAF".into(),
        aliases:       vec![],
        display_name:  "Virtual International Authority File".into(),
        description:   None,
        authority_uri: Some("http://viaf.org/viaf/{$id}".into()),
        source_uri:    Some("http://viaf.org/viaf/{$id}/rdf.xml".into()),
      },
      Scheme {
        id:            "ORCID".into(),
        aliases:       vec![],
        display_name:  "Open Researcher and Contributor ID".into(),
        description:   None,
        authority_uri: Some("https://orcid.org/{$id}".into()),
        source_uri:    Some("https://pub.orcid.org/v2.1/{$id}".into()),
      },
      Scheme {
        id:            "LOC".into(),
        aliases:       vec!["lc".into(), "lccn".into()],
        display_name:  "Library of Congress Name Authority File".into(),
        description:   None,
        authority_uri: Some("http://id.loc.gov/authorities/names/{$id}".into()),
        source_uri:    Some("http://id.loc.gov/authorities/names/{$id}.rdf".into()),
      },
    ];
    // The table above is static and collision-free.
    Self { schemes: schemes.into_iter().map(Arc::new).collect() }
  }

  pub fn all(&self) -> &[Arc<Scheme>] { &self.schemes }

  /// Look up a scheme by id or alias, case-insensitively.
  pub fn resolve(&self, name: &str) -> Result<Arc<Scheme>> {
    self
      .schemes
      .iter()
      .find(|s| s.answers_to(name))
      .cloned()
      .ok_or_else(|| Error::UnknownScheme(name.to_owned()))
  }

  /// Parse `"<scheme>:<value>"` into a canonical [`ScopedId`].
  pub fn parse_id(&self, s: &str) -> Result<ScopedId> {
    let (scheme, value) = s
      .trim()
      .split_once(':')
      .filter(|(scheme, value)| !scheme.is_empty() && !value.is_empty())
      .ok_or_else(|| Error::Parse(s.to_owned()))?;
    let scheme = self.resolve(scheme)?;
    Ok(ScopedId::new(scheme.scheme_id(), value))
  }

  /// Find the id a dereference URI points to, if any known scheme produced it.
  pub fn id_from_uri(&self, uri: &str) -> Option<ScopedId> {
    self.schemes.iter().find_map(|scheme| {
      scheme
        .extract_value(uri)
        .map(|value| ScopedId::new(scheme.scheme_id(), value))
    })
  }

  /// The external record URI for `id`, when its scheme has a template.
  pub fn authority_uri(&self, id: &ScopedId) -> Option<String> {
    self
      .resolve(id.scheme().as_str())
      .ok()?
      .authority_uri_for(id.value())
  }

  pub fn source_uri(&self, id: &ScopedId) -> Option<String> {
    self.resolve(id.scheme().as_str()).ok()?.source_uri_for(id.value())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn alias_lookup_is_case_insensitive() {
    let reg = SchemeRegistry::builtin();
    assert_eq!(reg.resolve("GND").unwrap().id, "DNB");
    assert_eq!(reg.resolve("dnb").unwrap().id, "DNB");
    assert_eq!(reg.resolve("Lc").unwrap().id, "LOC");
  }

  #[test]
  fn parse_canonicalises_scheme() {
    let reg = SchemeRegistry::builtin();
    let id = reg.parse_id("gnd:118540238").unwrap();
    assert_eq!(id.to_string(), "DNB:118540238");
  }

  #[test]
  fn parse_reports_malformed_and_unknown() {
    let reg = SchemeRegistry::builtin();
    assert!(matches!(reg.parse_id("118540238"), Err(Error::Parse(_))));
    assert!(matches!(reg.parse_id("isni:0000"), Err(Error::UnknownScheme(s)) if s == "isni"));
  }

  #[test]
  fn duplicate_alias_is_rejected() {
    let mut schemes: Vec<Scheme> = SchemeRegistry::builtin()
      .all()
      .iter()
      .map(|s| (**s).clone())
      .collect();
    schemes[1].aliases.push("GND".into());
    assert!(matches!(
      SchemeRegistry::new(schemes),
      Err(Error::DuplicateScheme(name)) if name == "GND"
    ));
  }

  #[test]
  fn templates_round_trip() {
    let reg = SchemeRegistry::builtin();
    let id = reg.parse_id("viaf:24604282").unwrap();
    let uri = reg.authority_uri(&id).unwrap();
    assert_eq!(uri, "http://viaf.org/viaf/24604282");
    assert_eq!(reg.id_from_uri(&uri), Some(id));
    assert_eq!(
      reg.id_from_uri("https://d-nb.info/gnd/4028557-1").map(|i| i.to_string()),
      Some("DNB:4028557-1".to_owned())
    );
    assert_eq!(reg.id_from_uri("https://example.org/nothing"), None);
  }

  #[test]
  fn source_uri_dereferences_and_reverses() {
    let reg = SchemeRegistry::builtin();
    let id = reg.parse_id("lccn:n79021164").unwrap();
    let uri = reg.source_uri(&id).unwrap();
    assert_eq!(uri, "http://id.loc.gov/authorities/names/n79021164.rdf");
    assert_eq!(reg.id_from_uri(&uri), Some(id));

    let bare = Scheme { source_uri: None, ..(*reg.resolve("ORCID").unwrap()).clone() };
    assert_eq!(bare.source_uri_for("0000-0002-1825-0097"), None);
  }
}
