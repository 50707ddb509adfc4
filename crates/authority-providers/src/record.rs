//! lobid GND JSON records and their mapping onto authority entities.
//!
//! Only the properties the entity model has a place for are decoded; every
//! property is optional and multi-valued on the wire.

use authority_core::{
  corporate::Corporate,
  date::PartialDate,
  entity::{add_alternate_name, push_unique_id},
  id::ScopedId,
  person::{Gender, Person},
  place::Place,
  scheme::SchemeRegistry,
};
use serde::Deserialize;
use tracing::debug;

pub const TYPE_PERSON: &str = "Person";
pub const TYPE_CORPORATE: &str = "CorporateBody";
pub const TYPE_PLACE: &str = "PlaceOrGeographicName";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
  pub member: Vec<Record>,
}

/// A `{ "id": .., "label": .. }` link to another resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Link {
  pub id:    String,
  pub label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NameEntity {
  pub forename: Vec<String>,
  pub surname:  Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Record {
  pub id:                                   Option<String>,
  pub gnd_identifier:                       Option<String>,
  #[serde(rename = "type")]
  pub types:                                Vec<String>,
  pub preferred_name:                       Option<String>,
  pub variant_name:                         Vec<String>,
  pub preferred_name_entity_for_the_person: Option<NameEntity>,
  pub gender:                               Vec<Link>,
  pub date_of_birth:                        Vec<String>,
  pub date_of_death:                        Vec<String>,
  pub place_of_birth:                       Vec<Link>,
  pub place_of_death:                       Vec<Link>,
  pub place_of_activity:                    Vec<Link>,
  pub biographical_or_historical_information: Vec<String>,
  pub date_of_establishment:                Vec<String>,
  pub date_of_termination:                  Vec<String>,
  pub homepage:                             Vec<Link>,
  pub hierarchical_superior_of_the_corporate_body: Vec<Link>,
  pub place_of_business:                    Vec<Link>,
  pub same_as:                              Vec<Link>,
}

impl Record {
  pub fn is_a(&self, ty: &str) -> bool { self.types.iter().any(|t| t == ty) }

  /// The record's own id plus every `sameAs` link a known scheme recognises.
  fn ids(&self, schemes: &SchemeRegistry) -> Vec<ScopedId> {
    let mut ids = Vec::new();
    let own = self
      .id
      .as_deref()
      .and_then(|uri| schemes.id_from_uri(uri))
      .or_else(|| {
        let value = self.gnd_identifier.as_deref()?;
        schemes.parse_id(&format!("DNB:{value}")).ok()
      });
    ids.extend(own);
    for link in &self.same_as {
      match schemes.id_from_uri(&link.id) {
        Some(id) => push_unique_id(&mut ids, id),
        None => debug!(uri = %link.id, "sameAs link of unknown scheme"),
      }
    }
    ids
  }

  fn alternate_names(&self, primary: Option<&str>) -> Vec<String> {
    let mut names = Vec::new();
    for name in &self.variant_name {
      add_alternate_name(primary, &mut names, name.trim().to_owned());
    }
    names
  }

  pub fn to_person(&self, schemes: &SchemeRegistry) -> Person {
    let (family_name, given_name) = self.person_name();
    let mut person = Person {
      ids: self.ids(schemes),
      gender: self.gender.iter().find_map(|g| gender_of(&g.id)),
      description: self.biographical_or_historical_information.first().cloned(),
      family_name,
      given_name,
      date_of_birth: first_date(&self.date_of_birth),
      date_of_death: first_date(&self.date_of_death),
      place_of_birth: self.place_of_birth.first().map(|l| l.to_place(schemes)),
      place_of_death: self.place_of_death.first().map(|l| l.to_place(schemes)),
      place_of_activity: self
        .place_of_activity
        .iter()
        .map(|l| l.to_place(schemes))
        .collect(),
      ..Default::default()
    };
    person.alternate_names = self.alternate_names(person.display_name().as_deref());
    person
  }

  pub fn to_corporate(&self, schemes: &SchemeRegistry) -> Corporate {
    let name = self.preferred_name.as_deref().map(str::trim).map(str::to_owned);
    Corporate {
      ids: self.ids(schemes),
      alternate_names: self.alternate_names(name.as_deref()),
      name,
      date_of_establishment: first_date(&self.date_of_establishment),
      date_of_termination: first_date(&self.date_of_termination),
      homepage: self.homepage.first().map(|l| l.id.clone()),
      parent: self
        .hierarchical_superior_of_the_corporate_body
        .first()
        .map(|l| Box::new(l.to_corporate(schemes))),
      place: self.place_of_business.first().map(|l| l.to_place(schemes)),
    }
  }

  pub fn to_place(&self, schemes: &SchemeRegistry) -> Place {
    let name = self.preferred_name.as_deref().map(str::trim).map(str::to_owned);
    Place {
      ids: self.ids(schemes),
      alternate_names: self.alternate_names(name.as_deref()),
      name,
      description: self.biographical_or_historical_information.first().cloned(),
      homepage: self.homepage.first().map(|l| l.id.clone()),
    }
  }

  /// Surname and forename from the structured name, falling back to splitting
  /// the preferred name at its first comma.
  fn person_name(&self) -> (Option<String>, Option<String>) {
    let structured = self.preferred_name_entity_for_the_person.as_ref().map(|n| {
      (
        n.surname.first().map(|s| s.trim().to_owned()),
        n.forename.first().map(|s| s.trim().to_owned()),
      )
    });
    match structured {
      Some((Some(family), given)) => (Some(family), given),
      _ => match self.preferred_name.as_deref().map(str::trim) {
        Some(name) => match name.split_once(',') {
          Some((family, given)) => {
            (Some(family.trim().to_owned()), non_empty(given.trim()))
          }
          None => (non_empty(name), None),
        },
        None => (None, None),
      },
    }
  }
}

impl Link {
  fn ids(&self, schemes: &SchemeRegistry) -> Vec<ScopedId> {
    schemes.id_from_uri(&self.id).into_iter().collect()
  }

  fn to_place(&self, schemes: &SchemeRegistry) -> Place {
    Place { ids: self.ids(schemes), name: self.label.clone(), ..Default::default() }
  }

  fn to_corporate(&self, schemes: &SchemeRegistry) -> Corporate {
    Corporate {
      ids: self.ids(schemes),
      name: self.label.clone(),
      ..Default::default()
    }
  }
}

fn gender_of(uri: &str) -> Option<Gender> {
  uri.rsplit_once('#')?.1.parse().ok()
}

/// First value that parses as a partial date; unparseable values are skipped.
fn first_date(values: &[String]) -> Option<PartialDate> {
  values.iter().find_map(|v| match v.trim().parse() {
    Ok(date) => Some(date),
    Err(e) => {
      debug!(value = %v, "ignoring date: {e}");
      None
    }
  })
}

fn non_empty(s: &str) -> Option<String> { (!s.is_empty()).then(|| s.to_owned()) }

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn goethe() -> Record {
    serde_json::from_value(json!({
      "id": "https://d-nb.info/gnd/118540238",
      "gndIdentifier": "118540238",
      "type": ["AuthorityResource", "Person", "DifferentiatedPerson"],
      "preferredName": "Goethe, Johann Wolfgang von",
      "variantName": ["Goethe, J. W.", "Göthe, Johann Wolfgang", "Goethe, J. W."],
      "preferredNameEntityForThePerson": {
        "forename": ["Johann Wolfgang"],
        "prefix": ["von"],
        "surname": ["Goethe"]
      },
      "gender": [{
        "id": "https://d-nb.info/standards/vocab/gnd/gender#male",
        "label": "Männlich"
      }],
      "dateOfBirth": ["28.08.1749"],
      "dateOfDeath": ["1832-03-22"],
      "placeOfBirth": [{ "id": "https://d-nb.info/gnd/4018118-2", "label": "Frankfurt am Main" }],
      "placeOfActivity": [
        { "id": "https://d-nb.info/gnd/4065105-8", "label": "Weimar" }
      ],
      "sameAs": [
        { "id": "http://viaf.org/viaf/24602065" },
        { "id": "http://www.wikidata.org/entity/Q5879" }
      ]
    }))
    .unwrap()
  }

  #[test]
  fn maps_person_record() {
    let schemes = SchemeRegistry::builtin();
    let record = goethe();
    assert!(record.is_a(TYPE_PERSON));

    let person = record.to_person(&schemes);
    let ids: Vec<_> = person.ids.iter().map(ToString::to_string).collect();
    assert_eq!(ids, vec!["DNB:118540238", "VIAF:24602065"]);
    assert_eq!(person.family_name.as_deref(), Some("Goethe"));
    assert_eq!(person.given_name.as_deref(), Some("Johann Wolfgang"));
    assert_eq!(person.gender, Some(Gender::Male));
    assert_eq!(person.date_of_birth.unwrap().to_string(), "1749-08-28");
    assert_eq!(person.date_of_death.unwrap().to_string(), "1832-03-22");

    let birth = person.place_of_birth.unwrap();
    assert_eq!(birth.name.as_deref(), Some("Frankfurt am Main"));
    assert_eq!(birth.ids[0].to_string(), "DNB:4018118-2");
    assert_eq!(person.place_of_activity.len(), 1);

    assert_eq!(person.alternate_names, vec!["Goethe, J. W.", "Göthe, Johann Wolfgang"]);
  }

  #[test]
  fn falls_back_to_preferred_name() {
    let record: Record = serde_json::from_value(json!({
      "gndIdentifier": "11850391X",
      "type": ["Person"],
      "preferredName": "Arendt, Hannah"
    }))
    .unwrap();
    let person = record.to_person(&SchemeRegistry::builtin());
    assert_eq!(person.family_name.as_deref(), Some("Arendt"));
    assert_eq!(person.given_name.as_deref(), Some("Hannah"));
    assert_eq!(person.ids[0].to_string(), "DNB:11850391X");
  }

  #[test]
  fn maps_corporate_with_parent_and_place() {
    let record: Record = serde_json::from_value(json!({
      "id": "https://d-nb.info/gnd/2020450-4",
      "type": ["CorporateBody"],
      "preferredName": "Universität Leipzig. Institut für Informatik",
      "dateOfEstablishment": ["1993"],
      "homepage": [{ "id": "https://www.informatik.uni-leipzig.de" }],
      "hierarchicalSuperiorOfTheCorporateBody": [
        { "id": "https://d-nb.info/gnd/36187-2", "label": "Universität Leipzig" }
      ],
      "placeOfBusiness": [{ "id": "https://d-nb.info/gnd/4035206-7", "label": "Leipzig" }]
    }))
    .unwrap();
    let corp = record.to_corporate(&SchemeRegistry::builtin());
    assert_eq!(corp.date_of_establishment.unwrap().to_string(), "1993");
    assert_eq!(corp.homepage.as_deref(), Some("https://www.informatik.uni-leipzig.de"));
    let parent = corp.parent.unwrap();
    assert_eq!(parent.name.as_deref(), Some("Universität Leipzig"));
    assert_eq!(parent.ids[0].to_string(), "DNB:36187-2");
    assert_eq!(corp.place.unwrap().name.as_deref(), Some("Leipzig"));
  }

  #[test]
  fn unknown_properties_and_bad_dates_are_ignored() {
    let record: Record = serde_json::from_value(json!({
      "type": ["PlaceOrGeographicName", "TerritorialCorporateBodyOrAdministrativeUnit"],
      "preferredName": " Weimar ",
      "dateOfBirth": ["um 1900"],
      "geographicAreaCode": [{ "id": "x" }]
    }))
    .unwrap();
    assert!(record.is_a(TYPE_PLACE));
    let place = record.to_place(&SchemeRegistry::builtin());
    assert_eq!(place.name.as_deref(), Some("Weimar"));
    assert!(place.ids.is_empty());
    assert!(first_date(&record.date_of_birth).is_none());
  }

  #[test]
  fn search_response_without_members_is_empty() {
    let response: SearchResponse =
      serde_json::from_value(json!({ "totalItems": 0 })).unwrap();
    assert!(response.member.is_empty());
  }
}
