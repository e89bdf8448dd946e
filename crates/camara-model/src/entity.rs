//! Entities decoded from the three listing endpoints.
//!
//! Field names follow the API's JSON keys through `serde(rename)`. Keys the
//! API sends as `null` are `Option`s, but they are still required to be
//! present: a record missing one of them is malformed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::timestamp;

/// Which listing an entity was decoded from. Used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organization,
    Member,
    Record,
    OrganizationDetails,
    MemberDetails,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Organization => "organization",
            Self::Member => "member",
            Self::Record => "record",
            Self::OrganizationDetails => "organization details",
            Self::MemberDetails => "member details",
        };
        f.write_str(name)
    }
}

/// A type the decoder can produce from one raw JSON record.
pub trait Entity: for<'de> Deserialize<'de> {
    const KIND: EntityKind;
}

/// A political party (`/partidos`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    /// Party acronym, e.g. "NOVO".
    #[serde(rename = "sigla")]
    pub code: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub uri: String,
}

impl Entity for Organization {
    const KIND: EntityKind = EntityKind::Organization;
}

/// A legislator listed under a party (`/partidos/{id}/membros`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub uri: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "siglaPartido")]
    pub organization_code: String,
    #[serde(rename = "uriPartido")]
    pub organization_uri: String,
    /// State (UF) the member represents.
    #[serde(rename = "siglaUf")]
    pub region_code: String,
    #[serde(rename = "idLegislatura")]
    pub legislature_id: i64,
    #[serde(rename = "urlFoto", deserialize_with = "Option::deserialize")]
    pub photo_url: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub email: Option<String>,
}

impl Entity for Member {
    const KIND: EntityKind = EntityKind::Member;
}

/// Session segment a speech happened in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phase {
    #[serde(rename = "dataHoraInicio", with = "timestamp")]
    pub start: NaiveDateTime,
    #[serde(rename = "dataHoraFim", with = "timestamp::nullable")]
    pub end: Option<NaiveDateTime>,
    #[serde(rename = "titulo")]
    pub title: String,
}

/// A floor speech (`/deputados/{id}/discursos`).
///
/// Equality and hashing cover every field; the table flattener relies on
/// that to collapse the same speech reached through duplicated members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "dataHoraInicio", with = "timestamp")]
    pub start: NaiveDateTime,
    #[serde(rename = "dataHoraFim", with = "timestamp::nullable")]
    pub end: Option<NaiveDateTime>,
    #[serde(rename = "faseEvento")]
    pub phase: Phase,
    #[serde(rename = "sumario", deserialize_with = "Option::deserialize")]
    pub summary: Option<String>,
    #[serde(rename = "transcricao")]
    pub transcript: String,
    #[serde(deserialize_with = "deserialize_keywords")]
    pub keywords: Vec<String>,
    #[serde(rename = "tipoDiscurso")]
    pub record_type: String,
    #[serde(rename = "uriEvento", deserialize_with = "Option::deserialize")]
    pub event_uri: Option<String>,
    #[serde(rename = "urlAudio", deserialize_with = "Option::deserialize")]
    pub audio_url: Option<String>,
    #[serde(rename = "urlTexto", deserialize_with = "Option::deserialize")]
    pub text_url: Option<String>,
    #[serde(rename = "urlVideo", deserialize_with = "Option::deserialize")]
    pub video_url: Option<String>,
}

impl Record {
    /// Whether the record's end is not before its start.
    ///
    /// The API does not enforce this, so callers must not assume it.
    #[must_use]
    pub fn has_consistent_interval(&self) -> bool {
        self.end.map_or(true, |end| end >= self.start)
    }
}

impl Entity for Record {
    const KIND: EntityKind = EntityKind::Record;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordsRepr {
    Text(String),
    List(Vec<String>),
}

/// Keywords arrive as one comma-separated string (or `null`).
fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<KeywordsRepr>::deserialize(deserializer)? {
        None => return Ok(Vec::new()),
        Some(KeywordsRepr::List(list)) => list,
        Some(KeywordsRepr::Text(text)) => text.split(',').map(str::to_string).collect(),
    };

    Ok(raw
        .into_iter()
        .map(|keyword| keyword.trim().to_string())
        .filter(|keyword| !keyword.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_json() -> serde_json::Value {
        json!({
            "dataHoraInicio": "2022-02-01T14:38",
            "dataHoraFim": "2022-02-01T14:45",
            "faseEvento": {
                "titulo": "Pequeno Expediente",
                "dataHoraInicio": "2022-02-01T14:00",
                "dataHoraFim": null
            },
            "sumario": "Defesa da reforma administrativa.",
            "transcricao": "O SR. DEPUTADO - Sr. Presidente...",
            "keywords": "REFORMA ADMINISTRATIVA, Serviço público ,",
            "tipoDiscurso": "PEQUENO EXPEDIENTE",
            "uriEvento": "https://dadosabertos.camara.leg.br/api/v2/eventos/64421",
            "urlAudio": null,
            "urlTexto": null,
            "urlVideo": "https://example.invalid/video"
        })
    }

    #[test]
    fn test_record_decodes_keywords_from_string() {
        let record: Record = serde_json::from_value(record_json()).unwrap();
        assert_eq!(
            record.keywords,
            vec!["REFORMA ADMINISTRATIVA", "Serviço público"]
        );
        assert_eq!(record.phase.title, "Pequeno Expediente");
        assert!(record.phase.end.is_none());
        assert!(record.audio_url.is_none());
    }

    #[test]
    fn test_record_null_keywords_is_empty_list() {
        let mut value = record_json();
        value["keywords"] = serde_json::Value::Null;
        let record: Record = serde_json::from_value(value).unwrap();
        assert!(record.keywords.is_empty());
    }

    #[test]
    fn test_record_missing_nullable_key_is_rejected() {
        let mut value = record_json();
        value.as_object_mut().unwrap().remove("urlAudio");
        let err = serde_json::from_value::<Record>(value).unwrap_err();
        assert!(err.to_string().contains("urlAudio"));
    }

    #[test]
    fn test_inverted_interval_is_detected() {
        let mut value = record_json();
        value["dataHoraFim"] = json!("2022-02-01T14:00");
        let record: Record = serde_json::from_value(value).unwrap();
        assert!(!record.has_consistent_interval());
    }

    #[test]
    fn test_open_interval_is_consistent() {
        let mut value = record_json();
        value["dataHoraFim"] = serde_json::Value::Null;
        let record: Record = serde_json::from_value(value).unwrap();
        assert!(record.has_consistent_interval());
    }

    #[test]
    fn test_member_decodes_api_field_names() {
        let member: Member = serde_json::from_value(json!({
            "id": 204536,
            "uri": "https://dadosabertos.camara.leg.br/api/v2/deputados/204536",
            "nome": "Kim Kataguiri",
            "siglaPartido": "NOVO",
            "uriPartido": "https://dadosabertos.camara.leg.br/api/v2/partidos/37901",
            "siglaUf": "SP",
            "idLegislatura": 56,
            "urlFoto": "https://www.camara.leg.br/internet/deputado/bandep/204536.jpg",
            "email": null
        }))
        .unwrap();

        assert_eq!(member.organization_code, "NOVO");
        assert_eq!(member.region_code, "SP");
        assert_eq!(member.legislature_id, 56);
        assert!(member.email.is_none());
    }

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::Record.to_string(), "record");
        assert_eq!(EntityKind::MemberDetails.to_string(), "member details");
    }
}
