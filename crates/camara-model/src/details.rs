//! Documents returned by the single-entity endpoints
//! (`/partidos/{id}` and `/deputados/{id}`).
//!
//! These carry far more optional data than the listings, so most fields
//! default when absent instead of failing the decode.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_aux::prelude::deserialize_option_number_from_string;

use crate::entity::{Entity, EntityKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDetails {
    pub id: i64,
    #[serde(rename = "sigla")]
    pub code: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub uri: String,
    #[serde(
        rename = "numeroEleitoral",
        default,
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub electoral_number: Option<i64>,
    #[serde(rename = "urlLogo", default)]
    pub logo_url: Option<String>,
    #[serde(rename = "urlWebSite", alias = "urlWebsite", default)]
    pub website: Option<String>,
    #[serde(rename = "urlFacebook", default)]
    pub facebook_url: Option<String>,
    #[serde(default)]
    pub status: Option<OrganizationStatus>,
}

impl Entity for OrganizationDetails {
    const KIND: EntityKind = EntityKind::OrganizationDetails;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationStatus {
    #[serde(rename = "data", default)]
    pub date: Option<String>,
    /// Sent as a string by this endpoint, unlike the listings.
    #[serde(
        rename = "idLegislatura",
        default,
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub legislature_id: Option<i64>,
    #[serde(rename = "situacao", default)]
    pub situation: Option<String>,
    #[serde(
        rename = "totalMembros",
        default,
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub total_members: Option<i64>,
    #[serde(rename = "lider", default)]
    pub leader: Option<OrganizationLeader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationLeader {
    #[serde(rename = "nome")]
    pub name: String,
    pub uri: String,
    #[serde(rename = "siglaPartido", default)]
    pub organization_code: Option<String>,
    #[serde(rename = "uf", default)]
    pub region_code: Option<String>,
    #[serde(
        rename = "idLegislatura",
        default,
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub legislature_id: Option<i64>,
    #[serde(rename = "urlFoto", default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDetails {
    pub id: i64,
    pub uri: String,
    #[serde(rename = "nomeCivil")]
    pub civil_name: String,
    #[serde(rename = "cpf", default)]
    pub tax_id: Option<String>,
    #[serde(rename = "sexo", default)]
    pub sex: Option<String>,
    #[serde(rename = "dataNascimento", default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "dataFalecimento", default)]
    pub death_date: Option<NaiveDate>,
    #[serde(rename = "ufNascimento", default)]
    pub birth_region: Option<String>,
    #[serde(rename = "municipioNascimento", default)]
    pub birth_municipality: Option<String>,
    #[serde(rename = "escolaridade", default)]
    pub schooling: Option<String>,
    #[serde(rename = "urlWebsite", default)]
    pub website: Option<String>,
    #[serde(rename = "redeSocial", default)]
    pub social_links: Vec<String>,
    #[serde(rename = "ultimoStatus")]
    pub last_status: LastStatus,
}

impl Entity for MemberDetails {
    const KIND: EntityKind = EntityKind::MemberDetails;
}

/// Most recent mandate snapshot of a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastStatus {
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    #[serde(rename = "nomeEleitoral", default)]
    pub electoral_name: Option<String>,
    #[serde(rename = "siglaPartido", default)]
    pub organization_code: Option<String>,
    #[serde(rename = "siglaUf", default)]
    pub region_code: Option<String>,
    #[serde(rename = "idLegislatura", default)]
    pub legislature_id: Option<i64>,
    #[serde(rename = "data", default)]
    pub date: Option<String>,
    #[serde(rename = "situacao", default)]
    pub situation: Option<String>,
    #[serde(rename = "condicaoEleitoral", default)]
    pub electoral_condition: Option<String>,
    #[serde(rename = "descricaoStatus", default)]
    pub status_description: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "gabinete", default)]
    pub office: Option<Office>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    #[serde(rename = "predio", default)]
    pub building: Option<String>,
    #[serde(rename = "sala", default)]
    pub room: Option<String>,
    #[serde(rename = "andar", default)]
    pub floor: Option<String>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
