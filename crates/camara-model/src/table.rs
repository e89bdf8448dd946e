//! Crawl result arena and the table flattener.
//!
//! The tree is stored as three flat lists joined by index: each member
//! points at its organization, each record at its member. Nothing is keyed
//! by entity equality.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;

use crate::entity::{Member, Organization, Record};
use crate::timestamp::format_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrganizationId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(usize);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("unknown organization id {0}")]
    UnknownOrganization(usize),
    #[error("unknown member id {0}")]
    UnknownMember(usize),
}

#[derive(Debug, Clone)]
struct MemberNode {
    organization: OrganizationId,
    member: Member,
}

#[derive(Debug, Clone)]
struct RecordNode {
    member: MemberId,
    record: Record,
}

/// Organizations, their members and each member's records.
#[derive(Debug, Clone, Default)]
pub struct CrawlTree {
    organizations: Vec<Organization>,
    members: Vec<MemberNode>,
    records: Vec<RecordNode>,
}

impl CrawlTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_organization(&mut self, organization: Organization) -> OrganizationId {
        self.organizations.push(organization);
        OrganizationId(self.organizations.len() - 1)
    }

    /// # Errors
    ///
    /// Returns [`TreeError::UnknownOrganization`] if `organization` was not
    /// produced by this tree.
    pub fn add_member(
        &mut self,
        organization: OrganizationId,
        member: Member,
    ) -> Result<MemberId, TreeError> {
        if organization.0 >= self.organizations.len() {
            return Err(TreeError::UnknownOrganization(organization.0));
        }
        self.members.push(MemberNode {
            organization,
            member,
        });
        Ok(MemberId(self.members.len() - 1))
    }

    /// Append records for `member`, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UnknownMember`] if `member` was not produced by
    /// this tree.
    pub fn add_records(
        &mut self,
        member: MemberId,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<(), TreeError> {
        if member.0 >= self.members.len() {
            return Err(TreeError::UnknownMember(member.0));
        }
        self.records
            .extend(records.into_iter().map(|record| RecordNode { member, record }));
        Ok(())
    }

    #[must_use]
    pub fn organizations(&self) -> &[Organization] {
        &self.organizations
    }

    pub fn organization(&self, id: OrganizationId) -> Option<&Organization> {
        self.organizations.get(id.0)
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.get(id.0).map(|node| &node.member)
    }

    /// Members of one organization, in insertion order.
    pub fn members_of(
        &self,
        organization: OrganizationId,
    ) -> impl Iterator<Item = (MemberId, &Member)> {
        self.members
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.organization == organization)
            .map(|(index, node)| (MemberId(index), &node.member))
    }

    /// Records of one member, in server order.
    pub fn records_of(&self, member: MemberId) -> impl Iterator<Item = &Record> {
        self.records
            .iter()
            .filter(move |node| node.member == member)
            .map(|node| &node.record)
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Fixed column list matching [`Row::values`].
pub const COLUMNS: [&str; 26] = [
    "partido.id",
    "partido.sigla",
    "partido.nome",
    "partido.uri",
    "deputado.id",
    "deputado.uri",
    "deputado.nome",
    "deputado.siglaPartido",
    "deputado.uriPartido",
    "deputado.siglaUf",
    "deputado.idLegislatura",
    "deputado.urlFoto",
    "deputado.email",
    "discurso.dataHoraInicio",
    "discurso.dataHoraFim",
    "faseEvento.dataHoraInicio",
    "faseEvento.dataHoraFim",
    "faseEvento.titulo",
    "discurso.sumario",
    "discurso.transcricao",
    "discurso.keywords",
    "discurso.tipoDiscurso",
    "discurso.uriEvento",
    "discurso.urlAudio",
    "discurso.urlTexto",
    "discurso.urlVideo",
];

/// One organization, member and record joined into a flat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row<'a> {
    pub organization: &'a Organization,
    pub member: &'a Member,
    pub record: &'a Record,
}

impl Row<'_> {
    /// Cell values in [`COLUMNS`] order. `null`s become empty strings.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        let Row {
            organization,
            member,
            record,
        } = *self;
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        vec![
            organization.id.to_string(),
            organization.code.clone(),
            organization.name.clone(),
            organization.uri.clone(),
            member.id.to_string(),
            member.uri.clone(),
            member.name.clone(),
            member.organization_code.clone(),
            member.organization_uri.clone(),
            member.region_code.clone(),
            member.legislature_id.to_string(),
            text(&member.photo_url),
            text(&member.email),
            format_timestamp(&record.start),
            record.end.as_ref().map(format_timestamp).unwrap_or_default(),
            format_timestamp(&record.phase.start),
            record
                .phase
                .end
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_default(),
            record.phase.title.clone(),
            text(&record.summary),
            record.transcript.clone(),
            record.keywords.join(", "),
            record.record_type.clone(),
            text(&record.event_uri),
            text(&record.audio_url),
            text(&record.text_url),
            text(&record.video_url),
        ]
    }
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values = self.values();
        let mut map = serializer.serialize_map(Some(COLUMNS.len()))?;
        for (column, value) in COLUMNS.iter().zip(values) {
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}

/// Join the tree into rows, dropping rows whose record content was already
/// emitted.
///
/// Duplicates are detected on the full record, not on member identity: the
/// API lists some members twice under case-variant names, and both copies
/// return the same speeches. Output keeps crawl order (organization, member,
/// record position) after removal.
#[must_use]
pub fn flatten(tree: &CrawlTree) -> Vec<Row<'_>> {
    let mut nodes: Vec<&RecordNode> = tree.records.iter().collect();
    // Stable: keeps server order within a member.
    nodes.sort_by_key(|node| {
        let organization = tree.members[node.member.0].organization;
        (organization, node.member)
    });

    let mut seen: HashSet<&Record> = HashSet::with_capacity(nodes.len());
    nodes
        .into_iter()
        .filter(|node| seen.insert(&node.record))
        .map(|node| {
            let member_node = &tree.members[node.member.0];
            Row {
                organization: &tree.organizations[member_node.organization.0],
                member: &member_node.member,
                record: &node.record,
            }
        })
        .collect()
}
