//! Graph schema definitions for the Gare relationship graph.
//!
//! This module defines the core types shared by inference, assembly and layout:
//! - `RecordKind` / `RecordRef`: which stored record a node stands for
//! - `PersonRecord` / `EntityRecord`: the records the engine reads
//! - `RelationKind`: the fixed relationship vocabulary
//! - `RelationshipEdge` / `NewEdge`: stored and pending edges
//! - `PairKey`: the unordered endpoint pair used for duplicate detection

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Structured sub-lists are read up to this many entries.
pub const MAX_STRUCTURED_ENTRIES: usize = 8;

/// Kinds of records a node can stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// An individual
    Person,
    /// A company or other organization
    Entity,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Person => "person",
            RecordKind::Entity => "entity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "person" => Some(RecordKind::Person),
            "entity" => Some(RecordKind::Entity),
            _ => None,
        }
    }
}

/// A reference to a stored record, used as an edge endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordRef {
    pub kind: RecordKind,
    pub id: u64,
}

impl RecordRef {
    pub fn new(kind: RecordKind, id: u64) -> Self {
        Self { kind, id }
    }

    /// Convenience constructor for person records.
    pub fn person(id: u64) -> Self {
        Self::new(RecordKind::Person, id)
    }

    /// Convenience constructor for entity records.
    pub fn entity(id: u64) -> Self {
        Self::new(RecordKind::Entity, id)
    }

    /// Stable node id used by the assembler and layout (`person_12`).
    pub fn node_id(&self) -> String {
        format!("{}_{}", self.kind.as_str(), self.id)
    }

    /// Parse a node id back into a record reference.
    ///
    /// Accepts both `person_12` and the CLI form `person:12`.
    pub fn parse_node_id(s: &str) -> Option<Self> {
        let (kind, id) = s.split_once('_').or_else(|| s.split_once(':'))?;
        Some(Self::new(RecordKind::parse(kind)?, id.parse().ok()?))
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.node_id())
    }
}

/// Declared sex of a person. Only used to pick the parent label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
    #[default]
    Unknown,
}

impl Sex {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "f" | "female" | "feminino" => Sex::Female,
            "m" | "male" | "masculino" => Sex::Male,
            _ => Sex::Unknown,
        }
    }
}

/// Types of relationships between records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    // Family
    /// Declarer is the mother of the target
    Mother,
    /// Declarer is the father of the target
    Father,
    Child,
    Sibling,
    Spouse,

    // Business
    /// Two persons share a company
    BusinessPartner,
    /// A person owns or co-owns an entity
    CoOwnedEntity,

    // Contact overlap
    SharedAddress,
    SharedPhone,

    // Weak evidence
    /// Possible kinship through a shared surname
    SurnameMatch,
    Other,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Mother => "mae",
            RelationKind::Father => "pai",
            RelationKind::Child => "filho",
            RelationKind::Sibling => "irmao",
            RelationKind::Spouse => "conjuge",
            RelationKind::BusinessPartner => "socio",
            RelationKind::CoOwnedEntity => "socio_empresa",
            RelationKind::SharedAddress => "endereco",
            RelationKind::SharedPhone => "telefone",
            RelationKind::SurnameMatch => "parente",
            RelationKind::Other => "outro",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mae" => Some(RelationKind::Mother),
            "pai" => Some(RelationKind::Father),
            "filho" => Some(RelationKind::Child),
            "irmao" => Some(RelationKind::Sibling),
            "conjuge" => Some(RelationKind::Spouse),
            "socio" => Some(RelationKind::BusinessPartner),
            "socio_empresa" => Some(RelationKind::CoOwnedEntity),
            "endereco" => Some(RelationKind::SharedAddress),
            "telefone" => Some(RelationKind::SharedPhone),
            "parente" => Some(RelationKind::SurnameMatch),
            "outro" => Some(RelationKind::Other),
            _ => None,
        }
    }

    /// Both parent labels count as the `parent` relation.
    pub fn is_parent(&self) -> bool {
        matches!(self, RelationKind::Mother | RelationKind::Father)
    }

    /// Parent label picked by the declarer's sex. Unknown sex reads as father.
    pub fn parent_for(sex: Sex) -> Self {
        match sex {
            Sex::Female => RelationKind::Mother,
            _ => RelationKind::Father,
        }
    }

    pub fn group(&self) -> RelationGroup {
        match self {
            RelationKind::Mother
            | RelationKind::Father
            | RelationKind::Child
            | RelationKind::Sibling
            | RelationKind::Spouse
            | RelationKind::SurnameMatch => RelationGroup::Family,
            RelationKind::BusinessPartner | RelationKind::CoOwnedEntity => RelationGroup::Business,
            RelationKind::SharedAddress | RelationKind::SharedPhone => RelationGroup::Social,
            RelationKind::Other => RelationGroup::Other,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping of relation kinds, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationGroup {
    Family = 0,
    Business = 1,
    Social = 2,
    Other = 3,
}

impl RelationGroup {
    pub const ALL: [RelationGroup; 4] = [
        RelationGroup::Family,
        RelationGroup::Business,
        RelationGroup::Social,
        RelationGroup::Other,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// A 2D point in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A named relative, partner or co-owner inside a record's structured list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelativeEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    /// Ownership share, only meaningful for partners.
    #[serde(default)]
    pub share: Option<String>,
}

impl RelativeEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_tax_id(mut self, tax_id: impl Into<String>) -> Self {
        self.tax_id = Some(tax_id.into());
        self
    }

    /// An entry with neither a name nor a tax id carries no evidence.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
            && self
                .tax_id
                .as_deref()
                .map_or(true, |t| !t.chars().any(|c| c.is_ascii_digit()))
    }
}

/// A company a person declares a stake in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyEntry {
    #[serde(default)]
    pub legal_name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub share: Option<String>,
    /// Co-partners listed under the company.
    #[serde(default)]
    pub partners: Vec<RelativeEntry>,
}

impl CompanyEntry {
    pub fn named(legal_name: impl Into<String>) -> Self {
        Self {
            legal_name: legal_name.into(),
            ..Default::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        RelativeEntry {
            name: self.legal_name.clone(),
            tax_id: self.tax_id.clone(),
            share: None,
        }
        .is_blank()
    }

    pub fn partners(&self) -> &[RelativeEntry] {
        bounded(&self.partners)
    }
}

/// A stored person record. The engine only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// CPF, any punctuation
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub sex: Sex,
    /// `dd/mm/yyyy` or `yyyy-mm-dd`
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub children: Vec<RelativeEntry>,
    #[serde(default)]
    pub siblings: Vec<RelativeEntry>,
    #[serde(default)]
    pub spouses: Vec<RelativeEntry>,
    #[serde(default)]
    pub companies: Vec<CompanyEntry>,
}

impl PersonRecord {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn record_ref(&self) -> RecordRef {
        RecordRef::person(self.id)
    }

    pub fn children(&self) -> &[RelativeEntry] {
        bounded(&self.children)
    }

    pub fn siblings(&self) -> &[RelativeEntry] {
        bounded(&self.siblings)
    }

    pub fn spouses(&self) -> &[RelativeEntry] {
        bounded(&self.spouses)
    }

    pub fn companies(&self) -> &[CompanyEntry] {
        bounded(&self.companies)
    }
}

/// A stored entity (company) record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: u64,
    #[serde(default)]
    pub legal_name: String,
    #[serde(default)]
    pub trade_name: Option<String>,
    /// CNPJ, any punctuation
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub founded_on: Option<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    /// Head office address
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub branch_addresses: Vec<String>,
    #[serde(default)]
    pub partners: Vec<RelativeEntry>,
}

impl EntityRecord {
    pub fn new(id: u64, legal_name: impl Into<String>) -> Self {
        Self {
            id,
            legal_name: legal_name.into(),
            ..Default::default()
        }
    }

    pub fn record_ref(&self) -> RecordRef {
        RecordRef::entity(self.id)
    }

    pub fn partners(&self) -> &[RelativeEntry] {
        bounded(&self.partners)
    }
}

/// Either kind of stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Person(PersonRecord),
    Entity(EntityRecord),
}

impl Record {
    pub fn record_ref(&self) -> RecordRef {
        match self {
            Record::Person(p) => p.record_ref(),
            Record::Entity(e) => e.record_ref(),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Record::Person(p) => &p.name,
            Record::Entity(e) => &e.legal_name,
        }
    }

    /// Birth date for persons, founding date for entities.
    pub fn date(&self) -> Option<NaiveDate> {
        let raw = match self {
            Record::Person(p) => p.birth_date.as_deref(),
            Record::Entity(e) => e.founded_on.as_deref(),
        };
        raw.and_then(parse_record_date)
    }
}

/// Parse a record date in either `dd/mm/yyyy` or ISO form.
pub fn parse_record_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

fn bounded<T>(entries: &[T]) -> &[T] {
    &entries[..entries.len().min(MAX_STRUCTURED_ENTRIES)]
}

/// Unordered endpoint pair. `(a, b)` and `(b, a)` produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(RecordRef, RecordRef);

impl PairKey {
    pub fn new(a: RecordRef, b: RecordRef) -> Self {
        if a <= b {
            PairKey(a, b)
        } else {
            PairKey(b, a)
        }
    }
}

/// A stored relationship edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub id: u64,
    pub source: RecordRef,
    pub target: RecordRef,
    pub kind: RelationKind,
    #[serde(default)]
    pub description: String,
    /// True when produced by inference, false when created by hand.
    pub automatic: bool,
    #[serde(default)]
    pub manual_curve: Option<Point>,
    pub created_at: DateTime<Utc>,
}

impl RelationshipEdge {
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.source, self.target)
    }

    pub fn touches(&self, node: RecordRef) -> bool {
        self.source == node || self.target == node
    }
}

/// An edge waiting for the store to assign its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEdge {
    pub source: RecordRef,
    pub target: RecordRef,
    pub kind: RelationKind,
    pub description: String,
    pub automatic: bool,
}

impl NewEdge {
    /// An edge produced by inference.
    pub fn inferred(
        source: RecordRef,
        target: RecordRef,
        kind: RelationKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            source,
            target,
            kind,
            description: description.into(),
            automatic: true,
        }
    }

    /// An edge created by hand.
    pub fn manual(
        source: RecordRef,
        target: RecordRef,
        kind: RelationKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            automatic: false,
            ..Self::inferred(source, target, kind, description)
        }
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.source, self.target)
    }

    pub fn into_edge(self, id: u64, created_at: DateTime<Utc>) -> RelationshipEdge {
        RelationshipEdge {
            id,
            source: self.source,
            target: self.target,
            kind: self.kind,
            description: self.description,
            automatic: self.automatic,
            manual_curve: None,
            created_at,
        }
    }
}
