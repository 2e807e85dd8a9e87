//! Relationship inference.
//!
//! Derives typed edges from the structured lists and contact fields of the
//! stored records. Rules run in evidence order so that stronger evidence
//! claims a pair first:
//!
//! 1. declared children (mae/pai)
//! 2. declared siblings
//! 3. declared spouses
//! 4. declared companies, then their co-partners
//! 5. partners listed on entity records
//! 6. persons at an entity's address (head office or branch) or phone
//! 7. shared phones
//! 8. shared addresses
//! 9. surnames
//!
//! Every pair is checked against a symmetric index before insertion, so a
//! second pass over an unchanged store creates nothing.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Instant;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::matcher;
use crate::schema::{
    CompanyEntry, EntityRecord, NewEdge, PairKey, PersonRecord, RecordKind, RecordRef,
    RelationKind, RelativeEntry,
};
use crate::storage::RecordStore;

/// Configuration for inference passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub children: bool,
    pub siblings: bool,
    pub spouses: bool,
    /// Person companies and their co-partners
    pub companies: bool,
    pub entity_partners: bool,
    /// Persons at an entity's address or branch, or sharing its phone
    pub entity_contacts: bool,
    pub shared_phones: bool,
    pub shared_addresses: bool,
    pub surnames: bool,
    /// Minimum surname length in characters (default: 4)
    pub surname_min_len: usize,
    /// Skip surnames shared by more persons than this (default: unbounded)
    pub surname_max_group: Option<usize>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            children: true,
            siblings: true,
            spouses: true,
            companies: true,
            entity_partners: true,
            entity_contacts: true,
            shared_phones: true,
            shared_addresses: true,
            surnames: true,
            surname_min_len: 4,
            surname_max_group: None,
        }
    }
}

/// The rule that produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceRule {
    Children,
    Siblings,
    Spouses,
    Companies,
    CompanyPartners,
    EntityPartners,
    EntityContacts,
    SharedPhone,
    SharedAddress,
    Surname,
}

impl InferenceRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceRule::Children => "children",
            InferenceRule::Siblings => "siblings",
            InferenceRule::Spouses => "spouses",
            InferenceRule::Companies => "companies",
            InferenceRule::CompanyPartners => "company_partners",
            InferenceRule::EntityPartners => "entity_partners",
            InferenceRule::EntityContacts => "entity_contacts",
            InferenceRule::SharedPhone => "shared_phone",
            InferenceRule::SharedAddress => "shared_address",
            InferenceRule::Surname => "surname",
        }
    }
}

/// Result of an inference pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceReport {
    /// Edges created by this pass
    pub created: usize,
    pub by_rule: BTreeMap<InferenceRule, usize>,
    /// Candidates dropped because the pair already had an edge
    pub duplicates: usize,
    /// Structured entries with no usable name or tax id
    pub skipped_entries: usize,
    /// Inserts the store refused
    pub failed_inserts: usize,
    pub new_edge_ids: Vec<u64>,
    pub duration_ms: u64,
}

/// Records read at the start of a pass.
struct Population {
    persons: Vec<PersonRecord>,
    entities: Vec<EntityRecord>,
}

impl Population {
    fn load<S: RecordStore>(store: &S) -> Result<Self> {
        Ok(Self {
            persons: store.persons()?,
            entities: store.entities()?,
        })
    }

    /// Persons an entry points at: every name match plus the tax id match,
    /// each person once.
    fn persons_for(&self, entry: &RelativeEntry, declarer: RecordRef) -> Vec<&PersonRecord> {
        self.persons
            .iter()
            .filter(|p| p.record_ref() != declarer)
            .filter(|p| {
                matcher::names_match(&entry.name, &p.name)
                    || matcher::tax_ids_match(entry.tax_id.as_deref(), p.tax_id.as_deref())
            })
            .collect()
    }

    /// Entities a declared company points at, by legal name, trade name or tax id.
    fn entities_for(&self, company: &CompanyEntry) -> Vec<&EntityRecord> {
        self.entities
            .iter()
            .filter(|e| {
                matcher::names_match(&company.legal_name, &e.legal_name)
                    || e.trade_name
                        .as_deref()
                        .is_some_and(|t| matcher::names_match(&company.legal_name, t))
                    || matcher::tax_ids_match(company.tax_id.as_deref(), e.tax_id.as_deref())
            })
            .collect()
    }
}

/// Mutable state of one pass: the pair index and the running report.
struct Pass<'a, S: RecordStore> {
    store: &'a mut S,
    index: HashSet<PairKey>,
    report: InferenceReport,
}

impl<'a, S: RecordStore> Pass<'a, S> {
    fn begin(store: &'a mut S) -> Result<Self> {
        let index = store.get_all_edges()?.iter().map(|e| e.pair_key()).collect();
        Ok(Self {
            store,
            index,
            report: InferenceReport::default(),
        })
    }

    fn link(
        &mut self,
        rule: InferenceRule,
        source: RecordRef,
        target: RecordRef,
        kind: RelationKind,
        description: String,
    ) {
        if source == target {
            return;
        }
        let key = PairKey::new(source, target);
        if self.index.contains(&key) {
            self.report.duplicates += 1;
            return;
        }
        match self
            .store
            .insert_edge(NewEdge::inferred(source, target, kind, description))
        {
            Ok(id) => {
                debug!(id, %source, %target, %kind, rule = rule.as_str(), "Inferred edge");
                self.index.insert(key);
                self.report.created += 1;
                *self.report.by_rule.entry(rule).or_insert(0) += 1;
                self.report.new_edge_ids.push(id);
            }
            Err(e) => {
                warn!(%source, %target, "Failed to store inferred edge: {:#}", e);
                self.report.failed_inserts += 1;
            }
        }
    }

    fn finish(mut self, started: Instant) -> InferenceReport {
        self.report.duration_ms = started.elapsed().as_millis() as u64;
        self.report
    }
}

/// Runs the matching rules over a record store.
pub struct InferenceEngine {
    config: InferenceConfig,
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceEngine {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self {
            config: InferenceConfig::default(),
        }
    }

    /// Create an engine with custom configuration.
    pub fn with_config(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Run every rule over the whole population.
    ///
    /// Callers must not run two passes against the same store at once.
    #[instrument(skip(self, store))]
    pub fn infer_all<S: RecordStore>(&self, store: &mut S) -> Result<InferenceReport> {
        let started = Instant::now();
        let population = Population::load(store)?;
        let mut pass = Pass::begin(store)?;

        for person in &population.persons {
            self.declared_relations(&mut pass, &population, person);
        }
        if self.config.entity_partners {
            for entity in &population.entities {
                self.entity_partners(&mut pass, &population, entity);
            }
        }
        if self.config.entity_contacts {
            for entity in &population.entities {
                self.entity_contacts(&mut pass, &population, entity, None);
            }
        }
        if self.config.shared_phones {
            self.shared_contacts(&mut pass, &population, None, ContactField::Phone);
        }
        if self.config.shared_addresses {
            self.shared_contacts(&mut pass, &population, None, ContactField::Address);
        }
        if self.config.surnames {
            for person in &population.persons {
                self.surname_matches(&mut pass, &population, person);
            }
        }

        let report = pass.finish(started);
        info!(
            "Inference pass: {} created, {} duplicates, {} skipped, {} failed in {}ms",
            report.created,
            report.duplicates,
            report.skipped_entries,
            report.failed_inserts,
            report.duration_ms
        );
        Ok(report)
    }

    /// Run the rules for a single record, e.g. when its node is expanded.
    ///
    /// Only pairs involving `record` are considered. A record missing from the
    /// store yields an empty report.
    #[instrument(skip(self, store))]
    pub fn infer_for_record<S: RecordStore>(
        &self,
        store: &mut S,
        record: RecordRef,
    ) -> Result<InferenceReport> {
        let started = Instant::now();
        let population = Population::load(store)?;
        let mut pass = Pass::begin(store)?;

        match record.kind {
            RecordKind::Person => {
                if let Some(person) = population.persons.iter().find(|p| p.id == record.id) {
                    self.declared_relations(&mut pass, &population, person);
                    if self.config.entity_contacts {
                        for entity in &population.entities {
                            self.entity_contacts(&mut pass, &population, entity, Some(person.id));
                        }
                    }
                    if self.config.shared_phones {
                        self.shared_contacts(&mut pass, &population, Some(record), ContactField::Phone);
                    }
                    if self.config.shared_addresses {
                        self.shared_contacts(
                            &mut pass,
                            &population,
                            Some(record),
                            ContactField::Address,
                        );
                    }
                    if self.config.surnames {
                        self.surname_matches(&mut pass, &population, person);
                    }
                }
            }
            RecordKind::Entity => {
                if let Some(entity) = population.entities.iter().find(|e| e.id == record.id) {
                    if self.config.entity_partners {
                        self.entity_partners(&mut pass, &population, entity);
                    }
                    if self.config.entity_contacts {
                        self.entity_contacts(&mut pass, &population, entity, None);
                    }
                }
                if self.config.companies {
                    for person in &population.persons {
                        self.companies_pointing_at(&mut pass, &population, person, record);
                    }
                }
            }
        }

        let report = pass.finish(started);
        info!(
            "Inference for {}: {} created, {} duplicates in {}ms",
            record, report.created, report.duplicates, report.duration_ms
        );
        Ok(report)
    }

    /// Children, siblings, spouses and companies declared on a person.
    fn declared_relations<S: RecordStore>(
        &self,
        pass: &mut Pass<'_, S>,
        population: &Population,
        person: &PersonRecord,
    ) {
        let me = person.record_ref();

        if self.config.children {
            let kind = RelationKind::parent_for(person.sex);
            for entry in person.children() {
                self.relatives(pass, population, me, entry, InferenceRule::Children, kind, "declared child");
            }
        }
        if self.config.siblings {
            for entry in person.siblings() {
                self.relatives(
                    pass,
                    population,
                    me,
                    entry,
                    InferenceRule::Siblings,
                    RelationKind::Sibling,
                    "declared sibling",
                );
            }
        }
        if self.config.spouses {
            for entry in person.spouses() {
                self.relatives(
                    pass,
                    population,
                    me,
                    entry,
                    InferenceRule::Spouses,
                    RelationKind::Spouse,
                    "declared spouse",
                );
            }
        }
        if self.config.companies {
            for company in person.companies() {
                if company.is_blank() {
                    pass.report.skipped_entries += 1;
                    continue;
                }
                for entity in population.entities_for(company) {
                    pass.link(
                        InferenceRule::Companies,
                        me,
                        entity.record_ref(),
                        RelationKind::CoOwnedEntity,
                        partner_description(company_label(company), company.share.as_deref()),
                    );
                }
                for partner in company.partners() {
                    self.relatives(
                        pass,
                        population,
                        me,
                        partner,
                        InferenceRule::CompanyPartners,
                        RelationKind::BusinessPartner,
                        &format!("co-partner in {}", company_label(company)),
                    );
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn relatives<S: RecordStore>(
        &self,
        pass: &mut Pass<'_, S>,
        population: &Population,
        declarer: RecordRef,
        entry: &RelativeEntry,
        rule: InferenceRule,
        kind: RelationKind,
        label: &str,
    ) {
        if entry.is_blank() {
            pass.report.skipped_entries += 1;
            return;
        }
        for candidate in population.persons_for(entry, declarer) {
            pass.link(
                rule,
                declarer,
                candidate.record_ref(),
                kind,
                format!("{}: {}", label, entry.name.trim()),
            );
        }
    }

    /// Company entries of `person` that resolve to `entity`.
    fn companies_pointing_at<S: RecordStore>(
        &self,
        pass: &mut Pass<'_, S>,
        population: &Population,
        person: &PersonRecord,
        entity: RecordRef,
    ) {
        for company in person.companies().iter().filter(|c| !c.is_blank()) {
            if population
                .entities_for(company)
                .iter()
                .any(|e| e.record_ref() == entity)
            {
                pass.link(
                    InferenceRule::Companies,
                    person.record_ref(),
                    entity,
                    RelationKind::CoOwnedEntity,
                    partner_description(company_label(company), company.share.as_deref()),
                );
            }
        }
    }

    fn entity_partners<S: RecordStore>(
        &self,
        pass: &mut Pass<'_, S>,
        population: &Population,
        entity: &EntityRecord,
    ) {
        let me = entity.record_ref();
        for entry in entity.partners() {
            if entry.is_blank() {
                pass.report.skipped_entries += 1;
                continue;
            }
            for person in population.persons_for(entry, me) {
                pass.link(
                    InferenceRule::EntityPartners,
                    person.record_ref(),
                    me,
                    RelationKind::CoOwnedEntity,
                    partner_description(&entity.legal_name, entry.share.as_deref()),
                );
            }
        }
    }

    /// Persons whose address overlaps the entity's head office or a branch,
    /// or who share one of its phones. `only` limits the pass to one person.
    fn entity_contacts<S: RecordStore>(
        &self,
        pass: &mut Pass<'_, S>,
        population: &Population,
        entity: &EntityRecord,
        only: Option<u64>,
    ) {
        let me = entity.record_ref();
        let persons = population
            .persons
            .iter()
            .filter(|p| only.map_or(true, |id| p.id == id));

        for person in persons {
            let office = entity.address.iter().find_map(|office| {
                person
                    .addresses
                    .iter()
                    .any(|a| matcher::addresses_overlap(a, office))
                    .then(|| format!("same address as {}: {}", entity.legal_name, office.trim()))
            });
            let branch = || {
                entity.branch_addresses.iter().find_map(|branch| {
                    person
                        .addresses
                        .iter()
                        .any(|a| matcher::addresses_overlap(a, branch))
                        .then(|| format!("at a branch of {}: {}", entity.legal_name, branch.trim()))
                })
            };
            if let Some(description) = office.or_else(branch) {
                pass.link(
                    InferenceRule::EntityContacts,
                    person.record_ref(),
                    me,
                    RelationKind::SharedAddress,
                    description,
                );
                continue;
            }

            let phone = entity.phones.iter().find(|phone| {
                person.phones.iter().any(|p| matcher::phones_match(p, phone))
            });
            if let Some(phone) = phone {
                pass.link(
                    InferenceRule::EntityContacts,
                    person.record_ref(),
                    me,
                    RelationKind::SharedPhone,
                    format!("shared phone with {}: {}", entity.legal_name, matcher::digits(phone)),
                );
            }
        }
    }

    /// Link every pair of persons sharing a normalized phone or address.
    fn shared_contacts<S: RecordStore>(
        &self,
        pass: &mut Pass<'_, S>,
        population: &Population,
        focus: Option<RecordRef>,
        field: ContactField,
    ) {
        let mut groups: BTreeMap<String, BTreeSet<u64>> = BTreeMap::new();
        for person in &population.persons {
            for value in field.values(person) {
                if let Some(normalized) = field.normalize(value) {
                    groups.entry(normalized).or_default().insert(person.id);
                }
            }
        }

        for (value, ids) in groups.iter().filter(|(_, ids)| ids.len() > 1) {
            let ids: Vec<_> = ids.iter().copied().collect();
            for (i, a) in ids.iter().enumerate() {
                for b in &ids[i + 1..] {
                    let (a, b) = (RecordRef::person(*a), RecordRef::person(*b));
                    if focus.is_some_and(|f| f != a && f != b) {
                        continue;
                    }
                    pass.link(field.rule(), a, b, field.kind(), format!("{} {}", field.label(), value));
                }
            }
        }
    }

    fn surname_matches<S: RecordStore>(
        &self,
        pass: &mut Pass<'_, S>,
        population: &Population,
        person: &PersonRecord,
    ) {
        let min_len = self.config.surname_min_len;
        let Some(surname) = matcher::surname(&person.name, min_len) else {
            return;
        };
        let others: Vec<_> = population
            .persons
            .iter()
            .filter(|p| p.id != person.id && matcher::surname_match(&person.name, &p.name, min_len))
            .collect();

        if let Some(max) = self.config.surname_max_group {
            if others.len() + 1 > max {
                debug!(%surname, group = others.len() + 1, max, "Surname group over threshold");
                return;
            }
        }
        for other in others {
            pass.link(
                InferenceRule::Surname,
                person.record_ref(),
                other.record_ref(),
                RelationKind::SurnameMatch,
                format!("possible kinship via surname \"{}\"", surname),
            );
        }
    }
}

fn partner_description(company: &str, share: Option<&str>) -> String {
    match share.map(str::trim).filter(|s| !s.is_empty()) {
        Some(share) => format!("partner with {} in {}", share, company),
        None => format!("partner in {}", company),
    }
}

fn company_label(company: &CompanyEntry) -> &str {
    let name = company.legal_name.trim();
    if name.is_empty() {
        company.tax_id.as_deref().unwrap_or("unnamed company")
    } else {
        name
    }
}

#[derive(Debug, Clone, Copy)]
enum ContactField {
    Phone,
    Address,
}

impl ContactField {
    fn values<'p>(&self, person: &'p PersonRecord) -> &'p [String] {
        match self {
            ContactField::Phone => &person.phones,
            ContactField::Address => &person.addresses,
        }
    }

    fn normalize(&self, value: &str) -> Option<String> {
        match self {
            ContactField::Phone => matcher::normalize_phone(value),
            ContactField::Address => matcher::normalize_address(value),
        }
    }

    fn rule(&self) -> InferenceRule {
        match self {
            ContactField::Phone => InferenceRule::SharedPhone,
            ContactField::Address => InferenceRule::SharedAddress,
        }
    }

    fn kind(&self) -> RelationKind {
        match self {
            ContactField::Phone => RelationKind::SharedPhone,
            ContactField::Address => RelationKind::SharedAddress,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ContactField::Phone => "shared phone",
            ContactField::Address => "shared address",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NewEdge, Sex};
    use crate::storage::MemoryStore;

    fn ana_and_bruno(sex: Sex) -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut ana = PersonRecord::new(1, "Ana Silva");
        ana.sex = sex;
        ana.children.push(RelativeEntry::named("Bruno Silva"));
        store.add_person(ana);
        store.add_person(PersonRecord::new(2, "Bruno Silva"));
        store
    }

    #[test]
    fn test_declared_child_creates_one_parent_edge() {
        let mut store = ana_and_bruno(Sex::Female);
        let engine = InferenceEngine::new();

        let first = engine.infer_all(&mut store).unwrap();
        assert_eq!(first.created, 1);
        assert_eq!(first.by_rule.get(&InferenceRule::Children), Some(&1));

        let edges = store.get_all_edges().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, RelationKind::Mother);
        assert_eq!(edges[0].source, RecordRef::person(1));
        assert!(edges[0].automatic);

        let second = engine.infer_all(&mut store).unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_parent_label_for_male_declarer() {
        let mut store = ana_and_bruno(Sex::Male);
        InferenceEngine::new().infer_all(&mut store).unwrap();
        let edges = store.get_all_edges().unwrap();
        assert_eq!(edges[0].kind, RelationKind::Father);
    }

    #[test]
    fn test_reverse_edge_counts_as_duplicate() {
        let mut store = ana_and_bruno(Sex::Female);
        store
            .insert_edge(NewEdge::manual(
                RecordRef::person(2),
                RecordRef::person(1),
                RelationKind::Other,
                "",
            ))
            .unwrap();
        let report = InferenceEngine::new().infer_all(&mut store).unwrap();
        assert_eq!(report.created, 0);
        assert!(report.duplicates >= 1);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_every_name_candidate_gets_an_edge() {
        let mut store = MemoryStore::new();
        let mut ana = PersonRecord::new(1, "Ana");
        ana.siblings.push(RelativeEntry::named("Carlos"));
        store.add_person(ana);
        store.add_person(PersonRecord::new(2, "Carlos Souza"));
        store.add_person(PersonRecord::new(3, "Carlos Lima"));

        let config = InferenceConfig {
            surnames: false,
            ..Default::default()
        };
        let report = InferenceEngine::with_config(config).infer_all(&mut store).unwrap();
        assert_eq!(report.created, 2);
    }

    #[test]
    fn test_tax_id_and_name_candidates_are_combined() {
        let mut store = MemoryStore::new();
        let mut ana = PersonRecord::new(1, "Ana");
        ana.siblings
            .push(RelativeEntry::named("Carlos").with_tax_id("111.222.333-44"));
        store.add_person(ana);
        store.add_person(PersonRecord::new(2, "Carlos Souza"));
        let mut lima = PersonRecord::new(3, "Carlos Lima");
        lima.tax_id = Some("11122233344".into());
        store.add_person(lima);
        let mut rita = PersonRecord::new(4, "Rita Alves");
        rita.tax_id = Some("111.222.333-44".into());
        store.add_person(rita);

        let config = InferenceConfig {
            surnames: false,
            ..Default::default()
        };
        let report = InferenceEngine::with_config(config).infer_all(&mut store).unwrap();
        assert_eq!(report.by_rule.get(&InferenceRule::Siblings), Some(&3));
        for other in [2, 3, 4] {
            assert!(store
                .edge_between(RecordRef::person(1), RecordRef::person(other))
                .is_some());
        }
    }

    #[test]
    fn test_blank_entries_are_skipped_not_fatal() {
        let mut store = ana_and_bruno(Sex::Female);
        let mut carla = PersonRecord::new(3, "Carla");
        carla.children.push(RelativeEntry::named("  "));
        carla.companies.push(CompanyEntry::default());
        store.add_person(carla);

        let report = InferenceEngine::new().infer_all(&mut store).unwrap();
        assert_eq!(report.skipped_entries, 2);
        assert_eq!(report.by_rule.get(&InferenceRule::Children), Some(&1));
    }

    #[test]
    fn test_companies_and_co_partners() {
        let mut store = MemoryStore::new();
        let mut ana = PersonRecord::new(1, "Ana Prado");
        let mut company = CompanyEntry::named("Padaria Central");
        company.partners.push(RelativeEntry::named("Diego Rocha"));
        ana.companies.push(company);
        store.add_person(ana);
        store.add_person(PersonRecord::new(2, "Diego Rocha"));
        store.add_entity(EntityRecord::new(10, "Padaria Central Ltda"));

        let report = InferenceEngine::new().infer_all(&mut store).unwrap();
        assert_eq!(report.by_rule.get(&InferenceRule::Companies), Some(&1));
        assert_eq!(report.by_rule.get(&InferenceRule::CompanyPartners), Some(&1));
        let owned = store
            .edge_between(RecordRef::person(1), RecordRef::entity(10))
            .unwrap();
        assert_eq!(owned.kind, RelationKind::CoOwnedEntity);
        let partner = store
            .edge_between(RecordRef::person(1), RecordRef::person(2))
            .unwrap();
        assert_eq!(partner.kind, RelationKind::BusinessPartner);
    }

    #[test]
    fn test_entity_partner_list() {
        let mut store = MemoryStore::new();
        store.add_person(PersonRecord::new(1, "Ana Prado"));
        let mut entity = EntityRecord::new(10, "Oficina Norte");
        entity.partners.push(RelativeEntry::named("ana prado"));
        store.add_entity(entity);

        InferenceEngine::new().infer_all(&mut store).unwrap();
        let edge = store
            .edge_between(RecordRef::person(1), RecordRef::entity(10))
            .unwrap();
        assert_eq!(edge.source, RecordRef::person(1));
    }

    #[test]
    fn test_shared_contacts() {
        let mut store = MemoryStore::new();
        let mut a = PersonRecord::new(1, "Ana Prado");
        a.phones.push("(11) 98765-4321".into());
        let mut b = PersonRecord::new(2, "Diego Rocha");
        b.phones.push("11987654321".into());
        b.addresses.push("Rua das Flores 100, apto 3".into());
        let mut c = PersonRecord::new(3, "Elisa Moura");
        c.addresses.push("rua das flores 100".into());
        c.phones.push("4321".into());
        store.add_person(a);
        store.add_person(b);
        store.add_person(c);

        let report = InferenceEngine::new().infer_all(&mut store).unwrap();
        assert_eq!(report.by_rule.get(&InferenceRule::SharedPhone), Some(&1));
        assert_eq!(report.by_rule.get(&InferenceRule::SharedAddress), Some(&1));
        assert_eq!(
            store
                .edge_between(RecordRef::person(2), RecordRef::person(3))
                .unwrap()
                .kind,
            RelationKind::SharedAddress
        );
    }

    #[test]
    fn test_surname_rule_and_threshold() {
        let mut store = MemoryStore::new();
        for (id, name) in [(1, "Ana Moreira"), (2, "Bia Moreira"), (3, "Caio Moreira")] {
            store.add_person(PersonRecord::new(id, name));
        }

        let capped = InferenceConfig {
            surname_max_group: Some(2),
            ..Default::default()
        };
        let report = InferenceEngine::with_config(capped)
            .infer_all(&mut store)
            .unwrap();
        assert_eq!(report.created, 0);

        let report = InferenceEngine::new().infer_all(&mut store).unwrap();
        assert_eq!(report.created, 3);
        let edge = store
            .edge_between(RecordRef::person(1), RecordRef::person(3))
            .unwrap();
        assert_eq!(edge.kind, RelationKind::SurnameMatch);
        assert!(edge.description.contains("possible kinship"));
    }

    #[test]
    fn test_single_word_names_never_match_by_surname() {
        let mut store = MemoryStore::new();
        for (id, name) in [(1, "Moreira"), (2, "Bia Souza"), (3, "Caio Moreira")] {
            store.add_person(PersonRecord::new(id, name));
        }
        let report = InferenceEngine::new().infer_all(&mut store).unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn test_partner_share_in_description() {
        let mut store = MemoryStore::new();
        let mut ana = PersonRecord::new(1, "Ana Prado");
        let mut company = CompanyEntry::named("Padaria Central");
        company.share = Some("40%".into());
        ana.companies.push(company);
        store.add_person(ana);
        store.add_person(PersonRecord::new(2, "Diego Rocha"));
        store.add_entity(EntityRecord::new(10, "Padaria Central"));
        let mut oficina = EntityRecord::new(11, "Oficina Norte");
        let mut diego = RelativeEntry::named("Diego Rocha");
        diego.share = Some("60%".into());
        oficina.partners.push(diego);
        store.add_entity(oficina);

        InferenceEngine::new().infer_all(&mut store).unwrap();
        let ana_edge = store
            .edge_between(RecordRef::person(1), RecordRef::entity(10))
            .unwrap();
        assert_eq!(ana_edge.description, "partner with 40% in Padaria Central");
        let diego_edge = store
            .edge_between(RecordRef::person(2), RecordRef::entity(11))
            .unwrap();
        assert_eq!(diego_edge.description, "partner with 60% in Oficina Norte");
    }

    fn entity_with_contacts() -> EntityRecord {
        let mut entity = EntityRecord::new(10, "Auto Center");
        entity.address = Some("Av Brasil 500".into());
        entity.branch_addresses.push("Rua Nova 250, Centro".into());
        entity.phones.push("(21) 3333-4444".into());
        entity
    }

    #[test]
    fn test_persons_at_entity_address_branch_or_phone() {
        let mut store = MemoryStore::new();
        let mut office = PersonRecord::new(1, "Ana Prado");
        office.addresses.push("Av Brasil 500, sala 3, Rio de Janeiro".into());
        let mut branch = PersonRecord::new(2, "Diego Rocha");
        branch.addresses.push("rua nova 250, centro".into());
        let mut phone = PersonRecord::new(3, "Elisa Moura");
        phone.phones.push("2133334444".into());
        let mut elsewhere = PersonRecord::new(4, "Fabio Lins");
        elsewhere.addresses.push("Rua Velha 12, Centro".into());
        for person in [office, branch, phone, elsewhere] {
            store.add_person(person);
        }
        store.add_entity(entity_with_contacts());

        let report = InferenceEngine::new().infer_all(&mut store).unwrap();
        assert_eq!(report.by_rule.get(&InferenceRule::EntityContacts), Some(&3));

        let at_office = store
            .edge_between(RecordRef::person(1), RecordRef::entity(10))
            .unwrap();
        assert_eq!(at_office.kind, RelationKind::SharedAddress);
        assert_eq!(at_office.source, RecordRef::person(1));
        assert!(at_office.description.starts_with("same address as Auto Center"));
        let at_branch = store
            .edge_between(RecordRef::person(2), RecordRef::entity(10))
            .unwrap();
        assert!(at_branch.description.starts_with("at a branch of Auto Center"));
        assert_eq!(
            store
                .edge_between(RecordRef::person(3), RecordRef::entity(10))
                .unwrap()
                .kind,
            RelationKind::SharedPhone
        );
        assert!(store
            .edge_between(RecordRef::person(4), RecordRef::entity(10))
            .is_none());
    }

    #[test]
    fn test_entity_contacts_in_single_record_pass() {
        let mut store = MemoryStore::new();
        let mut ana = PersonRecord::new(1, "Ana Prado");
        ana.addresses.push("Av Brasil 500".into());
        store.add_person(ana);
        let mut diego = PersonRecord::new(2, "Diego Rocha");
        diego.addresses.push("Rua Nova 250, Centro".into());
        store.add_person(diego);
        store.add_entity(entity_with_contacts());

        let engine = InferenceEngine::new();
        let report = engine
            .infer_for_record(&mut store, RecordRef::person(1))
            .unwrap();
        assert_eq!(report.created, 1);
        assert!(store
            .edge_between(RecordRef::person(2), RecordRef::entity(10))
            .is_none());

        let report = engine
            .infer_for_record(&mut store, RecordRef::entity(10))
            .unwrap();
        assert_eq!(report.created, 1);
    }

    #[test]
    fn test_single_record_pass_only_touches_that_record() {
        let mut store = ana_and_bruno(Sex::Female);
        let mut carla = PersonRecord::new(3, "Carla Dias");
        carla.siblings.push(RelativeEntry::named("Daniel Dias"));
        store.add_person(carla);
        store.add_person(PersonRecord::new(4, "Daniel Dias"));

        let engine = InferenceEngine::new();
        let report = engine
            .infer_for_record(&mut store, RecordRef::person(1))
            .unwrap();
        assert_eq!(report.created, 1);
        assert!(store
            .edge_between(RecordRef::person(3), RecordRef::person(4))
            .is_none());

        let report = engine
            .infer_for_record(&mut store, RecordRef::person(99))
            .unwrap();
        assert_eq!(report.created, 0);
    }

    #[test]
    fn test_single_record_pass_for_entity() {
        let mut store = MemoryStore::new();
        let mut ana = PersonRecord::new(1, "Ana Prado");
        let mut company = CompanyEntry::named("Oficina");
        company.tax_id = Some("12.345.678/0001-90".into());
        ana.companies.push(company);
        store.add_person(ana);
        let mut entity = EntityRecord::new(10, "Auto Center");
        entity.tax_id = Some("12345678000190".into());
        store.add_entity(entity);

        let report = InferenceEngine::new()
            .infer_for_record(&mut store, RecordRef::entity(10))
            .unwrap();
        assert_eq!(report.created, 1);
    }

    #[test]
    fn test_full_pass_is_idempotent_on_mixed_population() {
        let mut store = MemoryStore::new();
        let mut ana = PersonRecord::new(1, "Ana Moreira");
        ana.sex = Sex::Female;
        ana.children.push(RelativeEntry::named("Bia Moreira"));
        ana.siblings.push(RelativeEntry::named("Moreira"));
        ana.phones.push("11 3333-4444 ramal".into());
        ana.addresses.push("Rua Sete 70 apto 9".into());
        store.add_person(ana);
        let mut bia = PersonRecord::new(2, "Bia Moreira");
        bia.siblings.push(RelativeEntry::named("Ana"));
        bia.addresses.push("rua sete 70".into());
        store.add_person(bia);

        let engine = InferenceEngine::new();
        let first = engine.infer_all(&mut store).unwrap();
        assert!(first.created > 0);
        let count = store.edge_count();
        let second = engine.infer_all(&mut store).unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(store.edge_count(), count);
    }
}
