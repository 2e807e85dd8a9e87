//! Record lookup by free text.
//!
//! A query matches a record when it is contained in:
//!
//! - the person name, or the entity legal or trade name (case-insensitive)
//! - the tax id, phones, compared on digits only
//! - any address, after normalization
//!
//! Hits are ranked by relevance: an exact name beats a tax id hit, which
//! beats a partial name, which beats a contact hit.

use serde::{Deserialize, Serialize};

use crate::matcher::{digits, normalize_address};
use crate::schema::{Record, RecordRef};

/// Queries shorter than this return nothing.
pub const MIN_QUERY_LEN: usize = 2;

/// Digit queries need this many digits before they match documents or phones.
pub const MIN_QUERY_DIGITS: usize = 3;

/// Default number of hits returned.
pub const DEFAULT_LIMIT: usize = 10;

/// Which field of a record the query was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Name,
    TaxId,
    Phone,
    Address,
}

impl MatchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::Name => "name",
            MatchField::TaxId => "tax_id",
            MatchField::Phone => "phone",
            MatchField::Address => "address",
        }
    }

    fn weight(&self) -> u32 {
        match self {
            MatchField::Name => 50,
            MatchField::TaxId => 60,
            MatchField::Phone => 20,
            MatchField::Address => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub record: RecordRef,
    pub node_id: String,
    pub display_name: String,
    pub score: u32,
    pub matched: Vec<MatchField>,
}

/// Match `query` against `records`, best hits first, at most `limit` of them.
pub fn search(records: &[Record], query: &str, limit: usize) -> Vec<SearchHit> {
    let text = query.trim().to_lowercase();
    if text.chars().count() < MIN_QUERY_LEN {
        return Vec::new();
    }
    let query_digits = digits(&text);
    let query_digits = (query_digits.len() >= MIN_QUERY_DIGITS).then_some(query_digits);
    let query_address = normalize_address(&text);

    let mut hits: Vec<SearchHit> = records
        .iter()
        .filter_map(|record| {
            let fields = RecordFields::of(record);
            let mut matched = Vec::new();
            let mut score = 0;

            let mut exact_name = false;
            if fields.names.iter().any(|n| n.to_lowercase().contains(&text)) {
                matched.push(MatchField::Name);
                exact_name = fields.names.iter().any(|n| n.trim().to_lowercase() == text);
            }
            if let Some(q) = &query_digits {
                if fields.tax_id.map(digits).is_some_and(|d| d.contains(q.as_str())) {
                    matched.push(MatchField::TaxId);
                }
                if fields.phones.iter().any(|p| digits(p).contains(q.as_str())) {
                    matched.push(MatchField::Phone);
                }
            }
            let address_hit = fields.addresses.iter().any(|a| match &query_address {
                Some(q) => normalize_address(a).is_some_and(|a| a.contains(q.as_str())),
                None => a.to_lowercase().contains(&text),
            });
            if address_hit {
                matched.push(MatchField::Address);
            }

            if matched.is_empty() {
                return None;
            }
            for field in &matched {
                score += field.weight();
            }
            if exact_name {
                score += 50;
            }
            let record_ref = record.record_ref();
            Some(SearchHit {
                node_id: record_ref.node_id(),
                record: record_ref,
                display_name: record.display_name().to_string(),
                score,
                matched,
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.record.cmp(&b.record)));
    hits.truncate(limit);
    hits
}

/// Searchable fields, borrowed from either record kind.
struct RecordFields<'a> {
    names: Vec<&'a str>,
    tax_id: Option<&'a str>,
    phones: &'a [String],
    addresses: Vec<&'a str>,
}

impl<'a> RecordFields<'a> {
    fn of(record: &'a Record) -> Self {
        match record {
            Record::Person(p) => Self {
                names: vec![p.name.as_str()],
                tax_id: p.tax_id.as_deref(),
                phones: &p.phones,
                addresses: p.addresses.iter().map(String::as_str).collect(),
            },
            Record::Entity(e) => Self {
                names: std::iter::once(e.legal_name.as_str())
                    .chain(e.trade_name.as_deref())
                    .collect(),
                tax_id: e.tax_id.as_deref(),
                phones: &e.phones,
                addresses: e
                    .address
                    .as_deref()
                    .into_iter()
                    .chain(e.branch_addresses.iter().map(String::as_str))
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityRecord, PersonRecord};

    fn records() -> Vec<Record> {
        let mut ana = PersonRecord::new(1, "Ana Silva");
        ana.tax_id = Some("123.456.789-00".into());
        ana.phones.push("(11) 98765-4321".into());
        ana.addresses.push("Rua das Flores, 100, apto 12".into());
        let bruno = PersonRecord::new(2, "Bruno Silva");
        let mut acme = EntityRecord::new(1, "Silva Comercio Ltda");
        acme.trade_name = Some("Mercado Ana".into());
        acme.tax_id = Some("12.345.678/0001-90".into());
        acme.branch_addresses.push("Avenida Central, 500".into());
        vec![Record::Person(ana), Record::Person(bruno), Record::Entity(acme)]
    }

    #[test]
    fn test_exact_name_ranks_first() {
        let hits = search(&records(), "bruno silva", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node_id, "person_2");
        assert_eq!(hits[0].score, 100);

        let hits = search(&records(), "Silva", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.matched == vec![MatchField::Name]));
    }

    #[test]
    fn test_trade_name_matches_entity() {
        let hits = search(&records(), "mercado", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record, RecordRef::entity(1));
        assert_eq!(hits[0].display_name, "Silva Comercio Ltda");
    }

    #[test]
    fn test_document_and_phone_match_on_digits() {
        let hits = search(&records(), "123.456.789", DEFAULT_LIMIT);
        assert_eq!(hits[0].node_id, "person_1");
        assert_eq!(hits[0].matched, vec![MatchField::TaxId]);

        let hits = search(&records(), "0001-90", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record, RecordRef::entity(1));

        let hits = search(&records(), "98765 4321", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].matched, vec![MatchField::Phone]);
    }

    #[test]
    fn test_address_matches_head_office_and_branches() {
        let hits = search(&records(), "rua das flores, 100", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].matched, vec![MatchField::Address]);

        let hits = search(&records(), "avenida central", DEFAULT_LIMIT);
        assert_eq!(hits[0].record, RecordRef::entity(1));
    }

    #[test]
    fn test_short_or_empty_queries_return_nothing() {
        assert!(search(&records(), "", DEFAULT_LIMIT).is_empty());
        assert!(search(&records(), " a ", DEFAULT_LIMIT).is_empty());
        // Two digits are too few to scan documents
        assert!(search(&records(), "99", DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn test_limit_applies_after_ranking() {
        let hits = search(&records(), "silva", 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record, RecordRef::person(1));
    }
}
