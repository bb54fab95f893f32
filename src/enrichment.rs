// 🔗 Enrichment Join - CandidateFact × ReferenceTable
//
// A miss is an expected outcome (inactive or unregistered operators), not an
// error. A hit carries the CNPJ verdict; filtering invalid ones is the
// caller's job so it can be counted.

use crate::cnpj::is_valid_cnpj;
use crate::normalizer::CandidateFact;
use crate::registry::{ReferenceEntity, ReferenceTable};

/// A fact joined with its operator
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedFact<'a> {
    pub fact: CandidateFact,
    pub entity: &'a ReferenceEntity,
    pub valid_tax_id: bool,
}

impl<'a> EnrichedFact<'a> {
    pub fn amount(&self) -> f64 {
        self.fact.amount
    }

    pub fn legal_name(&self) -> &'a str {
        &self.entity.legal_name
    }

    pub fn category(&self) -> &'a str {
        &self.entity.category
    }

    pub fn region(&self) -> &'a str {
        &self.entity.region
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome<'a> {
    Matched(EnrichedFact<'a>),
    NoMatch,
}

/// Resolve a fact's Registro ANS against the registry
pub fn enrich<'a>(fact: CandidateFact, table: &'a ReferenceTable) -> JoinOutcome<'a> {
    match table.lookup(&fact.registry_code) {
        Some(entity) => {
            let valid_tax_id = is_valid_cnpj(&entity.tax_id);
            JoinOutcome::Matched(EnrichedFact {
                fact,
                entity,
                valid_tax_id,
            })
        }
        None => JoinOutcome::NoMatch,
    }
}
