//! Default values for natural keys whose pages lack a fixed attribute.
//!
//! Rules are data: each names a kind, a key, a field and a value. A rule only
//! fills a field the extractor left unobserved.

use irminsul_common::EntityKind;
use serde_json::Value;

use crate::error::ExtractError;
use crate::record::{Attributes, ExtractedRecord};

#[derive(Debug, Clone, Copy)]
pub struct DefaultRule {
    pub kind: EntityKind,
    pub natural_key: &'static str,
    pub field: &'static str,
    pub value: &'static str,
}

pub static DEFAULT_RULES: &[DefaultRule] = &[
    // The Traveler has no fixed element or home region.
    DefaultRule { kind: EntityKind::Character, natural_key: "旅行者", field: "element", value: "Anemo" },
    DefaultRule { kind: EntityKind::Character, natural_key: "旅行者", field: "name_en", value: "Traveler" },
    DefaultRule { kind: EntityKind::Character, natural_key: "旅行者", field: "region",  value: "Other" },
];

/// Fills unobserved fields from matching rules. Returns how many were applied.
pub fn apply(record: &mut ExtractedRecord, rules: &[DefaultRule]) -> Result<usize, ExtractError> {
    let kind = record.kind();
    let matching: Vec<&DefaultRule> = rules
        .iter()
        .filter(|r| r.kind == kind && r.natural_key == record.natural_key)
        .collect();
    if matching.is_empty() {
        return Ok(0);
    }

    let mut observed = record.observed();
    let mut applied = 0;
    for rule in &matching {
        if !observed.contains_key(rule.field) {
            observed.insert(rule.field.to_string(), Value::String(rule.value.to_string()));
            applied += 1;
            tracing::info!(kind = %kind, natural_key = %record.natural_key, field = rule.field, value = rule.value, "Applied default value");
        }
    }

    if applied > 0 {
        record.attributes = Attributes::from_observed(kind, observed).map_err(|e| ExtractError::InvalidDefault {
            kind,
            natural_key: record.natural_key.clone(),
            field: matching.iter().map(|r| r.field).collect::<Vec<_>>().join(","),
            detail: e.to_string(),
        })?;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CharacterAttributes;
    use irminsul_common::{Element, Region, Vocab};

    #[test]
    fn test_traveler_gets_defaults() {
        let mut record = ExtractedRecord::new("旅行者", Attributes::empty(EntityKind::Character));
        let applied = apply(&mut record, DEFAULT_RULES).unwrap();
        assert_eq!(applied, 3);

        let Attributes::Character(c) = &record.attributes else { panic!("wrong kind") };
        assert_eq!(c.element, Some(Vocab::Known(Element::Anemo)));
        assert_eq!(c.region, Some(Vocab::Known(Region::Other)));
        assert_eq!(c.name_en.as_deref(), Some("Traveler"));
    }

    #[test]
    fn test_observed_values_win_over_defaults() {
        let mut record = ExtractedRecord::new(
            "旅行者",
            Attributes::Character(CharacterAttributes {
                element: Some(Vocab::Known(Element::Geo)),
                ..Default::default()
            }),
        );
        apply(&mut record, DEFAULT_RULES).unwrap();
        let Attributes::Character(c) = &record.attributes else { panic!("wrong kind") };
        assert_eq!(c.element, Some(Vocab::Known(Element::Geo)));
    }

    #[test]
    fn test_other_keys_untouched() {
        let mut record = ExtractedRecord::new("琴", Attributes::empty(EntityKind::Character));
        assert_eq!(apply(&mut record, DEFAULT_RULES).unwrap(), 0);
        assert!(record.is_empty());
    }

    #[test]
    fn test_ill_typed_rule_is_reported() {
        let rules = [DefaultRule {
            kind: EntityKind::Weapon,
            natural_key: "Alpha",
            field: "rarity",
            value: "five",
        }];
        let mut record = ExtractedRecord::new("Alpha", Attributes::empty(EntityKind::Weapon));
        assert!(matches!(apply(&mut record, &rules), Err(ExtractError::InvalidDefault { .. })));
    }
}
