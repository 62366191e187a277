//! Typed extraction results.
//!
//! Every attribute is optional. `None` (and an empty list or map) means the
//! field was not observed in this document; it never means "cleared".

use std::collections::BTreeMap;

use irminsul_common::{
    ArtifactSlot, Element, EntityKind, MonsterCategory, Region, StatKind, Vocab, WeaponType,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseStats {
    pub hp: Option<f64>,
    pub atk: Option<f64>,
    pub def: Option<f64>,
}

impl BaseStats {
    pub fn is_empty(&self) -> bool {
        self.hp.is_none() && self.atk.is_none() && self.def.is_none()
    }
}

/// One row of a character's per-level stat table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterLevel {
    pub level: String,
    pub hp: Option<f64>,
    pub atk: Option<f64>,
    pub def: Option<f64>,
    pub bonus: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterAttributes {
    pub full_name: Option<String>,
    pub name_en: Option<String>,
    pub rarity: Option<u8>,
    pub element: Option<Vocab<Element>>,
    pub weapon_type: Option<Vocab<WeaponType>>,
    pub region: Option<Vocab<Region>>,
    pub description: Option<String>,
    pub base_stats: Option<BaseStats>,
    pub ascension_stat: Option<Vocab<StatKind>>,
    pub ascension_value: Option<f64>,
    pub stat_progression: Vec<CharacterLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponLevel {
    pub level: String,
    pub base_attack: Option<i64>,
    pub secondary_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponAttributes {
    pub full_name: Option<String>,
    pub name_en: Option<String>,
    pub weapon_type: Option<Vocab<WeaponType>>,
    pub rarity: Option<u8>,
    pub base_attack: Option<i64>,
    pub secondary_stat: Option<Vocab<StatKind>>,
    pub secondary_stat_value: Option<f64>,
    pub description: Option<String>,
    pub passive_name: Option<String>,
    pub passive_description: Option<String>,
    pub stat_progression: Vec<WeaponLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPiece {
    pub slot: Option<Vocab<ArtifactSlot>>,
    pub slot_label: Option<String>,
    pub name: Option<String>,
    pub lore: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSetAttributes {
    pub full_name: Option<String>,
    pub name_en: Option<String>,
    pub max_rarity: Option<u8>,
    pub tags: Vec<String>,
    pub two_piece_bonus: Option<String>,
    pub four_piece_bonus: Option<String>,
    pub description: Option<String>,
    pub pieces: Vec<ArtifactPiece>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterDrop {
    pub item: String,
    pub quantity: Option<String>,
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterAbility {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterAttributes {
    pub name_en: Option<String>,
    pub category: Option<Vocab<MonsterCategory>>,
    pub family: Option<String>,
    pub element: Option<Vocab<Element>>,
    pub level: Option<i64>,
    pub regions: Vec<Vocab<Region>>,
    pub exp_reward: Option<i64>,
    pub mora_reward: Option<i64>,
    pub description: Option<String>,
    pub drops: Vec<MonsterDrop>,
    pub abilities: Vec<MonsterAbility>,
    /// Resistance percentage keyed by canonical element (or raw label).
    pub resistances: BTreeMap<String, f64>,
}

/// Attribute bag tagged by entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "attributes", rename_all = "snake_case")]
pub enum Attributes {
    Character(CharacterAttributes),
    Weapon(WeaponAttributes),
    ArtifactSet(ArtifactSetAttributes),
    Monster(MonsterAttributes),
}

impl Attributes {
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Character   => Attributes::Character(Default::default()),
            EntityKind::Weapon      => Attributes::Weapon(Default::default()),
            EntityKind::ArtifactSet => Attributes::ArtifactSet(Default::default()),
            EntityKind::Monster     => Attributes::Monster(Default::default()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Attributes::Character(_)   => EntityKind::Character,
            Attributes::Weapon(_)      => EntityKind::Weapon,
            Attributes::ArtifactSet(_) => EntityKind::ArtifactSet,
            Attributes::Monster(_)     => EntityKind::Monster,
        }
    }

    /// Observed fields only, as a JSON object.
    pub fn observed(&self) -> Map<String, Value> {
        let value = match self {
            Attributes::Character(a)   => serde_json::to_value(a),
            Attributes::Weapon(a)      => serde_json::to_value(a),
            Attributes::ArtifactSet(a) => serde_json::to_value(a),
            Attributes::Monster(a)     => serde_json::to_value(a),
        };
        match value {
            Ok(Value::Object(map)) => prune(map),
            _ => Map::new(),
        }
    }

    /// Rebuilds a typed bag from an observed-field map.
    pub fn from_observed(kind: EntityKind, map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let value = Value::Object(map);
        Ok(match kind {
            EntityKind::Character   => Attributes::Character(serde_json::from_value(value)?),
            EntityKind::Weapon      => Attributes::Weapon(serde_json::from_value(value)?),
            EntityKind::ArtifactSet => Attributes::ArtifactSet(serde_json::from_value(value)?),
            EntityKind::Monster     => Attributes::Monster(serde_json::from_value(value)?),
        })
    }
}

/// Drops nulls, empty lists and empty objects. Nested objects are pruned the same way.
fn prune(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter_map(|(k, v)| {
            let v = match v {
                Value::Object(inner) => Value::Object(prune(inner)),
                other => other,
            };
            let unobserved = match &v {
                Value::Null => true,
                Value::Array(items) => items.is_empty(),
                Value::Object(inner) => inner.is_empty(),
                _ => false,
            };
            (!unobserved).then_some((k, v))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub natural_key: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl ExtractedRecord {
    pub fn new(natural_key: impl Into<String>, attributes: Attributes) -> Self {
        Self { natural_key: natural_key.into(), attributes }
    }

    pub fn kind(&self) -> EntityKind {
        self.attributes.kind()
    }

    pub fn observed(&self) -> Map<String, Value> {
        self.attributes.observed()
    }

    /// True when extraction yielded no information at all.
    pub fn is_empty(&self) -> bool {
        self.observed().is_empty()
    }
}
