/// Entity kinds and the closed vocabularies their attributes draw from.
/// Canonical spellings match what the persisted records store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IrminsulError;

// ---------------------------------------------------------------------------
// Entity kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    Weapon,
    ArtifactSet,
    Monster,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Character,
        EntityKind::Weapon,
        EntityKind::ArtifactSet,
        EntityKind::Monster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Character   => "character",
            EntityKind::Weapon      => "weapon",
            EntityKind::ArtifactSet => "artifact_set",
            EntityKind::Monster     => "monster",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = IrminsulError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "character" | "characters"                => Ok(EntityKind::Character),
            "weapon" | "weapons"                      => Ok(EntityKind::Weapon),
            "artifact_set" | "artifact" | "artifacts" => Ok(EntityKind::ArtifactSet),
            "monster" | "monsters"                    => Ok(EntityKind::Monster),
            other => Err(IrminsulError::UnknownKind(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Vocabulary values
// ---------------------------------------------------------------------------

/// A closed-vocabulary term with a canonical spelling.
pub trait VocabTerm {
    fn as_str(&self) -> &'static str;
}

/// A vocabulary value as observed in a source document.
///
/// Labels found in a normalisation table become `Known`; anything else is kept
/// verbatim as `Raw` so downstream consumers can decide whether to reject it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Vocab<T> {
    Known(T),
    Raw(String),
}

impl<T: VocabTerm> Vocab<T> {
    pub fn as_str(&self) -> &str {
        match self {
            Vocab::Known(term) => term.as_str(),
            Vocab::Raw(raw)    => raw.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Vocab::Known(_))
    }
}

impl<T: VocabTerm> fmt::Display for Vocab<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! vocab_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl VocabTerm for $name {
            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(VocabTerm::as_str(self))
            }
        }
    };
}

vocab_enum!(
    /// Elemental affinity.
    Element {
        Pyro    => "Pyro",
        Hydro   => "Hydro",
        Anemo   => "Anemo",
        Electro => "Electro",
        Dendro  => "Dendro",
        Cryo    => "Cryo",
        Geo     => "Geo",
    }
);

vocab_enum!(
    WeaponType {
        Sword    => "Sword",
        Claymore => "Claymore",
        Polearm  => "Polearm",
        Bow      => "Bow",
        Catalyst => "Catalyst",
    }
);

vocab_enum!(
    Region {
        Mondstadt => "Mondstadt",
        Liyue     => "Liyue",
        Inazuma   => "Inazuma",
        Sumeru    => "Sumeru",
        Fontaine  => "Fontaine",
        Natlan    => "Natlan",
        Snezhnaya => "Snezhnaya",
        Other     => "Other",
    }
);

vocab_enum!(
    /// Equipment slot of an artifact piece.
    ArtifactSlot {
        Flower  => "flower",
        Plume   => "plume",
        Sands   => "sands",
        Goblet  => "goblet",
        Circlet => "circlet",
    }
);

vocab_enum!(
    MonsterCategory {
        Common     => "Common",
        Elite      => "Elite",
        Boss       => "Boss",
        WeeklyBoss => "Weekly Boss",
    }
);

vocab_enum!(
    /// Secondary / ascension stat kinds.
    StatKind {
        AtkPercent       => "ATK%",
        HpPercent        => "HP%",
        DefPercent       => "DEF%",
        CritRate         => "CRIT Rate",
        CritDmg          => "CRIT DMG",
        EnergyRecharge   => "Energy Recharge",
        ElementalMastery => "Elemental Mastery",
        PhysicalDmgBonus => "Physical DMG Bonus",
        ElementalDmgBonus => "Elemental DMG Bonus",
        HealingBonus     => "Healing Bonus",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_parses_aliases() {
        assert_eq!("weapons".parse::<EntityKind>().unwrap(), EntityKind::Weapon);
        assert_eq!("artifact-set".parse::<EntityKind>().unwrap(), EntityKind::ArtifactSet);
        assert_eq!(" Character ".parse::<EntityKind>().unwrap(), EntityKind::Character);
        assert!("dragon".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_entity_kind_display_roundtrips() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.to_string().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_vocab_serializes_as_plain_string() {
        let known: Vocab<Element> = Vocab::Known(Element::Pyro);
        let raw: Vocab<Element> = Vocab::Raw("虚空".to_string());
        assert_eq!(serde_json::to_value(&known).unwrap(), serde_json::json!("Pyro"));
        assert_eq!(serde_json::to_value(&raw).unwrap(), serde_json::json!("虚空"));
    }

    #[test]
    fn test_vocab_deserializes_known_before_raw() {
        let v: Vocab<StatKind> = serde_json::from_str("\"CRIT Rate\"").unwrap();
        assert_eq!(v, Vocab::Known(StatKind::CritRate));
        let v: Vocab<StatKind> = serde_json::from_str("\"Something Else\"").unwrap();
        assert_eq!(v, Vocab::Raw("Something Else".to_string()));
        assert!(!v.is_known());
    }
}
