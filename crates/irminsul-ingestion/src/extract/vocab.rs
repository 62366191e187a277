//! Source-label → canonical vocabulary tables.
//!
//! Adding a label is a one-line change to a table; lookups never branch on
//! individual labels.

use irminsul_common::{ArtifactSlot, Element, MonsterCategory, Region, StatKind, Vocab, WeaponType};

pub type Table<T> = &'static [(&'static str, T)];

pub static ELEMENTS: Table<Element> = &[
    ("火", Element::Pyro),
    ("火元素", Element::Pyro),
    ("水", Element::Hydro),
    ("水元素", Element::Hydro),
    ("风", Element::Anemo),
    ("风元素", Element::Anemo),
    ("雷", Element::Electro),
    ("雷元素", Element::Electro),
    ("草", Element::Dendro),
    ("草元素", Element::Dendro),
    ("冰", Element::Cryo),
    ("冰元素", Element::Cryo),
    ("岩", Element::Geo),
    ("岩元素", Element::Geo),
];

pub static WEAPON_TYPES: Table<WeaponType> = &[
    ("单手剑", WeaponType::Sword),
    ("单手剑武器使用", WeaponType::Sword),
    ("双手剑", WeaponType::Claymore),
    ("双手剑武器使用", WeaponType::Claymore),
    ("长柄武器", WeaponType::Polearm),
    ("长柄武器武器使用", WeaponType::Polearm),
    ("弓", WeaponType::Bow),
    ("弓武器使用", WeaponType::Bow),
    ("弓箭武器使用", WeaponType::Bow),
    ("法器", WeaponType::Catalyst),
    ("法器武器使用", WeaponType::Catalyst),
];

pub static REGIONS: Table<Region> = &[
    ("蒙德", Region::Mondstadt),
    ("璃月", Region::Liyue),
    ("稻妻", Region::Inazuma),
    ("须弥", Region::Sumeru),
    ("枫丹", Region::Fontaine),
    ("纳塔", Region::Natlan),
    ("至冬", Region::Snezhnaya),
    ("其他", Region::Other),
];

pub static ARTIFACT_SLOTS: Table<ArtifactSlot> = &[
    ("生之花", ArtifactSlot::Flower),
    ("死之羽", ArtifactSlot::Plume),
    ("时之沙", ArtifactSlot::Sands),
    ("空之杯", ArtifactSlot::Goblet),
    ("理之冠", ArtifactSlot::Circlet),
];

pub static MONSTER_CATEGORIES: Table<MonsterCategory> = &[
    ("普通", MonsterCategory::Common),
    ("普通敌人", MonsterCategory::Common),
    ("精英", MonsterCategory::Elite),
    ("精英敌人", MonsterCategory::Elite),
    ("首领", MonsterCategory::Boss),
    ("BOSS", MonsterCategory::Boss),
    ("周本", MonsterCategory::WeeklyBoss),
    ("周本首领", MonsterCategory::WeeklyBoss),
];

/// Weapon secondary stats. Matched by containment, in order.
pub static WEAPON_STATS: Table<StatKind> = &[
    ("攻击力", StatKind::AtkPercent),
    ("暴击率", StatKind::CritRate),
    ("暴击伤害", StatKind::CritDmg),
    ("元素充能效率", StatKind::EnergyRecharge),
    ("元素精通", StatKind::ElementalMastery),
    ("物理伤害", StatKind::PhysicalDmgBonus),
    ("生命值", StatKind::HpPercent),
    ("防御力", StatKind::DefPercent),
];

/// Character ascension-stat column headers. Matched by containment, in order.
pub static ASCENSION_STATS: Table<StatKind> = &[
    ("暴击率", StatKind::CritRate),
    ("暴击伤害", StatKind::CritDmg),
    ("元素充能", StatKind::EnergyRecharge),
    ("治疗", StatKind::HealingBonus),
    ("元素精通", StatKind::ElementalMastery),
    ("物理伤害", StatKind::PhysicalDmgBonus),
    ("元素伤害", StatKind::ElementalDmgBonus),
    ("伤害加成", StatKind::ElementalDmgBonus),
];

/// Exact-label lookup. Unknown labels pass through as `Vocab::Raw`.
pub fn normalize<T: Copy>(table: Table<T>, label: &str) -> Option<Vocab<T>> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    Some(
        table
            .iter()
            .find(|(source, _)| *source == label)
            .map(|(_, term)| Vocab::Known(*term))
            .unwrap_or_else(|| Vocab::Raw(label.to_string())),
    )
}

/// First table entry whose label occurs anywhere in `text`.
pub fn scan<T: Copy>(table: Table<T>, text: &str) -> Option<T> {
    table
        .iter()
        .find(|(source, _)| text.contains(source))
        .map(|(_, term)| *term)
}

/// Containment lookup that falls back to the raw label.
pub fn normalize_containing<T: Copy>(table: Table<T>, label: &str) -> Option<Vocab<T>> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    Some(scan(table, label).map(Vocab::Known).unwrap_or_else(|| Vocab::Raw(label.to_string())))
}

/// Element label, tolerating a trailing "元素".
pub fn element(label: &str) -> Option<Vocab<Element>> {
    let label = label.trim();
    normalize(ELEMENTS, label).map(|v| match v {
        Vocab::Raw(_) => normalize(ELEMENTS, label.trim_end_matches("元素"))
            .unwrap_or_else(|| Vocab::Raw(label.to_string())),
        known => known,
    })
}
