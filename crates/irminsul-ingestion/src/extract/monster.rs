//! Monster pages: profile table plus drop, ability and resistance tables.

use std::collections::BTreeMap;

use irminsul_common::{EntityKind, Vocab, VocabTerm};
use scraper::{ElementRef, Html};

use super::vocab::{self, ELEMENTS, MONSTER_CATEGORIES, REGIONS};
use super::{lead_paragraph, parse_int, parse_number, selector, text_of, truncate_chars, Extractor};
use crate::record::{Attributes, ExtractedRecord, MonsterAbility, MonsterAttributes, MonsterDrop};

/// Placeholder cell values meaning "nothing here".
const EMPTY_MARKERS: &[&str] = &["", "-", "—", "无", "暂无"];

#[derive(Debug, Clone, Copy, Default)]
pub struct MonsterExtractor;

impl Extractor for MonsterExtractor {
    fn kind(&self) -> EntityKind {
        EntityKind::Monster
    }

    fn extract_from(&self, page: &Html, natural_key: &str) -> ExtractedRecord {
        let mut attrs = MonsterAttributes::default();

        if let Some(profile) = page.select(selector!("table.wikitable")).next() {
            read_profile(profile, &mut attrs);
        }
        if let Some(table) = page.select(selector!("table.drops")).next() {
            attrs.drops = body_rows(table).into_iter().filter_map(drop_row).collect();
        }
        if let Some(table) = page.select(selector!("table.abilities")).next() {
            attrs.abilities = body_rows(table).into_iter().filter_map(ability_row).collect();
        }
        if let Some(table) = page.select(selector!("table.resistance")).next() {
            attrs.resistances = read_resistances(table);
        }
        attrs.description = lead_paragraph(page, &[]);

        ExtractedRecord::new(natural_key, Attributes::Monster(attrs))
    }
}

fn meaningful(value: &str) -> Option<&str> {
    let v = value.trim();
    (!EMPTY_MARKERS.contains(&v)).then_some(v)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileField {
    NameEn,
    Category,
    Family,
    Element,
    Level,
    Regions,
    Exp,
    Mora,
}

/// Exact profile labels. Compound labels get their own entry.
const PROFILE_LABELS: &[(&str, ProfileField)] = &[
    ("英文名",   ProfileField::NameEn),
    ("英文名称", ProfileField::NameEn),
    ("类型",     ProfileField::Category),
    ("怪物类型", ProfileField::Category),
    ("种类",     ProfileField::Family),
    ("族群",     ProfileField::Family),
    ("元素",     ProfileField::Element),
    ("元素类型", ProfileField::Element),
    ("等级",     ProfileField::Level),
    ("出没地区", ProfileField::Regions),
    ("经验",     ProfileField::Exp),
    ("经验值",   ProfileField::Exp),
    ("摩拉",     ProfileField::Mora),
];

fn profile_field(label: &str) -> Option<ProfileField> {
    let label = label.trim().trim_end_matches(['：', ':']).trim();
    PROFILE_LABELS
        .iter()
        .find(|(text, _)| *text == label)
        .map(|(_, field)| *field)
}

fn read_profile(table: ElementRef<'_>, attrs: &mut MonsterAttributes) {
    for row in table.select(selector!("tr")) {
        let (Some(th), Some(td)) = (row.select(selector!("th")).next(), row.select(selector!("td")).next()) else {
            continue;
        };
        let Some(field) = profile_field(&text_of(th)) else { continue };
        let raw = text_of(td);
        let Some(value) = meaningful(&raw) else { continue };

        match field {
            ProfileField::NameEn   => attrs.name_en = Some(value.to_string()),
            ProfileField::Category => attrs.category = vocab::normalize(MONSTER_CATEGORIES, value),
            ProfileField::Family   => attrs.family = Some(value.to_string()),
            ProfileField::Element  => attrs.element = vocab::element(value),
            ProfileField::Level    => attrs.level = parse_int(value),
            ProfileField::Regions  => {
                attrs.regions = value
                    .split(['、', ',', '，', '/', ' '])
                    .filter_map(|r| vocab::normalize(REGIONS, r))
                    .collect();
            }
            ProfileField::Exp  => attrs.exp_reward = parse_int(value),
            ProfileField::Mora => attrs.mora_reward = parse_int(value),
        }
    }
}

/// Rows that carry `<td>` cells, as trimmed texts. Header rows are skipped.
fn body_rows(table: ElementRef<'_>) -> Vec<Vec<String>> {
    table
        .select(selector!("tr"))
        .map(|row| row.select(selector!("td")).map(text_of).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect()
}

fn drop_row(cells: Vec<String>) -> Option<MonsterDrop> {
    let item = meaningful(cells.first()?)?.to_string();
    Some(MonsterDrop {
        item,
        quantity: cells.get(1).and_then(|q| meaningful(q)).map(String::from),
        probability: cells.get(2).and_then(|p| parse_number(p)),
    })
}

fn ability_row(cells: Vec<String>) -> Option<MonsterAbility> {
    let name = meaningful(cells.first()?)?.to_string();
    Some(MonsterAbility {
        name,
        description: cells
            .get(1)
            .and_then(|d| meaningful(d))
            .map(|d| truncate_chars(d, 300)),
    })
}

/// Header row of element labels, value row of percentages. Cells that do not
/// parse are left out.
fn read_resistances(table: ElementRef<'_>) -> BTreeMap<String, f64> {
    let rows: Vec<ElementRef<'_>> = table.select(selector!("tr")).collect();
    let Some(header) = rows.first() else { return BTreeMap::new() };
    let labels: Vec<String> = header.select(selector!("th")).map(text_of).collect();
    let Some(values) = rows.iter().skip(1).map(|r| body_cells(*r)).find(|c| !c.is_empty()) else {
        return BTreeMap::new();
    };

    labels
        .iter()
        .zip(values.iter())
        .filter_map(|(label, value)| Some((resistance_key(label)?, parse_number(value)?)))
        .collect()
}

fn body_cells(row: ElementRef<'_>) -> Vec<String> {
    row.select(selector!("td")).map(text_of).collect()
}

fn resistance_key(label: &str) -> Option<String> {
    let label = meaningful(label)?;
    if label.contains("物理") {
        return Some("Physical".to_string());
    }
    match vocab::normalize(ELEMENTS, label.trim_end_matches("元素"))? {
        Vocab::Known(element) => Some(element.as_str().to_string()),
        Vocab::Raw(raw) => Some(raw),
    }
}
