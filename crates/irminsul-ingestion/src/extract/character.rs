//! Character pages: profile table, per-level stat table, lead paragraph.

use irminsul_common::{EntityKind, StatKind, Vocab};
use scraper::{ElementRef, Html};

use super::vocab::{self, ASCENSION_STATS, REGIONS, WEAPON_TYPES};
use super::{
    english_name, lead_paragraph, parse_number, selector, star_count, stars_marker,
    text_of, Extractor,
};
use crate::record::{Attributes, BaseStats, CharacterAttributes, CharacterLevel, ExtractedRecord};

const DESCRIPTION_SKIP: &[&str] = &["第", "章", "幕", "====", "CV", "配音"];

#[derive(Debug, Clone, Copy, Default)]
pub struct CharacterExtractor;

impl Extractor for CharacterExtractor {
    fn kind(&self) -> EntityKind {
        EntityKind::Character
    }

    fn extract_from(&self, page: &Html, natural_key: &str) -> ExtractedRecord {
        let mut attrs = CharacterAttributes::default();

        let mut tables = page.select(selector!("table.wikitable"));
        if let Some(profile) = tables.next() {
            read_profile(profile, &mut attrs);
        }
        if let Some(stats) = tables.next() {
            read_stats(stats, &mut attrs);
        }

        attrs.description = lead_paragraph(page, DESCRIPTION_SKIP);
        attrs.name_en = attrs.full_name.as_deref().and_then(english_name);

        ExtractedRecord::new(natural_key, Attributes::Character(attrs))
    }
}

fn read_profile(table: ElementRef<'_>, attrs: &mut CharacterAttributes) {
    for row in table.select(selector!("tr")) {
        let (Some(th), Some(td)) = (row.select(selector!("th")).next(), row.select(selector!("td")).next()) else {
            continue;
        };
        let label = text_of(th);
        let value = text_of(td);

        if label.contains("全名") || label.contains("本名") {
            attrs.full_name = Some(value).filter(|v| !v.is_empty());
        } else if label.contains("所属地区") {
            attrs.region = vocab::normalize(REGIONS, &value);
        } else if ["神之眼", "神之心", "古龙大权"].iter().any(|l| label.contains(l)) {
            attrs.element = vocab::element(&value);
        } else if label.contains("武器类型") {
            attrs.weapon_type = vocab::normalize(WEAPON_TYPES, &value);
        } else if label.contains("稀有度") {
            attrs.rarity = rarity_cell(td, &value);
        }
    }
}

fn rarity_cell(td: ElementRef<'_>, text: &str) -> Option<u8> {
    let from_image = td.select(selector!("img")).next().and_then(|img| {
        let alt = img.value().attr("alt").unwrap_or_default();
        let src = img.value().attr("src").unwrap_or_default();
        stars_marker(&[alt, src])
    });
    from_image.or_else(|| star_count(text))
}

enum Column {
    Hp,
    Atk,
    Def,
    Bonus(Vocab<StatKind>),
    Ignored,
}

fn classify_header(header: &str) -> Column {
    if let Some(stat) = vocab::scan(ASCENSION_STATS, header) {
        return Column::Bonus(Vocab::Known(stat));
    }
    let lower = header.to_lowercase();
    if header.contains("生命") || lower.contains("hp") {
        Column::Hp
    } else if header.contains("攻击") || lower.contains("atk") || lower.contains("attack") {
        Column::Atk
    } else if header.contains("防御") || lower.contains("def") {
        Column::Def
    } else {
        Column::Ignored
    }
}

/// Header row, then a pre/post-ascension sub-header row, then one row per
/// level. Value cells sit at odd indexes, each followed by a placeholder.
fn read_stats(table: ElementRef<'_>, attrs: &mut CharacterAttributes) {
    let rows: Vec<ElementRef<'_>> = table.select(selector!("tr")).collect();
    if rows.len() < 3 {
        return;
    }

    let columns: Vec<Column> = rows[0]
        .select(selector!("th"))
        .skip(1)
        .map(|th| classify_header(&text_of(th)))
        .collect();

    let mut levels: Vec<(CharacterLevel, Option<Vocab<StatKind>>)> = Vec::new();
    for row in &rows[2..] {
        let cells: Vec<ElementRef<'_>> = row.select(selector!("td")).collect();
        let Some(level) = cells.first().map(|c| text_of(*c)).filter(|l| !l.is_empty()) else {
            continue;
        };
        let mut entry = CharacterLevel { level, ..Default::default() };
        let mut bonus_kind = None;

        for (i, column) in columns.iter().enumerate() {
            let Some(cell) = cells.get(1 + 2 * i) else { break };
            let Some(value) = parse_number(&text_of(*cell)) else { continue };
            match column {
                Column::Hp => entry.hp = Some(value),
                Column::Atk => entry.atk = Some(value),
                Column::Def => entry.def = Some(value),
                Column::Bonus(kind) => {
                    entry.bonus = Some(value);
                    bonus_kind = Some(kind.clone());
                }
                Column::Ignored => {}
            }
        }
        levels.push((entry, bonus_kind));
    }

    let target = levels
        .iter()
        .rev()
        .find(|(l, _)| l.level == "90" || l.level == "90级")
        .or_else(|| levels.last());

    if let Some((top, bonus_kind)) = target {
        let base = BaseStats { hp: top.hp, atk: top.atk, def: top.def };
        attrs.base_stats = (!base.is_empty()).then_some(base);
        if let (Some(kind), Some(value)) = (bonus_kind, top.bonus) {
            attrs.ascension_stat = Some(kind.clone());
            attrs.ascension_value = Some(value);
        }
    }

    attrs.stat_progression = levels.into_iter().map(|(l, _)| l).collect();
}
