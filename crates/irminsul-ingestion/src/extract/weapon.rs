//! Weapon pages: `YSCard` summary, `YS-WeaponData` level table, passive block.

use irminsul_common::{EntityKind, Vocab};
use scraper::{ElementRef, Html};

use super::vocab::{self, WEAPON_STATS, WEAPON_TYPES};
use super::{
    english_name, first_text, lead_paragraph, parse_int, parse_number, selector, star_count,
    text_of, truncate_chars, Extractor,
};
use crate::record::{Attributes, ExtractedRecord, WeaponAttributes, WeaponLevel};

#[derive(Debug, Clone, Copy, Default)]
pub struct WeaponExtractor;

impl Extractor for WeaponExtractor {
    fn kind(&self) -> EntityKind {
        EntityKind::Weapon
    }

    fn extract_from(&self, page: &Html, natural_key: &str) -> ExtractedRecord {
        let mut attrs = WeaponAttributes::default();
        let mut card_description = None;

        if let Some(card) = page.select(selector!("div.YSCard")).next() {
            card_description = read_card(card, &mut attrs);
        }

        if let Some(table) = page.select(selector!("div.YS-WeaponData table.YS-DataTable")).next() {
            read_levels(table, &mut attrs);
        }

        if let Some(skill) = page.select(selector!("div.YS-WeaponSkill")).next() {
            attrs.passive_name = first_text(skill, selector!(".skill-name"));
            attrs.passive_description = first_text(skill, selector!(".skill-desc"))
                .map(|d| truncate_chars(&d, 500));
        }

        attrs.description = lead_paragraph(page, &[]).or(card_description);
        attrs.name_en = attrs.full_name.as_deref().and_then(english_name);

        ExtractedRecord::new(natural_key, Attributes::Weapon(attrs))
    }
}

/// Returns the card's own description paragraph, used when the page has no lead.
fn read_card(card: ElementRef<'_>, attrs: &mut WeaponAttributes) -> Option<String> {
    if let Some(title) = card.select(selector!("div.card-title1")).next() {
        let text = text_of(title);
        attrs.rarity = star_count(&text);
        let name = text.replace(['★', '☆'], "").trim().to_string();
        attrs.full_name = Some(name).filter(|n| !n.is_empty());
    }

    // "攻击力 48-674 /// 物理伤害加成 9.0%-41.3%"
    if let Some(line) = first_text(card, selector!("div.card-title2 p")) {
        if let Some((_, secondary)) = line.split_once("///") {
            let label: String = secondary.trim().chars().take_while(|c| !c.is_ascii_digit()).collect();
            attrs.secondary_stat = vocab::normalize_containing(WEAPON_STATS, &label);
        }
    }

    attrs.weapon_type = vocab::scan(WEAPON_TYPES, &text_of(card)).map(Vocab::Known);

    card.select(selector!("p"))
        .map(text_of)
        .find(|t| t.chars().count() >= 20 && !t.contains("突破") && !t.contains("材料"))
        .map(|t| truncate_chars(&t, 200))
}

fn read_levels(table: ElementRef<'_>, attrs: &mut WeaponAttributes) {
    let rows: Vec<ElementRef<'_>> = table.select(selector!("tr")).collect();
    if rows.len() < 2 {
        return;
    }

    let headers: Vec<String> = rows[0].select(selector!("th, td")).map(text_of).collect();

    let mut top: Option<(String, Vec<String>)> = None;
    for row in &rows[1..] {
        let cells: Vec<String> = row.select(selector!("td")).map(text_of).collect();
        if cells.len() < 3 {
            continue;
        }
        let level = cells[0].clone();
        let entry = WeaponLevel {
            level: level.clone(),
            base_attack: parse_int(&cells[1]),
            secondary_value: cells.last().and_then(|c| parse_number(c)),
        };
        if top.is_none() && parse_int(&level) == Some(90) {
            top = Some((level, cells));
        }
        attrs.stat_progression.push(entry);
    }

    let Some((_, cells)) = top else { return };
    attrs.base_attack = parse_int(&cells[1]);
    attrs.secondary_stat_value = cells.last().and_then(|c| parse_number(c));
    if attrs.secondary_stat.is_none() && attrs.secondary_stat_value.is_some() {
        attrs.secondary_stat = headers
            .get(3)
            .and_then(|h| vocab::normalize_containing(WEAPON_STATS, h));
    }
}
