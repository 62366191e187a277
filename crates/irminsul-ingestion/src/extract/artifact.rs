//! Artifact-set pages: attribute box, set-bonus table, piece list with lore.

use irminsul_common::EntityKind;
use scraper::{ElementRef, Html};

use super::vocab::{self, ARTIFACT_SLOTS};
use super::{english_name, first_text, lead_paragraph, selector, stars_marker, text_of, truncate_chars, Extractor};
use crate::record::{ArtifactPiece, ArtifactSetAttributes, Attributes, ExtractedRecord};

#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactSetExtractor;

impl Extractor for ArtifactSetExtractor {
    fn kind(&self) -> EntityKind {
        EntityKind::ArtifactSet
    }

    fn extract_from(&self, page: &Html, natural_key: &str) -> ExtractedRecord {
        let mut attrs = ArtifactSetAttributes::default();

        if let Some(attribute) = page.select(selector!("div.attribute")).next() {
            read_attribute_box(attribute, &mut attrs);
        }

        attrs.description = lead_paragraph(page, &["件套"]);
        attrs.name_en = attrs.full_name.as_deref().and_then(english_name);
        attrs.pieces = read_pieces(page);

        ExtractedRecord::new(natural_key, Attributes::ArtifactSet(attrs))
    }
}

fn read_attribute_box(attribute: ElementRef<'_>, attrs: &mut ArtifactSetAttributes) {
    if let Some(star) = attribute.select(selector!("div.star")).next() {
        attrs.max_rarity = star
            .select(selector!("img"))
            .filter_map(|img| stars_marker(&[img.value().attr("alt").unwrap_or_default()]))
            .max();
    }

    attrs.full_name = first_text(attribute, selector!("div.name"));

    // "TAG：元素伤害、火"
    if let Some(tag_line) = first_text(attribute, selector!("div.tag")) {
        if tag_line.contains("TAG") {
            let body = tag_line.replace("TAG：", "").replace("TAG:", "");
            attrs.tags = body
                .split(['、', ',', '，'])
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
    }

    if let Some(effects) = attribute.select(selector!("table.effect")).next() {
        for row in effects.select(selector!("tr")) {
            let cells: Vec<String> = row.select(selector!("td")).map(text_of).collect();
            let [pieces, effect, ..] = cells.as_slice() else { continue };
            if effect.is_empty() {
                continue;
            }
            if pieces.contains("2件套") || pieces.contains("二件套") {
                attrs.two_piece_bonus = Some(truncate_chars(effect, 300));
            } else if pieces.contains("4件套") || pieces.contains("四件套") {
                attrs.four_piece_bonus = Some(truncate_chars(effect, 500));
            }
        }
    }
}

/// Pieces in page order; the i-th `div.story` is the i-th piece's lore.
/// A piece block missing its icon markup is skipped without affecting the others.
fn read_pieces(page: &Html) -> Vec<ArtifactPiece> {
    let stories: Vec<String> = page
        .select(selector!("div.intext div.story"))
        .map(text_of)
        .collect();

    page.select(selector!("div.bili-list-style"))
        .enumerate()
        .filter_map(|(i, block)| {
            let main = block.select(selector!("div.icon div.main")).next()?;
            let slot_label = first_text(main, selector!("div.down"));
            Some(ArtifactPiece {
                slot: slot_label.as_deref().and_then(|l| vocab::normalize(ARTIFACT_SLOTS, l)),
                slot_label,
                name: first_text(main, selector!("div.up")),
                lore: stories.get(i).cloned().filter(|s| !s.is_empty()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use irminsul_common::{ArtifactSlot, Vocab};
    use pretty_assertions::assert_eq;

    const EMBLEM: &str = r#"<html><body><div class="mw-parser-output">
        <p>2件套与4件套效果说明，这一段不应当被当作套装的描述文字。</p>
        <p>以稻妻武人的信物为名的圣遗物套装，寄托了断绝命运的愿望。</p>
        <div class="attribute">
          <div class="star"><img alt="圣遗物套装-4星.png"><img alt="圣遗物套装-5星.png"></div>
          <div class="name">绝缘之旗印（Emblem of Severed Fate）</div>
          <div class="tag">TAG：元素爆发、充能</div>
          <table class="effect">
            <tr><td>2件套</td><td>元素充能效率提高20%。</td></tr>
            <tr><td>4件套</td><td>基于元素充能效率的25%，提高元素爆发造成的伤害。</td></tr>
          </table>
        </div>
        <div class="bili-list-style"><div class="icon"><div class="main">
          <div class="up">明威之镡</div><div class="down">生之花</div>
        </div></div></div>
        <div class="bili-list-style"><div class="broken"></div></div>
        <div class="bili-list-style"><div class="icon"><div class="main">
          <div class="up">切落之羽</div><div class="down">死之羽</div>
        </div></div></div>
        <div class="intext"><div class="story">刀镡的故事</div><div class="story">无主之羽</div><div class="story">羽毛的故事</div></div>
    </div></body></html>"#;

    fn extract(html: &str) -> ArtifactSetAttributes {
        let page = Html::parse_document(html);
        match ArtifactSetExtractor.extract_from(&page, "绝缘之旗印").attributes {
            Attributes::ArtifactSet(a) => a,
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_attribute_box() {
        let a = extract(EMBLEM);
        assert_eq!(a.max_rarity, Some(5));
        assert_eq!(a.name_en.as_deref(), Some("Emblem of Severed Fate"));
        assert_eq!(a.tags, vec!["元素爆发".to_string(), "充能".to_string()]);
        assert_eq!(a.two_piece_bonus.as_deref(), Some("元素充能效率提高20%。"));
        assert!(a.four_piece_bonus.unwrap().starts_with("基于元素充能效率"));
    }

    #[test]
    fn test_description_skips_set_bonus_text() {
        let a = extract(EMBLEM);
        assert!(a.description.unwrap().starts_with("以稻妻武人"));
    }

    #[test]
    fn test_broken_piece_does_not_drop_others() {
        let a = extract(EMBLEM);
        assert_eq!(a.pieces.len(), 2);
        assert_eq!(a.pieces[0].slot, Some(Vocab::Known(ArtifactSlot::Flower)));
        assert_eq!(a.pieces[0].name.as_deref(), Some("明威之镡"));
        assert_eq!(a.pieces[0].lore.as_deref(), Some("刀镡的故事"));
        assert_eq!(a.pieces[1].slot, Some(Vocab::Known(ArtifactSlot::Plume)));
        // Lore follows block position, so the skipped block's story is not reused.
        assert_eq!(a.pieces[1].lore.as_deref(), Some("羽毛的故事"));
    }

    #[test]
    fn test_no_attribute_box() {
        let a = extract(r#"<div class="mw-parser-output"></div>"#);
        assert_eq!(a, ArtifactSetAttributes::default());
    }
}
