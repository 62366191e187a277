//! Document → typed record extraction.
//!
//! Extractors never fail on a missing field; the field is simply left
//! unobserved. The only hard failure is a document that is not a wiki
//! article at all (`ExtractError::Unrecognized`).

/// Builds a `&'static Selector` from a literal once.
macro_rules! selector {
    ($css:literal) => {{
        static SEL: ::std::sync::OnceLock<::scraper::Selector> = ::std::sync::OnceLock::new();
        SEL.get_or_init(|| ::scraper::Selector::parse($css).unwrap())
    }};
}
pub(crate) use selector;

pub mod artifact;
pub mod character;
pub mod defaults;
pub mod monster;
pub mod vocab;
pub mod weapon;

use std::sync::OnceLock;

use irminsul_common::EntityKind;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::models::RawDocument;
use crate::record::ExtractedRecord;

pub use artifact::ArtifactSetExtractor;
pub use character::CharacterExtractor;
pub use monster::MonsterExtractor;
pub use weapon::WeaponExtractor;

pub trait Extractor: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Extract from an already-parsed page. Missing fields stay `None`.
    fn extract_from(&self, page: &Html, natural_key: &str) -> ExtractedRecord;

    fn extract(&self, doc: &RawDocument, natural_key: &str) -> Result<ExtractedRecord, ExtractError> {
        let page = parse_document(doc)?;
        Ok(self.extract_from(&page, natural_key))
    }
}

static CHARACTER: CharacterExtractor = CharacterExtractor;
static WEAPON: WeaponExtractor = WeaponExtractor;
static ARTIFACT_SET: ArtifactSetExtractor = ArtifactSetExtractor;
static MONSTER: MonsterExtractor = MonsterExtractor;

pub fn extractor_for(kind: EntityKind) -> &'static dyn Extractor {
    match kind {
        EntityKind::Character   => &CHARACTER,
        EntityKind::Weapon      => &WEAPON,
        EntityKind::ArtifactSet => &ARTIFACT_SET,
        EntityKind::Monster     => &MONSTER,
    }
}

/// Runs the kind's extractor, then fills documented defaults.
pub fn extract(kind: EntityKind, doc: &RawDocument, natural_key: &str) -> Result<ExtractedRecord, ExtractError> {
    let mut record = extractor_for(kind).extract(doc, natural_key)?;
    defaults::apply(&mut record, defaults::DEFAULT_RULES)?;
    Ok(record)
}

/// Parses the body and checks for the wiki content root.
pub fn parse_document(doc: &RawDocument) -> Result<Html, ExtractError> {
    let page = Html::parse_document(&doc.body);
    if page.select(selector!("div.mw-parser-output")).next().is_none() {
        return Err(ExtractError::Unrecognized {
            locator: doc.locator.clone(),
            detail: "no div.mw-parser-output content root".to_string(),
        });
    }
    Ok(page)
}

// ── Shared field helpers ──────────────────────────────────────────────────────

/// Concatenated text of an element with each text node trimmed.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect::<String>()
}

pub(crate) fn first_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope.select(sel).next().map(text_of).filter(|t| !t.is_empty())
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap())
}

/// Drops thousands separators and percent signs and folds unicode minus
/// signs to `-`. Whitespace is kept as a token boundary.
fn strip_separators(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '%' | ',' | '，'))
        .map(|c| if matches!(c, '−' | '－') { '-' } else { c })
        .collect()
}

/// First signed numeric token after removing thousands separators and percent signs.
/// `None` when there is no digit at all.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = strip_separators(raw);
    number_regex().find(&cleaned)?.as_str().parse().ok()
}

/// First signed run of digits, as an integer.
pub fn parse_int(raw: &str) -> Option<i64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"-?\d+").unwrap());
    let cleaned = strip_separators(raw);
    re.find(&cleaned)?.as_str().parse().ok()
}

/// English name from "中文名（English Name）" or "中文名(English Name)".
pub(crate) fn english_name(full_name: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\(([A-Za-z\s']+)\)|（([A-Za-z\s']+)）").unwrap());
    let caps = re.captures(full_name)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Rarity from an `N星` marker in any of the given strings.
pub(crate) fn stars_marker(candidates: &[&str]) -> Option<u8> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(\d+)星").unwrap());
    candidates
        .iter()
        .find_map(|c| re.captures(c).and_then(|caps| caps[1].parse().ok()))
}

pub(crate) fn star_count(text: &str) -> Option<u8> {
    let filled = text.matches('★').count();
    let n = if filled > 0 { filled } else { text.matches('☆').count() };
    (n > 0).then(|| n.min(u8::MAX as usize) as u8)
}

/// First direct `<p>` of the content root with at least 20 chars that contains
/// none of `skip`. Truncated to 200 chars.
pub(crate) fn lead_paragraph(page: &Html, skip: &[&str]) -> Option<String> {
    let root = page.select(selector!("div.mw-parser-output")).next()?;
    root.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "p")
        .map(text_of)
        .find(|text| text.chars().count() >= 20 && !skip.iter().any(|s| text.contains(s)))
        .map(|text| truncate_chars(&text, 200))
}
