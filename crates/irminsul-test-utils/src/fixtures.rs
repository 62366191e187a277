//! Builders that render wiki pages in the shapes the extractors read.
//!
//! Only fields that are set end up in the markup, so a fixture can model a
//! partially broken page as easily as a complete one.

fn page(content: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>原神WIKI</title></head><body>\
         <div id=\"mw-content-text\"><div class=\"mw-parser-output\">{content}</div></div>\
         </body></html>"
    )
}

fn stars(n: u8) -> String {
    "★".repeat(n as usize)
}

/// A page with no wiki content root: error pages, captchas, redirects.
pub fn unrecognizable_page() -> String {
    "<html><head><title>502 Bad Gateway</title></head><body><h1>502 Bad Gateway</h1></body></html>"
        .to_string()
}

/// A recognisable page carrying no extractable fields.
pub fn blank_page() -> String {
    page("<p>短</p>")
}

// ── Character ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CharacterPage {
    pub full_name: Option<String>,
    pub region: Option<String>,
    pub element: Option<String>,
    pub weapon_type: Option<String>,
    pub rarity: Option<u8>,
    /// (hp, atk, def) at level 90.
    pub level_90: Option<(f64, f64, f64)>,
    pub description: Option<String>,
}

impl CharacterPage {
    pub fn new(full_name: &str) -> Self {
        Self { full_name: Some(full_name.to_string()), ..Default::default() }
    }

    pub fn region(mut self, label: &str) -> Self {
        self.region = Some(label.to_string());
        self
    }

    pub fn element(mut self, label: &str) -> Self {
        self.element = Some(label.to_string());
        self
    }

    pub fn weapon_type(mut self, label: &str) -> Self {
        self.weapon_type = Some(label.to_string());
        self
    }

    pub fn rarity(mut self, stars: u8) -> Self {
        self.rarity = Some(stars);
        self
    }

    pub fn level_90(mut self, hp: f64, atk: f64, def: f64) -> Self {
        self.level_90 = Some((hp, atk, def));
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn render(&self) -> String {
        let mut html = String::new();
        if let Some(ref d) = self.description {
            html.push_str(&format!("<p>{d}</p>"));
        }

        html.push_str("<table class=\"wikitable\">");
        let rows = [
            ("全名/本名", self.full_name.clone()),
            ("所属地区", self.region.clone()),
            ("神之眼", self.element.clone()),
            ("武器类型", self.weapon_type.clone()),
        ];
        for (label, value) in rows {
            if let Some(v) = value {
                html.push_str(&format!("<tr><th>{label}</th><td>{v}</td></tr>"));
            }
        }
        if let Some(r) = self.rarity {
            html.push_str(&format!(
                "<tr><th>稀有度</th><td><img alt=\"{r}星.png\" src=\"/images/{r}星.png\"></td></tr>"
            ));
        }
        html.push_str("</table>");

        if let Some((hp, atk, def)) = self.level_90 {
            html.push_str(&format!(
                "<table class=\"wikitable\">\
                 <tr><th>等级</th><th>基础生命值</th><th>基础攻击力</th><th>基础防御力</th></tr>\
                 <tr><td>突破前</td><td>突破后</td></tr>\
                 <tr><td>90</td><td>{hp}</td><td>-</td><td>{atk}</td><td>-</td><td>{def}</td><td>-</td></tr>\
                 </table>"
            ));
        }
        page(&html)
    }
}

// ── Weapon ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct WeaponPage {
    pub name: String,
    pub rarity: Option<u8>,
    pub weapon_type: Option<String>,
    pub base_attack: Option<i64>,
    /// Source label and level-90 value, e.g. ("暴击率", "22.1%").
    pub secondary: Option<(String, String)>,
    pub passive: Option<(String, String)>,
    pub description: Option<String>,
}

impl WeaponPage {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    pub fn rarity(mut self, stars: u8) -> Self {
        self.rarity = Some(stars);
        self
    }

    pub fn weapon_type(mut self, label: &str) -> Self {
        self.weapon_type = Some(label.to_string());
        self
    }

    pub fn base_attack(mut self, atk: i64) -> Self {
        self.base_attack = Some(atk);
        self
    }

    pub fn secondary(mut self, label: &str, value: &str) -> Self {
        self.secondary = Some((label.to_string(), value.to_string()));
        self
    }

    pub fn passive(mut self, name: &str, description: &str) -> Self {
        self.passive = Some((name.to_string(), description.to_string()));
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn render(&self) -> String {
        let mut html = String::from("<div class=\"YSCard\">");
        let title_stars = self.rarity.map(stars).unwrap_or_default();
        html.push_str(&format!("<div class=\"card-title1\">{} {title_stars}</div>", self.name));
        if let Some((ref label, ref value)) = self.secondary {
            html.push_str(&format!(
                "<div class=\"card-title2\"><p>攻击力 /// {label} {value}</p></div>"
            ));
        }
        if let Some(ref t) = self.weapon_type {
            html.push_str(&format!("<div>{t}</div>"));
        }
        html.push_str("</div>");

        if let Some(atk) = self.base_attack {
            let (header, value) = match self.secondary {
                Some((ref label, ref value)) => (label.as_str(), value.as_str()),
                None => ("副属性", "-"),
            };
            html.push_str(&format!(
                "<div class=\"YS-WeaponData\"><table class=\"YS-DataTable\">\
                 <tr><th>等级</th><th>基础攻击力</th><th>突破后</th><th>{header}</th></tr>\
                 <tr><td>90级</td><td>{atk}</td><td>-</td><td>{value}</td></tr>\
                 </table></div>"
            ));
        }

        if let Some((ref name, ref desc)) = self.passive {
            html.push_str(&format!(
                "<div class=\"YS-WeaponSkill\"><div class=\"skill-name\">{name}</div>\
                 <div class=\"skill-desc\">{desc}</div></div>"
            ));
        }

        if let Some(ref d) = self.description {
            html.push_str(&format!("<p>{d}</p>"));
        }
        page(&html)
    }
}

// ── Artifact set ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ArtifactPage {
    pub name: String,
    pub max_rarity: Option<u8>,
    pub tags: Vec<String>,
    pub two_piece: Option<String>,
    pub four_piece: Option<String>,
    pub description: Option<String>,
}

impl ArtifactPage {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    pub fn max_rarity(mut self, stars: u8) -> Self {
        self.max_rarity = Some(stars);
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn two_piece(mut self, text: &str) -> Self {
        self.two_piece = Some(text.to_string());
        self
    }

    pub fn four_piece(mut self, text: &str) -> Self {
        self.four_piece = Some(text.to_string());
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn render(&self) -> String {
        let mut html = String::new();
        if let Some(ref d) = self.description {
            html.push_str(&format!("<p>{d}</p>"));
        }
        html.push_str("<div class=\"attribute\">");
        if let Some(r) = self.max_rarity {
            html.push_str(&format!("<div class=\"star\"><img alt=\"圣遗物套装-{r}星.png\"></div>"));
        }
        html.push_str(&format!("<div class=\"name\">{}</div>", self.name));
        if !self.tags.is_empty() {
            html.push_str(&format!("<div class=\"tag\">TAG：{}</div>", self.tags.join("、")));
        }
        html.push_str("<table class=\"effect\">");
        if let Some(ref t) = self.two_piece {
            html.push_str(&format!("<tr><td>2件套</td><td>{t}</td></tr>"));
        }
        if let Some(ref t) = self.four_piece {
            html.push_str(&format!("<tr><td>4件套</td><td>{t}</td></tr>"));
        }
        html.push_str("</table></div>");
        page(&html)
    }
}

// ── Monster ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MonsterPage {
    pub name_en: Option<String>,
    pub category: Option<String>,
    pub element: Option<String>,
    pub level: Option<u32>,
    /// (item, quantity, probability)
    pub drops: Vec<(String, String, String)>,
    /// (element label, percentage text)
    pub resistances: Vec<(String, String)>,
    pub description: Option<String>,
}

impl MonsterPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_en(mut self, name: &str) -> Self {
        self.name_en = Some(name.to_string());
        self
    }

    pub fn category(mut self, label: &str) -> Self {
        self.category = Some(label.to_string());
        self
    }

    pub fn element(mut self, label: &str) -> Self {
        self.element = Some(label.to_string());
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn drop_item(mut self, item: &str, quantity: &str, probability: &str) -> Self {
        self.drops.push((item.to_string(), quantity.to_string(), probability.to_string()));
        self
    }

    pub fn resistance(mut self, label: &str, value: &str) -> Self {
        self.resistances.push((label.to_string(), value.to_string()));
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn render(&self) -> String {
        let mut html = String::new();
        if let Some(ref d) = self.description {
            html.push_str(&format!("<p>{d}</p>"));
        }
        html.push_str("<table class=\"wikitable\">");
        let rows = [
            ("英文名", self.name_en.clone()),
            ("类型", self.category.clone()),
            ("元素", self.element.clone()),
            ("等级", self.level.map(|l| format!("Lv.{l}"))),
        ];
        for (label, value) in rows {
            if let Some(v) = value {
                html.push_str(&format!("<tr><th>{label}</th><td>{v}</td></tr>"));
            }
        }
        html.push_str("</table>");

        if !self.drops.is_empty() {
            html.push_str("<table class=\"drops\"><tr><th>物品</th><th>数量</th><th>概率</th></tr>");
            for (item, qty, prob) in &self.drops {
                html.push_str(&format!("<tr><td>{item}</td><td>{qty}</td><td>{prob}</td></tr>"));
            }
            html.push_str("</table>");
        }

        if !self.resistances.is_empty() {
            html.push_str("<table class=\"resistance\"><tr>");
            for (label, _) in &self.resistances {
                html.push_str(&format!("<th>{label}</th>"));
            }
            html.push_str("</tr><tr>");
            for (_, value) in &self.resistances {
                html.push_str(&format!("<td>{value}</td>"));
            }
            html.push_str("</tr></table>");
        }
        page(&html)
    }
}
