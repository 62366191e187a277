//! Default natural-key catalogs and locator templating.
//!
//! The built-in lists track the game version in [`CATALOG_VERSION`]. A kind's
//! list can be replaced wholesale through `[catalog]` in the config file or
//! the `IRMINSUL_*` env vars.

use std::collections::HashSet;

use irminsul_common::{EntityKind, IrminsulError};
use irminsul_config::CatalogConfig;
use url::Url;

use crate::models::ScrapeTarget;

pub const CATALOG_VERSION: &str = "6.1";

const CHARACTERS: &[&str] = &[
    // Mondstadt
    "琴", "迪卢克", "莫娜", "温迪", "可莉", "优菈", "阿贝多",
    "班尼特", "砂糖", "菲谢尔", "芭芭拉", "雷泽", "诺艾尔", "罗莎莉亚", "米卡",
    // Liyue
    "刻晴", "魈", "甘雨", "胡桃", "钟离", "七七",
    "香菱", "行秋", "北斗", "凝光", "辛焱", "重云", "烟绯", "云堇", "瑶瑶", "嘉明",
    // Inazuma
    "雷电将军", "神里绫华", "宵宫", "珊瑚宫心海", "荒瀧一斗", "八重神子", "神里绫人",
    "早柚", "九条裟罗", "托马", "五郎", "久岐忍", "鹿野院平藏", "绮良良",
    // Sumeru
    "纳西妲", "提纳里", "赛诺", "妮露", "流浪者", "艾尔海森", "迪希雅",
    "柯莱", "多莉", "坎蒂丝", "莱依拉", "珐露珊", "卡维", "白术",
    // Fontaine
    "那维莱特", "芙宁娜", "莱欧斯利", "娜维娅", "克洛琳德", "阿蕾奇诺", "希格雯",
    "琳妮特", "菲米尼", "夏沃蕾", "夏洛蒂", "嘉维尔", "艾梅莉埃",
    // Natlan
    "玛拉妮", "基尼奇", "希诺宁", "卡齐娜",
    // Starters
    "旅行者", "安柏", "凯亚", "丽莎",
];

const WEAPONS: &[&str] = &[
    // 5★
    "苍古自由之誓", "雾切之回光", "波乱月白经津", "圣显之钥", "裁叶萃光",
    "静水流涌之辉", "有乐御簾切", "赦罪", "苍耀", "风鹰剑", "天空之刃", "斫峰之刃", "磐岩结绿",
    "无工之剑", "松籁响起之时", "苇海信标", "裁断", "焚曜千阳", "狼的末路", "天空之傲", "赤角石溃杵",
    "护摩之杖", "薙草之稻光", "贯虹之槊", "息灾", "赤沙之杖", "支离轮光", "香韵奏者", "血染荒城",
    "和璞鸢", "天空之脊",
    "终末嗟叹之诗", "飞雷之弦振", "若水", "猎人之径", "最初的大魔术", "白雨心弦",
    "天空之翼", "阿莫斯之弓", "冬极白星",
    "神乐之真意", "千夜浮梦", "图莱杜拉的回忆", "万世流涌大典", "鹤鸣余音",
    "金流监督", "祭星者之望", "纺夜天镜", "溢彩心念", "寝正月初晴", "真语秘匣",
    "尘世之锁", "不灭月华", "天空之卷", "四风原典",
    // 4★
    "西风剑", "祭礼剑", "匣里龙吟", "黑剑", "笛剑", "铁蜂刺",
    "西风大剑", "祭礼大剑", "钟剑", "雨裁", "螭骨剑", "雪葬的星银",
    "西风长枪", "匣里灭辰", "喜多院十文字", "决斗之枪", "流月针", "「渔获」",
    "西风猎弓", "祭礼弓", "绝弦", "弓藏", "终末之弦", "曚云之月",
    "西风秘典", "祭礼残章", "匣里日月", "昭心", "流浪乐章", "万国诸海图谱",
    // 3★
    "黎明神剑", "冷刃", "沐浴龙血的剑", "以理服人", "黑缨枪", "弹弓", "鸦羽弓",
    "魔导绪论", "讨龙英杰谭", "翡翠法球",
];

const ARTIFACT_SETS: &[&str] = &[
    "穹境示现之夜", "纺月的夜歌", "深廊终曲", "长夜之誓",
    "烬城勇者绘卷", "黑曜秘典", "未竟的遐思", "谐律异想断章", "回声之林夜话", "昔时之歌",
    "逐影猎人", "黄金剧团", "水仙之梦", "花海甘露之光", "乐园遗落之花", "沙上楼阁史话",
    "深林的记忆", "饰金之梦", "来歆余响", "辰砂往生录",
    "绝缘之旗印", "华馆梦醒形骸记", "海染砗磲", "平息鸣雷的尊者", "追忆之注连",
    "逆飞的流星", "苍白之火", "染血的骑士道", "冰风迷途的勇士", "炽烈的炎之魔女",
    "翠绿之影", "渡过烈火的贤人", "被怜爱的少女", "沉沦之心", "千岩牢固", "悠古的磐岩",
    "角斗士的终幕礼", "流浪大地的乐团",
    "勇士之心", "守护之心", "教官", "赌徒", "流放者", "武人", "学者", "战狂", "游医", "祝圣秘礼",
    "冒险家", "幸运儿", "行者之心", "奇迹",
];

const MONSTERS: &[&str] = &[
    // Common
    "丘丘人", "丘丘人射手", "史莱姆", "大型火史莱姆", "骗骗花", "飘浮灵",
    "愚人众先遣队", "盗宝团", "野伏众", "蕈兽", "发条机关",
    // Elite
    "丘丘暴徒", "丘丘岩盔王", "丘丘霜铠王", "深渊法师·水", "遗迹守卫", "遗迹猎者",
    "愚人众火铳重卫", "古岩龙蜥", "兽境猎犬", "镀金旅团",
    // Boss
    "无相之雷", "无相之岩", "纯水精灵", "急冻树", "爆炎树", "魔偶剑鬼", "雷音权现",
    "恒常机关阵列", "半永恒统辖矩阵", "冰风组曲",
    // Weekly
    "北风狼王", "特瓦林", "公子", "若陀龙王", "女士", "祸津御建鸣神命", "正机之神",
    "阿佩普的绿洲守望者", "吞星之鲸", "仆人",
];

fn defaults(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Character   => CHARACTERS,
        EntityKind::Weapon      => WEAPONS,
        EntityKind::ArtifactSet => ARTIFACT_SETS,
        EntityKind::Monster     => MONSTERS,
    }
}

/// Per-kind target lists plus the URL template that turns a key into a locator.
#[derive(Debug, Clone)]
pub struct Catalog {
    base: Url,
    overrides: CatalogConfig,
}

impl Catalog {
    pub fn new(base_url: &str, overrides: CatalogConfig) -> Result<Self, IrminsulError> {
        let base = Url::parse(base_url)
            .map_err(|e| IrminsulError::Config(format!("invalid source.base_url {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(IrminsulError::Config(format!(
                "source.base_url {base_url:?} cannot carry a path"
            )));
        }
        Ok(Self { base, overrides })
    }

    /// `base_url/<percent-encoded key>`.
    pub fn locator_for(&self, natural_key: &str) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(natural_key);
        }
        url.into()
    }

    /// Effective key list for a kind: the configured override if present, else
    /// the built-in list.
    pub fn keys(&self, kind: EntityKind) -> Vec<String> {
        let keys: Vec<String> = match self.overrides.override_for(kind) {
            Some(list) => list.to_vec(),
            None => defaults(kind).iter().map(|k| k.to_string()).collect(),
        };
        normalize_keys(keys)
    }

    /// Builds targets for a run. `None` means the whole catalog for `kind`.
    pub fn targets(&self, kind: EntityKind, keys: Option<Vec<String>>) -> Vec<ScrapeTarget> {
        let keys = match keys {
            Some(keys) => normalize_keys(keys),
            None => self.keys(kind),
        };
        keys.into_iter()
            .map(|natural_key| ScrapeTarget {
                kind,
                locator: self.locator_for(&natural_key),
                natural_key,
            })
            .collect()
    }
}

/// Trims, drops blanks, and keeps the first occurrence of each key.
fn normalize_keys(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && seen.insert(k.clone()))
        .collect()
}
