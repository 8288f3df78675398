use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;
use std::str::FromStr;

/// 卡牌编码。
pub type CardCode = String;
/// 编码到数量的映射，按编码排序以保证遍历顺序稳定。
pub type QuantityMap = BTreeMap<CardCode, u32>;
/// 外部提供的卡池。
pub type CardLookup = HashMap<CardCode, Card>;

pub const PERSONALITY_SET: &str = "personality";
pub const MALADY_SET: &str = "malady";
pub const ROLE_TYPE: &str = "role";
pub const EXPERT_TRAIT: &str = "Expert";

const TRAIT_MARKER: char = '\u{00AC}';

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AspectId {
    Awa,
    Fit,
    Foc,
    Spi,
}

impl AspectId {
    pub const ALL: [AspectId; 4] = [AspectId::Awa, AspectId::Fit, AspectId::Foc, AspectId::Spi];

    pub fn index(self) -> usize {
        match self {
            AspectId::Awa => 0,
            AspectId::Fit => 1,
            AspectId::Foc => 2,
            AspectId::Spi => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AspectId::Awa => "AWA",
            AspectId::Fit => "FIT",
            AspectId::Foc => "FOC",
            AspectId::Spi => "SPI",
        }
    }
}

impl fmt::Display for AspectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AWA" => Ok(AspectId::Awa),
            "FIT" => Ok(AspectId::Fit),
            "FOC" => Ok(AspectId::Foc),
            "SPI" => Ok(AspectId::Spi),
            _ => Err(()),
        }
    }
}

/// 卡牌所属卡组类别。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SetType {
    Background,
    Specialty,
    Reward,
    Malady,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Card {
    pub code: CardCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equip: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harm: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approach_conflict: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approach_reason: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approach_exploration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approach_connection: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_id: Option<AspectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_type_id: Option<SetType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<String>,
    /// 组牌时允许的最大张数。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl Card {
    pub fn new(code: impl Into<CardCode>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn in_set(mut self, set_type: SetType, set_id: impl Into<String>) -> Self {
        self.set_type_id = Some(set_type);
        self.set_id = Some(set_id.into());
        self
    }

    pub fn with_aspect(mut self, aspect: AspectId, level: i32) -> Self {
        self.aspect_id = Some(aspect);
        self.level = Some(level);
        self
    }

    pub fn with_traits(mut self, traits: impl Into<String>) -> Self {
        self.traits = Some(traits.into());
        self
    }

    pub fn with_type(mut self, type_id: impl Into<String>) -> Self {
        self.type_id = Some(type_id.into());
        self
    }

    pub fn set_id(&self) -> Option<&str> {
        self.set_id.as_deref()
    }

    pub fn is_personality(&self) -> bool {
        self.set_id() == Some(PERSONALITY_SET)
    }

    pub fn is_malady(&self) -> bool {
        self.set_id() == Some(MALADY_SET)
    }

    /// 去除装饰符号后的特性列表。
    pub fn trait_list(&self) -> Vec<&str> {
        self.traits.as_deref().map(clean_traits).unwrap_or_default()
    }

    pub fn has_trait(&self, name: &str) -> bool {
        self.trait_list().iter().any(|value| *value == name)
    }

    pub fn is_expert(&self) -> bool {
        self.has_trait(EXPERT_TRAIT)
    }
}

/// 按 `/` 切分特性文本，去掉首尾空白和装饰用的 `¬` 符号。
pub fn clean_traits(traits: &str) -> Vec<&str> {
    traits
        .split('/')
        .map(|segment| segment.trim().trim_matches(TRAIT_MARKER).trim())
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// 牌组的初始属性等级。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AspectStats {
    #[serde(default)]
    pub awa: u32,
    #[serde(default)]
    pub fit: u32,
    #[serde(default)]
    pub foc: u32,
    #[serde(default)]
    pub spi: u32,
}

impl AspectStats {
    pub fn new(awa: u32, fit: u32, foc: u32, spi: u32) -> Self {
        Self { awa, fit, foc, spi }
    }

    pub fn get(&self, aspect: AspectId) -> u32 {
        match aspect {
            AspectId::Awa => self.awa,
            AspectId::Fit => self.fit,
            AspectId::Foc => self.foc,
            AspectId::Spi => self.spi,
        }
    }

    pub fn satisfies(&self, aspect: AspectId, level: i32) -> bool {
        i64::from(self.get(aspect)) >= i64::from(level)
    }

    /// 恰好一项为 1、一项为 3、其余两项为 2。
    pub fn is_standard_spread(&self) -> bool {
        let mut levels = [self.awa, self.fit, self.foc, self.spi];
        levels.sort_unstable();
        levels == [1, 2, 2, 3]
    }
}

/// 组牌元数据。空字符串与缺省同义。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeckMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<CardCode>,
}

impl DeckMeta {
    pub fn new(
        background: impl Into<String>,
        specialty: impl Into<String>,
        role: impl Into<CardCode>,
    ) -> Self {
        Self {
            background: Some(background.into()),
            specialty: Some(specialty.into()),
            role: Some(role.into()),
        }
    }

    pub fn background(&self) -> Option<&str> {
        non_empty(self.background.as_deref())
    }

    pub fn specialty(&self) -> Option<&str> {
        non_empty(self.specialty.as_deref())
    }

    pub fn role(&self) -> Option<&str> {
        non_empty(self.role.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// 卡组类别编号到显示名称的查询。
pub trait CategoryNames {
    fn category_name(&self, set_id: &str) -> Option<String>;
}

impl<S: BuildHasher> CategoryNames for HashMap<String, String, S> {
    fn category_name(&self, set_id: &str) -> Option<String> {
        self.get(set_id).cloned()
    }
}

impl CategoryNames for BTreeMap<String, String> {
    fn category_name(&self, set_id: &str) -> Option<String> {
        self.get(set_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_traits_strips_marker_and_whitespace() {
        let traits = clean_traits(" Gear / \u{00AC}Expert /Tool ");
        assert_eq!(traits, vec!["Gear", "Expert", "Tool"]);
    }

    #[test]
    fn expert_match_is_exact() {
        let card = Card::new("01").with_traits("Experts / Weapon");
        assert!(!card.is_expert(), "Experts is not the Expert trait");

        let card = Card::new("02").with_traits("Skill / \u{00AC}Expert");
        assert!(card.is_expert());
    }

    #[test]
    fn standard_spread_accepts_any_permutation() {
        assert!(AspectStats::new(3, 2, 2, 1).is_standard_spread());
        assert!(AspectStats::new(2, 1, 3, 2).is_standard_spread());
        assert!(!AspectStats::new(2, 2, 2, 2).is_standard_spread());
        assert!(!AspectStats::new(3, 3, 1, 1).is_standard_spread());
    }

    #[test]
    fn meta_treats_empty_strings_as_absent() {
        let meta = DeckMeta {
            background: Some(String::new()),
            specialty: Some("artificer".into()),
            role: None,
        };
        assert_eq!(meta.background(), None);
        assert_eq!(meta.specialty(), Some("artificer"));
        assert_eq!(meta.role(), None);
    }

    #[test]
    fn card_deserializes_unknown_set_type_as_other() {
        let card: Card = serde_json::from_str(
            r#"{"code":"99","set_type_id":"location","aspect_id":"FOC","level":2}"#,
        )
        .expect("card json should parse");
        assert_eq!(card.set_type_id, Some(SetType::Other));
        assert_eq!(card.aspect_id, Some(AspectId::Foc));
        assert_eq!(card.level, Some(2));
    }
}
