use serde::{Deserialize, Serialize};

use super::card::{AspectStats, Card, DeckMeta, SetType, ROLE_TYPE};
use super::config::DeckRules;

/// 组牌分区。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CardBucket {
    Personality,
    Background,
    Specialty,
    OutsideInterest,
    Other,
}

impl CardBucket {
    /// 牌组视图中分区的展示顺序。
    pub const ORDER: [CardBucket; 5] = [
        CardBucket::Personality,
        CardBucket::Background,
        CardBucket::Specialty,
        CardBucket::OutsideInterest,
        CardBucket::Other,
    ];

    pub fn index(self) -> usize {
        match self {
            CardBucket::Personality => 0,
            CardBucket::Background => 1,
            CardBucket::Specialty => 2,
            CardBucket::OutsideInterest => 3,
            CardBucket::Other => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CardBucket::Personality => "personality",
            CardBucket::Background => "background",
            CardBucket::Specialty => "specialty",
            CardBucket::OutsideInterest => "outside_interest",
            CardBucket::Other => "other",
        }
    }
}

/// 单卡层面的组牌问题。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeckCardError {
    TooManyDuplicates,
    NeedTwoCards,
    InvalidRole,
    InvalidAspectLevels,
    InvalidOutsideInterest,
}

impl DeckCardError {
    pub fn as_str(self) -> &'static str {
        match self {
            DeckCardError::TooManyDuplicates => "too_many_duplicates",
            DeckCardError::NeedTwoCards => "need_two_cards",
            DeckCardError::InvalidRole => "invalid_role",
            DeckCardError::InvalidAspectLevels => "invalid_aspect_levels",
            DeckCardError::InvalidOutsideInterest => "invalid_outside_interest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub bucket: CardBucket,
    pub problems: Vec<DeckCardError>,
}

/// 根据所选背景、专长和属性等级对单张卡进行归类和检查。
#[derive(Debug, Clone, Copy)]
pub struct CardClassifier<'a> {
    background: Option<&'a str>,
    specialty: Option<&'a str>,
    stats: &'a AspectStats,
    rules: &'a DeckRules,
    starting: bool,
}

impl<'a> CardClassifier<'a> {
    pub fn new(meta: &'a DeckMeta, stats: &'a AspectStats, rules: &'a DeckRules) -> Self {
        Self {
            background: meta.background(),
            specialty: meta.specialty(),
            stats,
            rules,
            starting: true,
        }
    }

    /// 升级后的牌组不再要求成对携带。
    pub fn starting_deck(mut self, starting: bool) -> Self {
        self.starting = starting;
        self
    }

    pub fn bucket(&self, card: &Card) -> CardBucket {
        if card.is_personality() {
            return CardBucket::Personality;
        }
        match card.set_type_id {
            Some(SetType::Background) => {
                if self.background.is_some() && card.set_id() == self.background {
                    CardBucket::Background
                } else {
                    CardBucket::OutsideInterest
                }
            }
            Some(SetType::Specialty) => {
                if self.specialty.is_some() && card.set_id() == self.specialty {
                    CardBucket::Specialty
                } else {
                    CardBucket::OutsideInterest
                }
            }
            _ => CardBucket::Other,
        }
    }

    pub fn classify(&self, card: &Card, count: u32) -> Classification {
        let bucket = self.bucket(card);
        let mut problems = Vec::new();

        if count > self.rules.max_copies && !card.is_malady() {
            problems.push(DeckCardError::TooManyDuplicates);
        }
        if self.starting && count > 0 && count != self.rules.starting_copies {
            problems.push(DeckCardError::NeedTwoCards);
        }
        if let (Some(aspect), Some(level)) = (card.aspect_id, card.level) {
            if !self.stats.satisfies(aspect, level) {
                problems.push(DeckCardError::InvalidAspectLevels);
            }
        }
        if bucket == CardBucket::OutsideInterest && card.is_expert() {
            problems.push(DeckCardError::InvalidOutsideInterest);
        }

        log::trace!("classified {} as {:?} with {:?}", card.code, bucket, problems);
        Classification { bucket, problems }
    }

    /// 角色卡必须是所选专长下的 role 卡。
    pub fn check_role(&self, card: &Card) -> Option<DeckCardError> {
        let is_specialty = card.set_type_id == Some(SetType::Specialty);
        let is_role = card.type_id.as_deref() == Some(ROLE_TYPE);
        let matches_specialty = self.specialty.is_some() && card.set_id() == self.specialty;
        if is_specialty && is_role && matches_specialty {
            None
        } else {
            Some(DeckCardError::InvalidRole)
        }
    }
}
