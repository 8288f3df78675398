use serde::{Deserialize, Serialize};

const DEFAULT_DECK_SIZE: u32 = 30;
const DEFAULT_PERSONALITY_PER_ASPECT: u32 = 2;
const DEFAULT_SET_SIZE: u32 = 10;
const DEFAULT_SET_MAX: u32 = 12;
const DEFAULT_SPLASH_SLOTS: u32 = 2;
const DEFAULT_MAX_COPIES: u32 = 2;
const DEFAULT_STARTING_COPIES: u32 = 2;

/// 组牌规则的数值上下限。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeckRules {
    /// 不计病症牌的牌组张数。
    pub deck_size: u32,
    pub personality_per_aspect: u32,
    /// 所选背景、专长各自需要的张数。
    pub set_size: u32,
    /// 借用外部兴趣名额后，所选背景、专长的上限。
    pub set_max: u32,
    /// 背景与专长共用的外部兴趣名额。
    pub splash_slots: u32,
    pub max_copies: u32,
    /// 初始牌组每张卡必须携带的张数。
    pub starting_copies: u32,
}

impl DeckRules {
    pub fn standard() -> Self {
        Self {
            deck_size: DEFAULT_DECK_SIZE,
            personality_per_aspect: DEFAULT_PERSONALITY_PER_ASPECT,
            set_size: DEFAULT_SET_SIZE,
            set_max: DEFAULT_SET_MAX,
            splash_slots: DEFAULT_SPLASH_SLOTS,
            max_copies: DEFAULT_MAX_COPIES,
            starting_copies: DEFAULT_STARTING_COPIES,
        }
    }

    pub fn with_deck_size(mut self, deck_size: u32) -> Self {
        self.deck_size = deck_size;
        self
    }

    pub fn with_set_limits(mut self, set_size: u32, set_max: u32) -> Self {
        self.set_size = set_size;
        self.set_max = set_max.max(set_size);
        self
    }

    pub fn with_splash_slots(mut self, splash_slots: u32) -> Self {
        self.splash_slots = splash_slots;
        self
    }
}

impl Default for DeckRules {
    fn default() -> Self {
        DeckRules::standard()
    }
}
