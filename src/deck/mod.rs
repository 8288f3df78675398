//! 组牌校验与版本对比（卡牌归类、牌组规则、差异计算）。

pub mod card;
pub mod classify;
pub mod config;
pub mod diff;
pub mod rules;

pub use card::{
    AspectId,
    AspectStats,
    Card,
    CardCode,
    CardLookup,
    CategoryNames,
    DeckMeta,
    QuantityMap,
    SetType,
};
pub use classify::{CardBucket, CardClassifier, Classification, DeckCardError};
pub use config::DeckRules;
pub use diff::{diff_deck, DeckChanges, DeltaMap, PreviousDeck};
pub use rules::{DeckError, DeckInput, DeckRuleEngine, Item, ParsedDeck};
