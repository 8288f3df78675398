use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::card::{CardCode, DeckMeta, QuantityMap};

/// 编码到带符号变化量的映射。
pub type DeltaMap = BTreeMap<CardCode, i64>;

/// 上一版本牌组的快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PreviousDeck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DeckMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<QuantityMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_slots: Option<QuantityMap>,
}

impl PreviousDeck {
    pub fn new(slots: QuantityMap, side_slots: QuantityMap) -> Self {
        Self {
            meta: None,
            slots: Some(slots),
            side_slots: Some(side_slots),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeckChanges {
    pub added_cards: DeltaMap,
    pub removed_cards: DeltaMap,
    /// 从收藏区移入牌组。
    pub added_collection_cards: DeltaMap,
    /// 从牌组退回收藏区。
    pub returned_collection_cards: DeltaMap,
}

impl DeckChanges {
    pub fn is_empty(&self) -> bool {
        self.added_cards.is_empty()
            && self.removed_cards.is_empty()
            && self.added_collection_cards.is_empty()
            && self.returned_collection_cards.is_empty()
    }
}

fn count(map: Option<&QuantityMap>, code: &str) -> i64 {
    map.and_then(|map| map.get(code))
        .map(|value| i64::from(*value))
        .unwrap_or(0)
}

/// 对比当前牌组与上一版本快照。没有快照时返回 `None`。
///
/// 主牌组增加而收藏区等量减少的部分记为“从收藏区加入”，反向记为“退回收藏区”；
/// 其余主牌组变化记为普通的加入或移除。只在收藏区内部发生的变化不计入牌组变更。
pub fn diff_deck(
    slots: &QuantityMap,
    side_slots: &QuantityMap,
    previous: Option<&PreviousDeck>,
) -> Option<DeckChanges> {
    let previous = previous?;
    let previous_slots = previous.slots.as_ref();
    let previous_side = previous.side_slots.as_ref();

    let codes: BTreeSet<&CardCode> = slots
        .keys()
        .chain(side_slots.keys())
        .chain(previous_slots.into_iter().flat_map(|map| map.keys()))
        .chain(previous_side.into_iter().flat_map(|map| map.keys()))
        .collect();

    let mut changes = DeckChanges::default();
    for code in codes {
        let main_now = count(Some(slots), code);
        let side_now = count(Some(side_slots), code);
        let main_before = count(previous_slots, code);
        let side_before = count(previous_side, code);

        if main_now == main_before && side_now == side_before {
            continue;
        }

        let main_delta = main_now - main_before;
        let side_delta = side_now - side_before;

        let moved = if main_delta > 0 && side_delta < 0 {
            let moved = main_delta.min(-side_delta);
            changes.added_collection_cards.insert(code.clone(), moved);
            moved
        } else if main_delta < 0 && side_delta > 0 {
            let moved = main_delta.max(-side_delta);
            changes.returned_collection_cards.insert(code.clone(), moved);
            moved
        } else {
            0
        };

        let remainder = main_delta - moved;
        if remainder > 0 {
            changes.added_cards.insert(code.clone(), remainder);
        } else if remainder < 0 {
            changes.removed_cards.insert(code.clone(), remainder);
        }
    }

    log::debug!(
        "deck diff: +{} -{} collection +{} -{}",
        changes.added_cards.len(),
        changes.removed_cards.len(),
        changes.added_collection_cards.len(),
        changes.returned_collection_cards.len()
    );
    Some(changes)
}
