pub mod deck;
pub mod error;
pub mod search;
pub mod utils;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::from_value;
use std::collections::HashMap;
use wasm_bindgen::prelude::*;

pub use deck::{
    diff_deck, AspectId, AspectStats, Card, CardBucket, CardClassifier, CardCode, CardLookup,
    CategoryNames, Classification, DeckCardError, DeckChanges, DeckError, DeckInput, DeckMeta,
    DeckRuleEngine, DeckRules, DeltaMap, Item, ParsedDeck, PreviousDeck, QuantityMap, SetType,
};
pub use error::EngineError;
pub use search::{CardSearch, Comparison, NumericAttribute, NumericConstraint, COST_WILDCARD};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging(LevelFilter::Info);
}

#[wasm_bindgen(js_name = "setLogLevel")]
pub fn set_log_level(level: &str) {
    utils::init_logging(utils::parse_level(level));
}

/// 卡池既可以是卡牌数组，也可以是编码到卡牌的映射。
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CardPool {
    List(Vec<Card>),
    Map(CardLookup),
}

impl Default for CardPool {
    fn default() -> Self {
        CardPool::Map(CardLookup::new())
    }
}

impl CardPool {
    fn into_lookup(self) -> CardLookup {
        match self {
            CardPool::List(cards) => cards
                .into_iter()
                .map(|card| (card.code.clone(), card))
                .collect(),
            CardPool::Map(cards) => cards,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    #[serde(default)]
    stats: AspectStats,
    #[serde(default)]
    meta: DeckMeta,
    #[serde(default)]
    slots: QuantityMap,
    #[serde(default)]
    side_slots: QuantityMap,
    #[serde(default)]
    previous_deck: Option<PreviousDeck>,
    #[serde(default)]
    cards: CardPool,
    #[serde(default)]
    category_names: HashMap<String, String>,
    #[serde(default)]
    rules: DeckRules,
}

impl EvaluateRequest {
    fn evaluate(self) -> ParsedDeck {
        let deck = DeckInput {
            stats: self.stats,
            meta: self.meta,
            slots: self.slots,
            side_slots: self.side_slots,
            previous_deck: self.previous_deck,
        };
        let cards = self.cards.into_lookup();
        DeckRuleEngine::new(self.rules).evaluate(&deck, &cards, &self.category_names)
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, EngineError> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    Ok(value.serialize(&serializer)?)
}

fn optional<T: for<'de> Deserialize<'de>>(value: JsValue) -> Result<Option<T>, EngineError> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    Ok(Some(from_value(value)?))
}

/// 评估一次牌组，返回带分区、问题列表和差异的视图。
#[wasm_bindgen(js_name = "evaluateDeck")]
pub fn evaluate_deck(request: JsValue) -> Result<JsValue, JsValue> {
    let request: EvaluateRequest = from_value(request).map_err(EngineError::from)?;
    Ok(to_js(&request.evaluate())?)
}

#[wasm_bindgen(js_name = "diffDeck")]
pub fn diff_deck_js(
    slots: JsValue,
    side_slots: JsValue,
    previous: JsValue,
) -> Result<JsValue, JsValue> {
    let slots: QuantityMap = optional(slots)?.unwrap_or_default();
    let side_slots: QuantityMap = optional(side_slots)?.unwrap_or_default();
    let previous: Option<PreviousDeck> = optional(previous)?;
    Ok(to_js(&diff_deck(&slots, &side_slots, previous.as_ref()))?)
}

/// 返回规范化后的表达式；空或无法识别时返回 `undefined`。
#[wasm_bindgen(js_name = "parseNumericFilter")]
pub fn parse_numeric_filter(expression: &str) -> Option<String> {
    NumericConstraint::parse(expression).map(|constraint| constraint.to_string())
}

#[wasm_bindgen(js_name = "matchesNumericFilter")]
pub fn matches_numeric_filter(
    expression: &str,
    value: Option<i32>,
    attribute: &str,
) -> Result<bool, JsValue> {
    Ok(numeric_filter_matches(expression, value, attribute)?)
}

fn numeric_filter_matches(
    expression: &str,
    value: Option<i32>,
    attribute: &str,
) -> Result<bool, EngineError> {
    let attribute: NumericAttribute = attribute
        .parse()
        .map_err(|_| EngineError::UnknownAttribute(attribute.to_string()))?;
    let constraint = NumericConstraint::parse(expression);
    Ok(attribute.evaluate(constraint.as_ref(), value))
}

#[wasm_bindgen(js_name = "searchCards")]
pub fn search_cards(cards: JsValue, search: JsValue) -> Result<JsValue, JsValue> {
    let cards = optional::<CardPool>(cards)?.unwrap_or_default().into_lookup();
    let search: CardSearch = optional(search)?.unwrap_or_default();
    let codes: Vec<&str> = search
        .filter_cards(&cards)
        .into_iter()
        .map(|card| card.code.as_str())
        .collect();
    Ok(to_js(&codes)?)
}

/// 持有卡池的评估器，卡池只解码一次，供每次渲染重复调用。
#[wasm_bindgen]
pub struct DeckEngine {
    cards: CardLookup,
    category_names: HashMap<String, String>,
    engine: DeckRuleEngine,
}

#[wasm_bindgen]
impl DeckEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(cards_json: &str, category_names_json: Option<String>) -> Result<DeckEngine, JsValue> {
        Ok(Self::from_json(cards_json, category_names_json.as_deref())?)
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn set_rules_json(&mut self, rules_json: &str) -> Result<(), JsValue> {
        let rules: DeckRules = serde_json::from_str(rules_json).map_err(EngineError::from)?;
        self.engine = DeckRuleEngine::new(rules);
        Ok(())
    }

    pub fn evaluate_json(&self, deck_json: &str) -> Result<String, JsValue> {
        Ok(self.evaluate_str(deck_json)?)
    }

    pub fn diff_json(&self, deck_json: &str) -> Result<String, JsValue> {
        Ok(self.diff_str(deck_json)?)
    }

    pub fn search_json(&self, search_json: &str) -> Result<String, JsValue> {
        Ok(self.search_str(search_json)?)
    }
}

impl DeckEngine {
    pub fn from_json(
        cards_json: &str,
        category_names_json: Option<&str>,
    ) -> Result<Self, EngineError> {
        let pool: CardPool = serde_json::from_str(cards_json)?;
        let category_names = match category_names_json {
            Some(json) => serde_json::from_str(json)?,
            None => HashMap::new(),
        };
        let cards = pool.into_lookup();
        log::info!("deck engine loaded {} cards", cards.len());
        Ok(Self {
            cards,
            category_names,
            engine: DeckRuleEngine::default(),
        })
    }

    pub fn evaluate(&self, deck: &DeckInput) -> ParsedDeck {
        self.engine.evaluate(deck, &self.cards, &self.category_names)
    }

    fn evaluate_str(&self, deck_json: &str) -> Result<String, EngineError> {
        let deck: DeckInput = serde_json::from_str(deck_json)?;
        Ok(serde_json::to_string(&self.evaluate(&deck))?)
    }

    fn diff_str(&self, deck_json: &str) -> Result<String, EngineError> {
        let deck: DeckInput = serde_json::from_str(deck_json)?;
        let changes = diff_deck(&deck.slots, &deck.side_slots, deck.previous_deck.as_ref());
        Ok(serde_json::to_string(&changes)?)
    }

    fn search_str(&self, search_json: &str) -> Result<String, EngineError> {
        let search: CardSearch = serde_json::from_str(search_json)?;
        let codes: Vec<&str> = search
            .filter_cards(&self.cards)
            .into_iter()
            .map(|card| card.code.as_str())
            .collect();
        Ok(serde_json::to_string(&codes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARDS: &str = r#"[
        {"code":"p1","set_id":"personality","aspect_id":"AWA"},
        {"code":"p2","set_id":"personality","aspect_id":"FIT"},
        {"code":"p3","set_id":"personality","aspect_id":"FOC"},
        {"code":"p4","set_id":"personality","aspect_id":"SPI"},
        {"code":"b1","set_id":"artisan","set_type_id":"background","cost":1},
        {"code":"b2","set_id":"artisan","set_type_id":"background","cost":2},
        {"code":"b3","set_id":"artisan","set_type_id":"background","cost":-2},
        {"code":"b4","set_id":"artisan","set_type_id":"background"},
        {"code":"b5","set_id":"artisan","set_type_id":"background"},
        {"code":"s1","set_id":"shaper","set_type_id":"specialty"},
        {"code":"s2","set_id":"shaper","set_type_id":"specialty"},
        {"code":"s3","set_id":"shaper","set_type_id":"specialty"},
        {"code":"s4","set_id":"shaper","set_type_id":"specialty"},
        {"code":"s5","set_id":"shaper","set_type_id":"specialty"},
        {"code":"role","set_id":"shaper","set_type_id":"specialty","type_id":"role"},
        {"code":"o1","set_id":"forager","set_type_id":"background","traits":"Skill"}
    ]"#;

    const DECK: &str = r#"{
        "stats":{"awa":3,"fit":2,"foc":2,"spi":1},
        "meta":{"background":"artisan","specialty":"shaper","role":"role"},
        "slots":{"p1":2,"p2":2,"p3":2,"p4":2,"b1":2,"b2":2,"b3":2,"b4":2,"b5":2,
                 "s1":2,"s2":2,"s3":2,"s4":2,"s5":2,"o1":2}
    }"#;

    fn engine() -> DeckEngine {
        DeckEngine::from_json(CARDS, Some(r#"{"artisan":"Artisan"}"#))
            .expect("card pool should decode")
    }

    #[test]
    fn engine_loads_card_list() {
        assert_eq!(engine().card_count(), 16);
    }

    #[test]
    fn engine_evaluates_json_deck() {
        let json = engine().evaluate_str(DECK).expect("deck should evaluate");
        let value: serde_json::Value = serde_json::from_str(&json).expect("output is json");
        assert_eq!(value["problem"], serde_json::json!([]));
        assert_eq!(value["deck_size"], 30);
        assert_eq!(value["loading"], false);
        assert_eq!(value["cards"][5]["title"], "Artisan");
    }

    #[test]
    fn engine_reports_decode_errors() {
        let error = engine()
            .evaluate_str("{\"slots\":")
            .expect_err("truncated json should fail");
        assert!(matches!(error, EngineError::Json(_)));
    }

    #[test]
    fn engine_diff_is_null_for_starting_decks() {
        let json = engine().diff_str(DECK).expect("diff should run");
        assert_eq!(json, "null");
    }

    #[test]
    fn engine_diff_reports_changes() {
        let deck = r#"{
            "slots":{"b1":1,"b9":1},
            "previous_deck":{"slots":{"b1":2}}
        }"#;
        let json = engine().diff_str(deck).expect("diff should run");
        let changes: DeckChanges = serde_json::from_str(&json).expect("changes decode");
        assert_eq!(changes.added_cards.get("b9"), Some(&1));
        assert_eq!(changes.removed_cards.get("b1"), Some(&-1));
    }

    #[test]
    fn engine_searches_with_cost_wildcard() {
        let json = engine()
            .search_str(r#"{"cost":">1"}"#)
            .expect("search should run");
        assert_eq!(json, r#"["b2","b3"]"#);
    }

    #[test]
    fn request_accepts_card_map() {
        let request: EvaluateRequest = serde_json::from_str(
            r#"{
                "meta":{"specialty":"shaper","role":"role"},
                "slots":{"b1":3},
                "cards":{
                    "b1":{"code":"b1","set_id":"artisan","set_type_id":"background"},
                    "role":{"code":"role","set_id":"shaper","set_type_id":"specialty","type_id":"role"}
                },
                "previous_deck":{}
            }"#,
        )
        .expect("request should decode");
        let parsed = request.evaluate();
        assert_eq!(parsed.problem, vec![
            DeckError::TooFewCards,
            DeckError::Card(DeckCardError::TooManyDuplicates),
        ]);
        assert!(parsed.changes.is_some());
    }

    #[test]
    fn numeric_filter_helpers() {
        assert_eq!(parse_numeric_filter(" >= 3 "), Some(">=3".to_string()));
        assert_eq!(parse_numeric_filter("=4"), Some("4".to_string()));
        assert_eq!(parse_numeric_filter("   "), None);

        assert_eq!(numeric_filter_matches(">3", Some(-2), "cost").ok(), Some(true));
        assert_eq!(numeric_filter_matches(">3", Some(-2), "equip").ok(), Some(false));
        assert_eq!(numeric_filter_matches("", None, "level").ok(), Some(true));
        assert!(matches!(
            numeric_filter_matches("1", Some(1), "speed"),
            Err(EngineError::UnknownAttribute(_))
        ));
    }
}
