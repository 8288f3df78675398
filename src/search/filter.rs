use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::constraint::{self, NumericConstraint};
use crate::deck::{AspectId, Card, CardLookup, SetType};

/// 可按数值筛选的卡牌属性。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NumericAttribute {
    Cost,
    Equip,
    Level,
    Presence,
    Harm,
}

impl NumericAttribute {
    pub fn value(self, card: &Card) -> Option<i32> {
        match self {
            NumericAttribute::Cost => card.cost,
            NumericAttribute::Equip => card.equip,
            NumericAttribute::Level => card.level,
            NumericAttribute::Presence => card.presence,
            NumericAttribute::Harm => card.harm,
        }
    }

    /// 只有费用享有 X 费通配。
    pub fn evaluate(self, constraint: Option<&NumericConstraint>, value: Option<i32>) -> bool {
        match self {
            NumericAttribute::Cost => constraint::evaluate_cost(constraint, value),
            _ => constraint::evaluate(constraint, value),
        }
    }
}

impl FromStr for NumericAttribute {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cost" => Ok(NumericAttribute::Cost),
            "equip" => Ok(NumericAttribute::Equip),
            "level" | "aspect_level" => Ok(NumericAttribute::Level),
            "presence" => Ok(NumericAttribute::Presence),
            "harm" => Ok(NumericAttribute::Harm),
            _ => Err(()),
        }
    }
}

/// 卡牌搜索条件，所有条件同时满足才算命中。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CardSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aspects: Vec<AspectId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set_types: Vec<SetType>,
    #[serde(default, with = "constraint::lenient", skip_serializing_if = "Option::is_none")]
    pub cost: Option<NumericConstraint>,
    #[serde(default, with = "constraint::lenient", skip_serializing_if = "Option::is_none")]
    pub equip: Option<NumericConstraint>,
    #[serde(default, with = "constraint::lenient", skip_serializing_if = "Option::is_none")]
    pub level: Option<NumericConstraint>,
    #[serde(default, with = "constraint::lenient", skip_serializing_if = "Option::is_none")]
    pub presence: Option<NumericConstraint>,
    #[serde(default, with = "constraint::lenient", skip_serializing_if = "Option::is_none")]
    pub harm: Option<NumericConstraint>,
}

impl CardSearch {
    pub fn with_constraint(mut self, attribute: NumericAttribute, expression: &str) -> Self {
        let parsed = NumericConstraint::parse(expression);
        match attribute {
            NumericAttribute::Cost => self.cost = parsed,
            NumericAttribute::Equip => self.equip = parsed,
            NumericAttribute::Level => self.level = parsed,
            NumericAttribute::Presence => self.presence = parsed,
            NumericAttribute::Harm => self.harm = parsed,
        }
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn constraint(&self, attribute: NumericAttribute) -> Option<&NumericConstraint> {
        match attribute {
            NumericAttribute::Cost => self.cost.as_ref(),
            NumericAttribute::Equip => self.equip.as_ref(),
            NumericAttribute::Level => self.level.as_ref(),
            NumericAttribute::Presence => self.presence.as_ref(),
            NumericAttribute::Harm => self.harm.as_ref(),
        }
    }

    fn matches_text(&self, card: &Card) -> bool {
        let Some(text) = self.text.as_deref().map(str::trim).filter(|text| !text.is_empty())
        else {
            return true;
        };
        let needle = text.to_lowercase();
        let in_name = card
            .name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(&needle));
        let in_traits = card
            .trait_list()
            .iter()
            .any(|value| value.to_lowercase().contains(&needle));
        in_name || in_traits || card.code.to_lowercase().contains(&needle)
    }

    pub fn matches(&self, card: &Card) -> bool {
        if !self.aspects.is_empty()
            && !card
                .aspect_id
                .is_some_and(|aspect| self.aspects.contains(&aspect))
        {
            return false;
        }
        if !self.set_types.is_empty()
            && !card
                .set_type_id
                .is_some_and(|set_type| self.set_types.contains(&set_type))
        {
            return false;
        }
        let numeric = [
            NumericAttribute::Cost,
            NumericAttribute::Equip,
            NumericAttribute::Level,
            NumericAttribute::Presence,
            NumericAttribute::Harm,
        ];
        if !numeric
            .into_iter()
            .all(|attribute| attribute.evaluate(self.constraint(attribute), attribute.value(card)))
        {
            return false;
        }
        self.matches_text(card)
    }

    /// 返回命中的卡牌，按编码排序。
    pub fn filter_cards<'a>(&self, cards: &'a CardLookup) -> Vec<&'a Card> {
        let mut matched: Vec<&Card> = cards.values().filter(|card| self.matches(card)).collect();
        matched.sort_by(|a, b| a.code.cmp(&b.code));
        log::debug!("card search matched {} of {} cards", matched.len(), cards.len());
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::constraint::COST_WILDCARD;

    fn pool() -> CardLookup {
        let mut boots = Card::new("01001").in_set(SetType::Background, "artisan");
        boots.name = Some("Walking Boots".into());
        boots.cost = Some(1);
        boots.equip = Some(2);
        boots.aspect_id = Some(AspectId::Fit);
        boots.traits = Some("Gear / \u{00AC}Expert".into());

        let mut surge = Card::new("01002").in_set(SetType::Specialty, "shaper");
        surge.name = Some("Surge".into());
        surge.cost = Some(COST_WILDCARD);
        surge.aspect_id = Some(AspectId::Spi);
        surge.traits = Some("Moment".into());

        let mut pet = Card::new("01003").in_set(SetType::Reward, "reward");
        pet.name = Some("Loyal Pet".into());
        pet.cost = Some(3);

        [boots, surge, pet]
            .into_iter()
            .map(|card| (card.code.clone(), card))
            .collect()
    }

    fn codes(cards: Vec<&Card>) -> Vec<&str> {
        cards.into_iter().map(|card| card.code.as_str()).collect()
    }

    #[test]
    fn empty_search_matches_everything_in_code_order() {
        let cards = pool();
        let matched = CardSearch::default().filter_cards(&cards);
        assert_eq!(codes(matched), vec!["01001", "01002", "01003"]);
    }

    #[test]
    fn cost_filter_lets_x_cost_through() {
        let cards = pool();
        let search = CardSearch::default().with_constraint(NumericAttribute::Cost, ">=3");
        assert_eq!(codes(search.filter_cards(&cards)), vec!["01002", "01003"]);
    }

    #[test]
    fn equip_filter_fails_closed_on_missing_values() {
        let cards = pool();
        let search = CardSearch::default().with_constraint(NumericAttribute::Equip, "<5");
        assert_eq!(codes(search.filter_cards(&cards)), vec!["01001"]);
    }

    #[test]
    fn text_matches_name_and_cleaned_traits() {
        let cards = pool();
        let by_name = CardSearch::default().with_text("boots");
        assert_eq!(codes(by_name.filter_cards(&cards)), vec!["01001"]);

        let by_trait = CardSearch::default().with_text("expert");
        assert_eq!(codes(by_trait.filter_cards(&cards)), vec!["01001"]);
    }

    #[test]
    fn aspect_and_set_type_filters() {
        let cards = pool();
        let search = CardSearch {
            aspects: vec![AspectId::Spi, AspectId::Fit],
            set_types: vec![SetType::Specialty],
            ..CardSearch::default()
        };
        assert_eq!(codes(search.filter_cards(&cards)), vec!["01002"]);
    }

    #[test]
    fn decodes_from_json_with_bad_filters_ignored() {
        let search: CardSearch = serde_json::from_str(r#"{"cost":"<=1","equip":"??","aspects":["FIT"]}"#)
            .expect("search json should parse");
        assert_eq!(search.cost, NumericConstraint::parse("<=1"));
        assert_eq!(search.equip, None);

        let cards = pool();
        assert_eq!(codes(search.filter_cards(&cards)), vec!["01001"]);
    }

    #[test]
    fn attribute_names_parse() {
        assert_eq!("COST".parse::<NumericAttribute>(), Ok(NumericAttribute::Cost));
        assert_eq!("aspect_level".parse::<NumericAttribute>(), Ok(NumericAttribute::Level));
        assert!("speed".parse::<NumericAttribute>().is_err());
    }
}
