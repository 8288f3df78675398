use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 费用为 X 的卡牌以 -2 表示，可通过任意费用筛选。
pub const COST_WILDCARD: i32 = -2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Comparison {
    pub fn prefix(self) -> &'static str {
        match self {
            Comparison::Eq => "",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
            Comparison::Gte => ">=",
            Comparison::Lte => "<=",
        }
    }

    fn compare(self, left: i32, right: i32) -> bool {
        match self {
            Comparison::Eq => left == right,
            Comparison::Gt => left > right,
            Comparison::Lt => left < right,
            Comparison::Gte => left >= right,
            Comparison::Lte => left <= right,
        }
    }
}

/// 数值筛选条件，例如 `>=3`、`<2`、`5`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumericConstraint {
    pub comparison: Comparison,
    pub value: i32,
}

impl NumericConstraint {
    pub fn new(comparison: Comparison, value: i32) -> Self {
        Self { comparison, value }
    }

    /// 空字符串或无法识别的表达式返回 `None`，表示不设限。
    pub fn parse(expression: &str) -> Option<Self> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return None;
        }

        let (comparison, rest) = if let Some(rest) = trimmed.strip_prefix(">=") {
            (Comparison::Gte, rest)
        } else if let Some(rest) = trimmed.strip_prefix("<=") {
            (Comparison::Lte, rest)
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            (Comparison::Gt, rest)
        } else if let Some(rest) = trimmed.strip_prefix('<') {
            (Comparison::Lt, rest)
        } else if let Some(rest) = trimmed.strip_prefix('=') {
            (Comparison::Eq, rest)
        } else {
            (Comparison::Eq, trimmed)
        };

        let value = rest.trim().parse::<i32>().ok()?;
        Some(Self { comparison, value })
    }

    /// 属性缺失时不通过。
    pub fn matches(&self, value: Option<i32>) -> bool {
        value.is_some_and(|value| self.comparison.compare(value, self.value))
    }

    pub fn matches_cost(&self, cost: Option<i32>) -> bool {
        cost == Some(COST_WILDCARD) || self.matches(cost)
    }
}

impl fmt::Display for NumericConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.comparison.prefix(), self.value)
    }
}

impl FromStr for NumericConstraint {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NumericConstraint::parse(s).ok_or(())
    }
}

impl Serialize for NumericConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NumericConstraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NumericConstraint::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid numeric filter `{raw}`")))
    }
}

/// 没有条件时放行。
pub fn evaluate(constraint: Option<&NumericConstraint>, value: Option<i32>) -> bool {
    constraint.map_or(true, |constraint| constraint.matches(value))
}

pub fn evaluate_cost(constraint: Option<&NumericConstraint>, cost: Option<i32>) -> bool {
    constraint.map_or(true, |constraint| constraint.matches_cost(cost))
}

/// 供 `#[serde(with)]` 使用：无法解析的表达式按“不设限”处理而不是报错。
pub mod lenient {
    use super::NumericConstraint;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NumericConstraint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NumericConstraint>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(NumericConstraint::parse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_prefix() {
        let cases = [
            ("5", Comparison::Eq, 5),
            ("=5", Comparison::Eq, 5),
            (">5", Comparison::Gt, 5),
            ("<5", Comparison::Lt, 5),
            (">=5", Comparison::Gte, 5),
            ("<=5", Comparison::Lte, 5),
            ("  >= 3 ", Comparison::Gte, 3),
            ("<-1", Comparison::Lt, -1),
        ];
        for (input, comparison, value) in cases {
            assert_eq!(
                NumericConstraint::parse(input),
                Some(NumericConstraint::new(comparison, value)),
                "input `{input}`"
            );
        }
    }

    #[test]
    fn empty_and_malformed_input_means_no_constraint() {
        for input in ["", "   ", ">", ">=", "abc", "=>3", "3.5", "<<2"] {
            assert_eq!(NumericConstraint::parse(input), None, "input `{input}`");
        }
    }

    #[test]
    fn serializes_without_eq_prefix() {
        let parsed = NumericConstraint::parse(" =7 ").expect("should parse");
        assert_eq!(parsed.to_string(), "7");
        let parsed = NumericConstraint::parse("<=2").expect("should parse");
        assert_eq!(parsed.to_string(), "<=2");
    }

    #[test]
    fn missing_value_fails_closed() {
        let constraint = NumericConstraint::parse(">=1").expect("should parse");
        assert!(!constraint.matches(None));
        assert!(!constraint.matches_cost(None));
        assert!(evaluate(None, None), "no constraint always passes");
    }

    #[test]
    fn cost_wildcard_passes_every_cost_constraint() {
        for input in [">3", "=0", "<0", ">=10", "<=-5"] {
            let constraint = NumericConstraint::parse(input).expect("should parse");
            assert!(constraint.matches_cost(Some(COST_WILDCARD)), "input `{input}`");
        }
    }

    #[test]
    fn wildcard_only_applies_to_cost() {
        let constraint = NumericConstraint::parse(">3").expect("should parse");
        assert!(!evaluate(Some(&constraint), Some(COST_WILDCARD)));
        assert!(evaluate_cost(Some(&constraint), Some(COST_WILDCARD)));
    }

    #[test]
    fn compares_with_operator() {
        let gt = NumericConstraint::parse(">2").expect("should parse");
        assert!(gt.matches(Some(3)));
        assert!(!gt.matches(Some(2)));

        let lte = NumericConstraint::parse("<=2").expect("should parse");
        assert!(lte.matches(Some(2)));
        assert!(!lte.matches(Some(3)));
    }

    #[test]
    fn lenient_field_ignores_bad_expressions() {
        #[derive(Deserialize)]
        struct Filter {
            #[serde(default, with = "lenient")]
            cost: Option<NumericConstraint>,
        }

        let filter: Filter = serde_json::from_str(r#"{"cost":">=x"}"#).expect("should decode");
        assert_eq!(filter.cost, None);
        let filter: Filter = serde_json::from_str(r#"{"cost":" <3"}"#).expect("should decode");
        assert_eq!(filter.cost, Some(NumericConstraint::new(Comparison::Lt, 3)));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// 解析后再序列化得到规范形式，再次解析结果不变。
            #[test]
            fn round_trips_through_string(
                prefix in prop::sample::select(vec!["", "=", ">", "<", ">=", "<="]),
                value in -100i32..100,
                pad_left in " {0,3}",
                pad_right in " {0,3}",
            ) {
                let input = format!("{pad_left}{prefix}{value}{pad_right}");
                let parsed = NumericConstraint::parse(&input).expect("valid input should parse");
                let normalized = if prefix == "=" { value.to_string() } else { format!("{prefix}{value}") };
                prop_assert_eq!(parsed.to_string(), normalized.clone());
                prop_assert_eq!(NumericConstraint::parse(&normalized), Some(parsed));
            }
        }
    }
}
