//! 卡牌搜索（数值筛选表达式与卡池过滤）。

pub mod constraint;
pub mod filter;

pub use constraint::{evaluate, evaluate_cost, Comparison, NumericConstraint, COST_WILDCARD};
pub use filter::{CardSearch, NumericAttribute};
