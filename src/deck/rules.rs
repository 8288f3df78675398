use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use super::card::{
    AspectId, AspectStats, Card, CardCode, CardLookup, CategoryNames, DeckMeta, QuantityMap,
};
use super::classify::{CardBucket, CardClassifier, DeckCardError};
use super::config::DeckRules;
use super::diff::{diff_deck, DeckChanges, PreviousDeck};

/// 牌组层面的问题，包含全部单卡问题。序列化为问题编码字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckError {
    Role,
    TooFewCards,
    TooManyCards,
    Aspects,
    Personality,
    TooManyPersonality(AspectId),
    Background,
    Specialty,
    TooManyBackground,
    TooManySpecialty,
    OutsideInterest,
    TooManyOutsideInterest,
    Card(DeckCardError),
}

impl DeckError {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeckError::Role => "role",
            DeckError::TooFewCards => "too_few_cards",
            DeckError::TooManyCards => "too_many_cards",
            DeckError::Aspects => "aspects",
            DeckError::Personality => "personality",
            DeckError::TooManyPersonality(AspectId::Awa) => "too_many_awa_personality",
            DeckError::TooManyPersonality(AspectId::Fit) => "too_many_fit_personality",
            DeckError::TooManyPersonality(AspectId::Foc) => "too_many_foc_personality",
            DeckError::TooManyPersonality(AspectId::Spi) => "too_many_spi_personality",
            DeckError::Background => "background",
            DeckError::Specialty => "specialty",
            DeckError::TooManyBackground => "too_many_background",
            DeckError::TooManySpecialty => "too_many_specialty",
            DeckError::OutsideInterest => "outside_interest",
            DeckError::TooManyOutsideInterest => "too_many_outside_interest",
            DeckError::Card(error) => error.as_str(),
        }
    }
}

impl From<DeckCardError> for DeckError {
    fn from(error: DeckCardError) -> Self {
        DeckError::Card(error)
    }
}

impl fmt::Display for DeckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeckError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 牌组视图中的一行。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    Header {
        id: String,
        section: CardBucket,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        problems: Vec<DeckError>,
    },
    Card {
        id: String,
        card: Card,
        count: u32,
        problems: Vec<DeckError>,
    },
    /// 说明某个所选分区正在占用外部兴趣名额。
    Description {
        id: String,
        section: CardBucket,
        splash: CardBucket,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        count: u32,
    },
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Header { id, .. } | Item::Card { id, .. } | Item::Description { id, .. } => id,
        }
    }

    pub fn problems(&self) -> &[DeckError] {
        match self {
            Item::Header { problems, .. } | Item::Card { problems, .. } => problems,
            Item::Description { .. } => &[],
        }
    }

    fn card(card: &Card, count: u32, problems: Vec<DeckError>) -> Self {
        Item::Card {
            id: format!("card:{}", card.code),
            card: card.clone(),
            count,
            problems,
        }
    }
}

/// 一次评估的完整输出，每次调用重新生成。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParsedDeck {
    pub stats: AspectStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Card>,
    pub problem: Vec<DeckError>,
    pub role_problems: Vec<DeckError>,
    pub cards: Vec<Item>,
    pub loading: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<CardCode>,
    pub deck_size: u32,
    pub malady_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<DeckChanges>,
}

impl ParsedDeck {
    /// 没有问题且卡牌数据已齐全。
    pub fn is_valid(&self) -> bool {
        self.problem.is_empty() && !self.loading
    }

    pub fn has_problem(&self, problem: DeckError) -> bool {
        self.problem.contains(&problem)
    }
}

/// 评估所需的原始牌组状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeckInput {
    #[serde(default)]
    pub stats: AspectStats,
    #[serde(default)]
    pub meta: DeckMeta,
    #[serde(default)]
    pub slots: QuantityMap,
    #[serde(default)]
    pub side_slots: QuantityMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_deck: Option<PreviousDeck>,
}

impl DeckInput {
    pub fn is_starting_deck(&self) -> bool {
        self.previous_deck.is_none()
    }
}

#[derive(Debug, Default)]
struct SetTally {
    count: u32,
    non_expert: u32,
    splashed: u32,
}

/// 初始牌组单次遍历中的累计计数。外部兴趣名额由背景、专长和外部卡共用，先到先得。
#[derive(Debug, Default)]
struct Tally {
    personality: [u32; 4],
    background: SetTally,
    specialty: SetTally,
    splash: u32,
}

impl Tally {
    fn record(
        &mut self,
        card: &Card,
        bucket: CardBucket,
        count: u32,
        rules: &DeckRules,
    ) -> Option<DeckError> {
        match bucket {
            CardBucket::Personality => {
                if let Some(aspect) = card.aspect_id {
                    let total = &mut self.personality[aspect.index()];
                    *total = total.saturating_add(count);
                }
                None
            }
            CardBucket::Background | CardBucket::Specialty => {
                self.record_chosen(bucket, card.is_expert(), count, rules)
            }
            CardBucket::OutsideInterest => {
                if card.is_expert() {
                    return None;
                }
                self.splash = self.splash.saturating_add(count);
                self.check_splash(rules)
            }
            CardBucket::Other => None,
        }
    }

    fn record_chosen(
        &mut self,
        bucket: CardBucket,
        expert: bool,
        count: u32,
        rules: &DeckRules,
    ) -> Option<DeckError> {
        let splash = self.splash;
        let (set, too_many) = if bucket == CardBucket::Background {
            (&mut self.background, DeckError::TooManyBackground)
        } else {
            (&mut self.specialty, DeckError::TooManySpecialty)
        };

        let before = set.count;
        set.count = set.count.saturating_add(count);
        if !expert {
            set.non_expert = set.non_expert.saturating_add(count);
        }
        if set.count <= rules.set_size {
            return None;
        }

        let overflow = set.count - before.max(rules.set_size);
        if set.count > rules.set_max || splash >= rules.splash_slots {
            return Some(too_many);
        }
        if set.non_expert < rules.splash_slots {
            return Some(DeckCardError::InvalidOutsideInterest.into());
        }

        set.splashed = set.splashed.saturating_add(overflow);
        self.splash = self.splash.saturating_add(overflow);
        self.check_splash(rules)
    }

    /// 外部兴趣名额总数（含背景、专长溢出）超过上限。
    fn check_splash(&self, rules: &DeckRules) -> Option<DeckError> {
        (self.splash > rules.splash_slots).then_some(DeckError::TooManyOutsideInterest)
    }

    fn set(&self, bucket: CardBucket) -> &SetTally {
        if bucket == CardBucket::Background {
            &self.background
        } else {
            &self.specialty
        }
    }
}

#[derive(Debug, Default)]
struct Section {
    problems: Vec<DeckError>,
    items: Vec<Item>,
}

#[derive(Debug, Default)]
struct Sections {
    sections: [Section; 5],
}

impl Sections {
    fn get_mut(&mut self, bucket: CardBucket) -> &mut Section {
        &mut self.sections[bucket.index()]
    }

    fn push_problem(&mut self, bucket: CardBucket, problem: DeckError) {
        self.get_mut(bucket).problems.push(problem);
    }

    fn push_item(&mut self, bucket: CardBucket, item: Item) {
        self.get_mut(bucket).items.push(item);
    }

    fn assemble(self, titles: [Option<String>; 5]) -> Vec<Item> {
        let mut items = Vec::new();
        for ((bucket, section), title) in CardBucket::ORDER
            .into_iter()
            .zip(self.sections)
            .zip(titles)
        {
            if bucket == CardBucket::Other && section.items.is_empty() && section.problems.is_empty()
            {
                continue;
            }
            items.push(Item::Header {
                id: format!("header:{}", bucket.as_str()),
                section: bucket,
                title,
                problems: section.problems,
            });
            items.extend(section.items);
        }
        items
    }
}

fn unique_problems(problems: impl IntoIterator<Item = DeckError>) -> Vec<DeckError> {
    let mut seen = HashSet::new();
    problems
        .into_iter()
        .filter(|problem| seen.insert(*problem))
        .collect()
}

/// 牌组规则引擎：对输入做纯函数式评估，不修改也不保留任何调用方数据。
#[derive(Debug, Clone, Default)]
pub struct DeckRuleEngine {
    rules: DeckRules,
}

impl DeckRuleEngine {
    pub fn new(rules: DeckRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &DeckRules {
        &self.rules
    }

    pub fn evaluate(
        &self,
        deck: &DeckInput,
        cards: &CardLookup,
        names: &dyn CategoryNames,
    ) -> ParsedDeck {
        let rules = &self.rules;
        let starting = deck.is_starting_deck();
        let classifier =
            CardClassifier::new(&deck.meta, &deck.stats, rules).starting_deck(starting);

        let mut missing = BTreeSet::new();
        let mut entries: Vec<(&Card, u32)> = Vec::new();
        for (code, &count) in &deck.slots {
            if count == 0 {
                continue;
            }
            match cards.get(code) {
                Some(card) => entries.push((card, count)),
                None => {
                    missing.insert(code.clone());
                }
            }
        }

        let (role, role_problems) = Self::resolve_role(&deck.meta, cards, &classifier, &mut missing);

        let deck_size = entries
            .iter()
            .filter(|(card, _)| !card.is_malady())
            .map(|(_, count)| *count)
            .fold(0, u32::saturating_add);
        let malady_count = entries
            .iter()
            .filter(|(card, _)| card.is_malady())
            .map(|(_, count)| *count)
            .fold(0, u32::saturating_add);

        let mut sections = Sections::default();
        let mut tally = Tally::default();
        let mut global = Vec::new();

        for (card, count) in entries {
            let classification = classifier.classify(card, count);
            let mut problems: Vec<DeckError> = classification
                .problems
                .iter()
                .copied()
                .map(DeckError::from)
                .collect();
            if starting {
                if let Some(problem) = tally.record(card, classification.bucket, count, rules) {
                    problems.push(problem);
                }
            }
            sections.push_item(classification.bucket, Item::card(card, count, problems));
        }

        if starting {
            if !deck.stats.is_standard_spread() {
                global.push(DeckError::Aspects);
            }
            Self::check_composition(&tally, rules, &mut sections);
            Self::describe_splash(&tally, &deck.meta, names, &mut sections);
        } else if deck_size < rules.deck_size {
            global.push(DeckError::TooFewCards);
        } else if deck_size > rules.deck_size {
            global.push(DeckError::TooManyCards);
        }

        let titles = [
            None,
            deck.meta.background().and_then(|id| names.category_name(id)),
            deck.meta.specialty().and_then(|id| names.category_name(id)),
            None,
            None,
        ];
        let items = sections.assemble(titles);

        let problem = unique_problems(
            role_problems
                .iter()
                .chain(global.iter())
                .chain(items.iter().flat_map(|item| item.problems().iter()))
                .copied(),
        );

        let loading = !missing.is_empty();
        if loading {
            log::debug!("{} card codes not yet available: {:?}", missing.len(), missing);
        }
        log::debug!(
            "evaluated {} deck: {} cards, {} maladies, {} problems",
            if starting { "starting" } else { "upgraded" },
            deck_size,
            malady_count,
            problem.len()
        );

        ParsedDeck {
            stats: deck.stats,
            background: deck.meta.background().map(str::to_owned),
            specialty: deck.meta.specialty().map(str::to_owned),
            role,
            problem,
            role_problems,
            cards: items,
            loading,
            missing: missing.into_iter().collect(),
            deck_size,
            malady_count,
            changes: diff_deck(&deck.slots, &deck.side_slots, deck.previous_deck.as_ref()),
        }
    }

    fn resolve_role(
        meta: &DeckMeta,
        cards: &CardLookup,
        classifier: &CardClassifier<'_>,
        missing: &mut BTreeSet<CardCode>,
    ) -> (Option<Card>, Vec<DeckError>) {
        let Some(code) = meta.role() else {
            return (None, vec![DeckError::Role]);
        };
        match cards.get(code) {
            Some(card) => {
                let problems = classifier
                    .check_role(card)
                    .map(DeckError::from)
                    .into_iter()
                    .collect();
                (Some(card.clone()), problems)
            }
            None => {
                missing.insert(code.to_owned());
                (None, vec![DeckError::Role])
            }
        }
    }

    fn check_composition(tally: &Tally, rules: &DeckRules, sections: &mut Sections) {
        let wanted = rules.personality_per_aspect;
        if tally.personality.iter().any(|total| *total != wanted) {
            sections.push_problem(CardBucket::Personality, DeckError::Personality);
        }
        for aspect in AspectId::ALL {
            if tally.personality[aspect.index()] > wanted {
                sections.push_problem(CardBucket::Personality, DeckError::TooManyPersonality(aspect));
            }
        }

        if tally.background.count < rules.set_size {
            sections.push_problem(CardBucket::Background, DeckError::Background);
        }
        if tally.specialty.count < rules.set_size {
            sections.push_problem(CardBucket::Specialty, DeckError::Specialty);
        }
        if tally.splash < rules.splash_slots {
            sections.push_problem(CardBucket::OutsideInterest, DeckError::OutsideInterest);
        }
    }

    fn describe_splash(
        tally: &Tally,
        meta: &DeckMeta,
        names: &dyn CategoryNames,
        sections: &mut Sections,
    ) {
        for bucket in [CardBucket::Background, CardBucket::Specialty] {
            let splashed = tally.set(bucket).splashed;
            if splashed == 0 {
                continue;
            }
            let set_id = if bucket == CardBucket::Background {
                meta.background()
            } else {
                meta.specialty()
            };
            sections.push_item(
                CardBucket::OutsideInterest,
                Item::Description {
                    id: format!("description:{}_splash", bucket.as_str()),
                    section: CardBucket::OutsideInterest,
                    splash: bucket,
                    title: set_id.and_then(|id| names.category_name(id)),
                    count: splashed,
                },
            );
        }
    }
}
