use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::diet::{self, Diet};
use crate::models::{Difficulty, RecipeCard};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    #[default]
    All,
    /// Under 15 minutes.
    Fast,
    /// 15 to 30 minutes inclusive.
    Medium,
    /// Over 30 minutes.
    Slow,
}

impl TimeFilter {
    /// A recipe without a known time only passes `All`.
    #[must_use]
    pub fn accepts(self, time_min: Option<i64>) -> bool {
        match (self, time_min) {
            (Self::All, _) => true,
            (_, None) => false,
            (Self::Fast, Some(t)) => t < 15,
            (Self::Medium, Some(t)) => (15..=30).contains(&t),
            (Self::Slow, Some(t)) => t > 30,
        }
    }
}

impl FromStr for TimeFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "fast" => Ok(Self::Fast),
            "medium" => Ok(Self::Medium),
            "slow" => Ok(Self::Slow),
            other => bail!("Unknown time filter '{other}' (expected all, fast, medium or slow)"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DifficultyFilter {
    #[default]
    All,
    Tier(Difficulty),
}

impl DifficultyFilter {
    #[must_use]
    pub fn accepts(self, difficulty: Option<Difficulty>) -> bool {
        match self {
            Self::All => true,
            Self::Tier(wanted) => difficulty == Some(wanted),
        }
    }
}

impl FromStr for DifficultyFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "1" | "easy" => Ok(Self::Tier(Difficulty::Easy)),
            "2" | "medium" => Ok(Self::Tier(Difficulty::Medium)),
            "3" | "hard" => Ok(Self::Tier(Difficulty::Hard)),
            other => bail!("Unknown difficulty filter '{other}' (expected all, 1, 2 or 3)"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DietFilter {
    #[default]
    All,
    Only(Diet),
}

impl FromStr for DietFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "vegetarian" => Ok(Self::Only(Diet::Vegetarian)),
            "vegan" => Ok(Self::Only(Diet::Vegan)),
            "gluten-free" | "gluten_free" | "glutenfree" => Ok(Self::Only(Diet::GlutenFree)),
            other => {
                bail!("Unknown diet filter '{other}' (expected all, vegetarian, vegan or gluten-free)")
            }
        }
    }
}

impl fmt::Display for DietFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(d) => f.write_str(d.label()),
        }
    }
}

/// The three filter selections shown above the results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipeFilters {
    pub time: TimeFilter,
    pub difficulty: DifficultyFilter,
    pub diet: DietFilter,
}

impl RecipeFilters {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `owned` is the user's ingredient query; together with the card's
    /// missing ingredients it forms the recipe's full ingredient list.
    #[must_use]
    pub fn accepts(&self, card: &RecipeCard, owned: &[String]) -> bool {
        if !self.time.accepts(card.time_min) || !self.difficulty.accepts(card.difficulty) {
            return false;
        }
        match self.diet {
            DietFilter::All => true,
            DietFilter::Only(wanted) => {
                let combined: Vec<&str> = owned
                    .iter()
                    .chain(card.missing_ingredients.iter())
                    .map(String::as_str)
                    .collect();
                diet::classify(&combined, &card.title).allows(wanted)
            }
        }
    }
}

/// Visible subset of `cards`, order preserved.
#[must_use]
pub fn apply_filters(cards: &[RecipeCard], filters: &RecipeFilters, owned: &[String]) -> Vec<RecipeCard> {
    if filters.is_empty() {
        return cards.to_vec();
    }
    cards
        .iter()
        .filter(|card| filters.accepts(card, owned))
        .cloned()
        .collect()
}

/// Descending score, then ascending missing count, then ascending id.
#[must_use]
pub fn compare_cards(a: &RecipeCard, b: &RecipeCard) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(a.missing.cmp(&b.missing))
        .then(a.id.cmp(&b.id))
}

pub fn rank_cards(cards: &mut [RecipeCard]) {
    cards.sort_by(compare_cards);
}
