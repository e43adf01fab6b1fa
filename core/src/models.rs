use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Difficulty tier of a recipe, stored and serialized as 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn tier(self) -> u8 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Easy),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Hard),
            other => Err(format!("difficulty must be 1, 2 or 3 (got {other})")),
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> Self {
        d.tier()
    }
}

/// Lightweight recipe summary carrying match statistics for one ingredient query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeCard {
    pub id: i64,
    pub title: String,
    pub time_min: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub have: i64,
    pub missing: i64,
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub missing_ingredients: Vec<String>,
}

/// Full recipe as shown on the detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub steps: Vec<String>,
    pub time_min: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub image_url: Option<String>,
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientSuggestion {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
}

/// A recipe to insert. Ingredient names are raw and get normalized on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecipe {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub time_min: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub ingredients: Vec<String>,
}

/// Aggregated timer samples for one recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStats {
    pub average_time_seconds: Option<i64>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListItem {
    pub id: String,
    pub name: String,
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub recipes_parsed: usize,
    pub recipes_imported: usize,
    pub recipes_skipped: usize,
    pub ingredients_created: usize,
}

pub fn validate_new_recipe(recipe: &NewRecipe) -> Result<()> {
    if recipe.title.trim().is_empty() {
        bail!("Recipe title must not be empty");
    }
    if recipe.ingredients.iter().all(|i| i.trim().is_empty()) {
        bail!("Recipe '{}' must have at least one ingredient", recipe.title);
    }
    if let Some(t) = recipe.time_min {
        if t < 0 {
            bail!("Recipe '{}' has a negative time ({t} min)", recipe.title);
        }
    }
    Ok(())
}

pub fn validate_time_seconds(seconds: f64) -> Result<i64> {
    if !seconds.is_finite() || seconds <= 0.0 {
        bail!("timeSeconds must be a positive number");
    }
    Ok(seconds.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recipe() -> NewRecipe {
        NewRecipe {
            title: "Omelette".to_string(),
            description: None,
            steps: vec!["Battre les oeufs".to_string()],
            time_min: Some(10),
            difficulty: Some(Difficulty::Easy),
            image_url: None,
            ingredients: vec!["oeufs".to_string(), "sel".to_string()],
        }
    }

    #[test]
    fn test_difficulty_serializes_as_tier() {
        let json = serde_json::to_string(&Difficulty::Medium).unwrap();
        assert_eq!(json, "2");
        let parsed: Difficulty = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, Difficulty::Hard);
    }

    #[test]
    fn test_difficulty_rejects_out_of_range() {
        assert!(serde_json::from_str::<Difficulty>("0").is_err());
        assert!(serde_json::from_str::<Difficulty>("4").is_err());
    }

    #[test]
    fn test_recipe_card_uses_camel_case() {
        let card = RecipeCard {
            id: 1,
            title: "Omelette".to_string(),
            time_min: Some(10),
            difficulty: Some(Difficulty::Easy),
            have: 2,
            missing: 1,
            score: 66,
            image_url: None,
            missing_ingredients: vec!["sel".to_string()],
        };
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["timeMin"], 10);
        assert_eq!(value["difficulty"], 1);
        assert_eq!(value["missingIngredients"][0], "sel");
        assert!(value.get("imageUrl").is_none());
    }

    #[test]
    fn test_validate_new_recipe_valid() {
        assert!(validate_new_recipe(&sample_recipe()).is_ok());
    }

    #[test]
    fn test_validate_new_recipe_empty_title() {
        let mut r = sample_recipe();
        r.title = "  ".to_string();
        assert!(validate_new_recipe(&r).is_err());
    }

    #[test]
    fn test_validate_new_recipe_no_ingredients() {
        let mut r = sample_recipe();
        r.ingredients = vec![" ".to_string()];
        assert!(validate_new_recipe(&r).is_err());
    }

    #[test]
    fn test_validate_new_recipe_negative_time() {
        let mut r = sample_recipe();
        r.time_min = Some(-5);
        assert!(validate_new_recipe(&r).is_err());
    }

    #[test]
    fn test_validate_time_seconds() {
        assert_eq!(validate_time_seconds(90.4).unwrap(), 90);
        assert!(validate_time_seconds(0.0).is_err());
        assert!(validate_time_seconds(-3.0).is_err());
        assert!(validate_time_seconds(f64::NAN).is_err());
    }
}
