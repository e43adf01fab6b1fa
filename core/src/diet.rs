//! Keyword-based diet classification.
//!
//! An ingredient matches a keyword when either string contains the other, so
//! "saumon fumé" matches "saumon" and "oeuf" matches "oeufs". Short keywords
//! can over-match; this is a heuristic, not an allergen guarantee.

use serde::{Deserialize, Serialize};

/// Meats, fish and seafood.
const NON_VEGETARIAN: &[&str] = &[
    "poulet",
    "boeuf",
    "porc",
    "agneau",
    "veau",
    "canard",
    "dinde",
    "saumon",
    "thon",
    "crevette",
    "crabe",
    "moule",
    "huître",
    "calamar",
    "jambon",
    "bacon",
    "lardons",
    "chorizo",
    "salami",
    "viande",
    "poisson",
    "fruits de mer",
    "crustacé",
    "mollusque",
];

/// Dairy, eggs, honey and other animal products.
const NON_VEGAN: &[&str] = &[
    "lait",
    "fromage",
    "beurre",
    "crème",
    "yaourt",
    "fromage blanc",
    "oeuf",
    "oeufs",
    "jaune d'oeuf",
    "miel",
    "gelée royale",
    "lactose",
    "caséine",
    "whey",
    "protéine de lait",
];

/// Grains and products containing gluten.
const GLUTEN: &[&str] = &[
    "blé",
    "froment",
    "épeautre",
    "seigle",
    "orge",
    "avoine",
    "farine",
    "pâtes",
    "pates",
    "spaghetti",
    "lasagne",
    "pain",
    "biscuit",
    "gâteau",
    "pizza",
    "tarte",
    "quiche",
    "pâte",
    "pâte à pizza",
    "chapelure",
    "panure",
    "semoule",
    "couscous",
    "boulgour",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Diet {
    Vegetarian,
    Vegan,
    GlutenFree,
}

impl Diet {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::GlutenFree => "gluten-free",
        }
    }
}

/// Diet membership of one recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DietProfile {
    pub vegetarian: bool,
    pub vegan: bool,
    pub gluten_free: bool,
}

impl DietProfile {
    #[must_use]
    pub fn allows(&self, diet: Diet) -> bool {
        match diet {
            Diet::Vegetarian => self.vegetarian,
            Diet::Vegan => self.vegan,
            Diet::GlutenFree => self.gluten_free,
        }
    }
}

/// Lowercased, trimmed, ligature-folded; blank entries dropped.
fn prepare<S: AsRef<str>>(ingredients: &[S]) -> Vec<String> {
    ingredients
        .iter()
        .map(|i| crate::normalize::fold_query(i.as_ref()))
        .filter(|i| !i.is_empty())
        .collect()
}

fn matches_any(ingredients: &[String], title: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| {
        title.contains(keyword)
            || ingredients
                .iter()
                .any(|ing| ing.contains(keyword) || keyword.contains(ing.as_str()))
    })
}

#[must_use]
pub fn classify<S: AsRef<str>>(ingredients: &[S], title: &str) -> DietProfile {
    let ingredients = prepare(ingredients);
    let title = crate::normalize::fold_query(title);

    let vegetarian = !matches_any(&ingredients, &title, NON_VEGETARIAN);
    let vegan = vegetarian && !matches_any(&ingredients, &title, NON_VEGAN);
    let gluten_free = !matches_any(&ingredients, &title, GLUTEN);

    DietProfile {
        vegetarian,
        vegan,
        gluten_free,
    }
}

#[must_use]
pub fn is_vegetarian<S: AsRef<str>>(ingredients: &[S], title: &str) -> bool {
    classify(ingredients, title).vegetarian
}

#[must_use]
pub fn is_vegan<S: AsRef<str>>(ingredients: &[S], title: &str) -> bool {
    classify(ingredients, title).vegan
}

#[must_use]
pub fn is_gluten_free<S: AsRef<str>>(ingredients: &[S], title: &str) -> bool {
    classify(ingredients, title).gluten_free
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meat_is_not_vegetarian() {
        let profile = classify(&["poulet", "riz"], "");
        assert!(!profile.vegetarian);
        assert!(!profile.vegan);
    }

    #[test]
    fn test_rice_and_vegetables_fit_every_diet() {
        let profile = classify(&["riz", "légumes"], "");
        assert!(profile.vegetarian);
        assert!(profile.vegan);
        assert!(profile.gluten_free);
    }

    #[test]
    fn test_dairy_is_vegetarian_but_not_vegan() {
        let profile = classify(&["fromage", "tomates"], "");
        assert!(profile.vegetarian);
        assert!(!profile.vegan);
    }

    #[test]
    fn test_containment_works_both_ways() {
        // Ingredient contains keyword
        assert!(!is_vegetarian(&["saumon fumé"], ""));
        // Keyword contains ingredient
        assert!(!is_vegan(&["oeuf"], ""));
    }

    #[test]
    fn test_ligature_ingredient_matches_folded_keyword() {
        assert!(!is_vegan(&["œufs"], ""));
    }

    #[test]
    fn test_title_is_checked() {
        assert!(!is_vegetarian(&["riz"], "Riz au poulet"));
        assert!(!is_gluten_free(&["tomates"], "Tarte aux tomates"));
    }

    #[test]
    fn test_gluten_detection() {
        assert!(!is_gluten_free(&["spaghetti", "parmesan"], ""));
        assert!(is_gluten_free(&["riz", "curry"], ""));
    }

    #[test]
    fn test_blank_ingredients_ignored() {
        // An empty string is contained in every keyword; it must not count.
        assert!(is_vegetarian(&["", "  ", "riz"], ""));
    }

    #[test]
    fn test_allows() {
        let profile = classify(&["fromage"], "");
        assert!(profile.allows(Diet::Vegetarian));
        assert!(!profile.allows(Diet::Vegan));
        assert!(profile.allows(Diet::GlutenFree));
    }
}
