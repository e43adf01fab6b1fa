//! Ingredient name normalization.
//!
//! Free-text ingredient phrases ("2 cups chopped fresh basil", "œufs",
//! "green onion, sliced") are reduced to a short lookup key so the same
//! ingredient coming from different sources collapses to a single row.

use std::sync::LazyLock;

use regex::Regex;

/// Leading amount followed by a unit word, e.g. "2 cups", "1/2 tsp", "500g".
static QUANTITY_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d[\d\s/.\-]*\s*(?:ml|cl|dl|l|mg|g|kg|oz|lbs?|cups?|tbsp|tsp|tablespoons?|teaspoons?|pounds?|ounces?|grams?|kilograms?|milliliters?|liters?|litres?|pieces?|slices?|cloves?|heads?|bunch|bunches|stalks?|sprigs?|leaf|leaves|strips?|dash|dashes|pinch|pinches|drops?|gousses?|pincées?|tranches?|cuillères?|sachets?|feuilles?|brins?)\b\s*",
    )
    .expect("quantity/unit pattern is valid")
});

/// Any leading bare amount left after the unit pass, e.g. "3 ", "1/2-".
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d[\d\s/.\-]*").expect("number pattern is valid"));

/// Conjunctions and preparation descriptors dropped wherever they appear.
/// Multi-word phrases come before their suffixes ("more to taste" before "to taste").
const FILLER_PHRASES: &[&str] = &[
    "more to taste",
    "to taste",
    "as needed",
    "for serving",
    "for garnish",
    "or",
    "and",
    "et",
    "ou",
    "slice",
    "sliced",
    "blend",
    "blended",
    "hock",
    "whole",
    "chopped",
    "diced",
    "minced",
    "crushed",
    "ground",
    "fresh",
    "dried",
    "frozen",
    "canned",
    "optional",
];

/// Common two- and three-word names kept together, English and French.
/// No entry contains a filler word, so every entry is its own normal form.
const COMPOUND_NAMES: &[&str] = &[
    "green onion",
    "red onion",
    "yellow onion",
    "white onion",
    "olive oil",
    "vegetable oil",
    "canola oil",
    "peanut oil",
    "black pepper",
    "white pepper",
    "red pepper",
    "cayenne pepper",
    "sea salt",
    "kosher salt",
    "table salt",
    "brown sugar",
    "white sugar",
    "powdered sugar",
    "granulated sugar",
    "cream cheese",
    "goat cheese",
    "blue cheese",
    "parmesan cheese",
    "chicken broth",
    "beef broth",
    "vegetable broth",
    "tomato paste",
    "tomato sauce",
    "tomato puree",
    "bell pepper",
    "red bell pepper",
    "green bell pepper",
    "skim milk",
    "almond milk",
    "heavy cream",
    "sour cream",
    "whipping cream",
    "sauce tomate",
    "tomate",
    "tomates",
    "creme fraiche",
    "crème fraîche",
    "pommes de terre",
    "pomme de terre",
    "huile olive",
    "huile vegetale",
    "huile végétale",
    "poivre noir",
    "poivre blanc",
    "poivre rouge",
    "sel mer",
    "sel table",
    "sucre brun",
    "sucre blanc",
    "sucre poudre",
    "fromage creme",
    "fromage chèvre",
    "fromage bleu",
    "parmesan",
    "bouillon poulet",
    "bouillon boeuf",
    "bouillon légumes",
    "pâte tomate",
    "purée tomate",
    "poivron",
    "poivrons",
    "persil frais",
    "basilic frais",
    "coriandre frais",
    "viande hachée",
    "boeuf haché",
    "dinde hachée",
    "porc haché",
    "lait entier",
    "lait écrémé",
    "lait amande",
    "creme epaisse",
    "crème épaisse",
    "creme fouettee",
    "crème fouettée",
    "oignon vert",
    "oignon rouge",
    "oignon jaune",
    "oignon blanc",
];

const MAX_PASSES: usize = 4;

/// Fold the œ/æ ligatures (either case) into their two-letter forms.
#[must_use]
pub fn fold_ligatures(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            'œ' | 'Œ' => out.push_str("oe"),
            'æ' | 'Æ' => out.push_str("ae"),
            _ => out.push(c),
        }
    }
    out
}

/// Lowercase, trim and fold ligatures. This is the only cleanup applied to
/// autocomplete queries.
#[must_use]
pub fn fold_query(s: &str) -> String {
    fold_ligatures(&s.trim().to_lowercase())
}

/// Reduce a raw ingredient phrase to its canonical lookup key.
///
/// Deterministic and idempotent: `normalize_ingredient_name` of an already
/// normalized name returns it unchanged.
#[must_use]
pub fn normalize_ingredient_name(raw: &str) -> String {
    let mut current = fold_query(raw);
    // A pass can expose a new leading amount ("fresh 12oz basil"); repeat until stable.
    for _ in 0..MAX_PASSES {
        let next = normalize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn normalize_pass(folded: &str) -> String {
    let cleaned: String = folded
        .chars()
        .map(|c| if is_separator(c) { ' ' } else { c })
        .collect();
    let without_fillers = remove_fillers(&cleaned);

    let stripped = QUANTITY_UNIT.replace(without_fillers.trim_start(), "");
    let stripped = LEADING_NUMBER.replace(&stripped, "");

    let words: Vec<&str> = stripped
        .split_whitespace()
        .filter(|w| w.chars().count() > 1)
        .collect();

    if words.is_empty() {
        return folded.trim().to_string();
    }

    let phrase = words.join(" ");
    if let Some(compound) = match_compound(&phrase) {
        return compound.to_string();
    }

    if words.len() >= 2 {
        let first_two = words[..2].join(" ");
        if let Some(compound) = match_compound(&first_two) {
            return compound.to_string();
        }
        return first_two;
    }

    words[0].to_string()
}

fn is_separator(c: char) -> bool {
    matches!(
        c,
        ',' | ';' | ':' | '(' | ')' | '[' | ']' | '!' | '?' | '"' | '*' | '+'
    )
}

fn remove_fillers(s: &str) -> String {
    let mut padded = format!(" {} ", s.split_whitespace().collect::<Vec<_>>().join(" "));
    for filler in FILLER_PHRASES {
        let pattern = format!(" {filler} ");
        while padded.contains(&pattern) {
            padded = padded.replace(&pattern, " ");
        }
    }
    padded
}

/// Exact match first, then the longest compound the phrase starts or ends with.
fn match_compound(phrase: &str) -> Option<&'static str> {
    if let Some(exact) = COMPOUND_NAMES.iter().copied().find(|c| *c == phrase) {
        return Some(exact);
    }
    COMPOUND_NAMES
        .iter()
        .filter(|c| {
            phrase
                .strip_prefix(**c)
                .is_some_and(|rest| rest.starts_with(' '))
                || phrase
                    .strip_suffix(**c)
                    .is_some_and(|rest| rest.ends_with(' '))
        })
        .max_by_key(|c| c.len())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_unit_and_fillers_stripped() {
        assert_eq!(normalize_ingredient_name("2 cups chopped fresh basil"), "basil");
        assert_eq!(normalize_ingredient_name("1/2 cup sugar"), "sugar");
        assert_eq!(normalize_ingredient_name("500g farine"), "farine");
        assert_eq!(normalize_ingredient_name("3 tbsp olive oil"), "olive oil");
    }

    #[test]
    fn test_ligatures_folded() {
        assert_eq!(normalize_ingredient_name("œufs"), "oeufs");
        assert_eq!(normalize_ingredient_name("ŒUF"), "oeuf");
        assert_eq!(fold_ligatures("Cæsar"), "Caesar");
    }

    #[test]
    fn test_compound_preserved() {
        assert_eq!(normalize_ingredient_name("green onion, sliced"), "green onion");
        assert_eq!(normalize_ingredient_name("500 g pommes de terre"), "pommes de terre");
        assert_eq!(normalize_ingredient_name("extra virgin olive oil"), "olive oil");
        assert_eq!(normalize_ingredient_name("Sauce tomate"), "sauce tomate");
    }

    #[test]
    fn test_longest_compound_wins() {
        assert_eq!(normalize_ingredient_name("red bell pepper"), "red bell pepper");
        assert_eq!(normalize_ingredient_name("red bell pepper strips"), "red bell pepper");
    }

    #[test]
    fn test_descriptor_words_never_survive_in_compounds() {
        assert_eq!(normalize_ingredient_name("1 lb ground beef"), "beef");
        assert_eq!(normalize_ingredient_name("fresh parsley"), "parsley");
        assert_eq!(normalize_ingredient_name("2 cups whole milk"), "milk");
        assert_eq!(normalize_ingredient_name("beef"), "beef");
    }

    #[test]
    fn test_compound_in_first_two_words() {
        assert_eq!(normalize_ingredient_name("belle tomate farcie"), "tomate");
    }

    #[test]
    fn test_unit_requires_word_boundary() {
        // "l" and "g" are units, but not when they start "large" or "green".
        assert_eq!(normalize_ingredient_name("1 large onion"), "large onion");
        assert_eq!(normalize_ingredient_name("2 green onions"), "green onions");
    }

    #[test]
    fn test_falls_back_to_first_two_words() {
        assert_eq!(normalize_ingredient_name("mozzarella di bufala"), "mozzarella di");
        assert_eq!(normalize_ingredient_name("Salt and pepper"), "salt pepper");
    }

    #[test]
    fn test_single_word() {
        assert_eq!(normalize_ingredient_name("  Tomates  "), "tomates");
        assert_eq!(normalize_ingredient_name("riz"), "riz");
    }

    #[test]
    fn test_empty_after_stripping_returns_trimmed_input() {
        assert_eq!(normalize_ingredient_name("2"), "2");
        assert_eq!(normalize_ingredient_name(" To taste "), "to taste");
        assert_eq!(normalize_ingredient_name("2 cups"), "2 cups");
        assert_eq!(normalize_ingredient_name(""), "");
    }

    #[test]
    fn test_exposed_leading_amount() {
        assert_eq!(normalize_ingredient_name("fresh 12oz basil"), "basil");
    }

    #[test]
    fn test_idempotent_over_vocabulary() {
        let samples = [
            "2 cups chopped fresh basil",
            "œufs",
            "green onion, sliced",
            "1/2 cup brown sugar",
            "3 cloves garlic, minced",
            "2 gousses d'ail",
            "1 pincée de sel",
            "200 g lardons fumés",
            "crème fraîche épaisse",
            "salt and pepper to taste",
            "1 large onion",
            "mozzarella slice",
            "frozen peas",
            "parmesan cheese for garnish",
            "fresh 12oz basil",
            "x 12oz basil",
            "4 tomates bien mûres",
            "riz",
            "2",
            "to taste",
            "",
        ];
        for raw in samples {
            let once = normalize_ingredient_name(raw);
            let twice = normalize_ingredient_name(&once);
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_compounds_are_fixed_points() {
        for compound in COMPOUND_NAMES {
            assert_eq!(normalize_ingredient_name(compound), *compound);
        }
    }

    #[test]
    fn test_fold_query() {
        assert_eq!(fold_query("  Œuf "), "oeuf");
    }
}
