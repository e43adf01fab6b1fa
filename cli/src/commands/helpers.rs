use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use eatthis_core::diet::{self, DietProfile};
use eatthis_core::models::{Difficulty, IngredientSuggestion, RecipeCard, ShoppingListItem};

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn format_minutes(time_min: Option<i64>) -> String {
    time_min.map_or_else(|| "-".to_string(), |m| format!("{m} min"))
}

pub(crate) fn format_difficulty(difficulty: Option<Difficulty>) -> String {
    difficulty.map_or_else(|| "-".to_string(), |d| d.label().to_string())
}

/// "1h 02m 05s", "2m 05s" or "45s".
pub(crate) fn format_seconds(total: i64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

/// Short tags such as "veg, gf" for the diets a recipe satisfies.
pub(crate) fn diet_tags(profile: DietProfile) -> String {
    let mut tags = Vec::new();
    if profile.vegan {
        tags.push("vegan");
    } else if profile.vegetarian {
        tags.push("veg");
    }
    if profile.gluten_free {
        tags.push("gf");
    }
    if tags.is_empty() {
        "-".to_string()
    } else {
        tags.join(", ")
    }
}

/// `owned` is the ingredient query the cards were matched against.
pub(crate) fn print_card_table(cards: &[RecipeCard], owned: &[String]) {
    #[derive(Tabled)]
    struct CardRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Difficulty")]
        difficulty: String,
        #[tabled(rename = "Have")]
        have: i64,
        #[tabled(rename = "Missing")]
        missing: i64,
        #[tabled(rename = "Score")]
        score: String,
        #[tabled(rename = "Diet")]
        diet: String,
        #[tabled(rename = "To buy")]
        to_buy: String,
    }

    let rows: Vec<CardRow> = cards
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let combined: Vec<&str> = owned
                .iter()
                .chain(c.missing_ingredients.iter())
                .map(String::as_str)
                .collect();
            CardRow {
                idx: i + 1,
                id: c.id,
                title: truncate(&c.title, 35),
                time: format_minutes(c.time_min),
                difficulty: format_difficulty(c.difficulty),
                have: c.have,
                missing: c.missing,
                score: format!("{}%", c.score),
                diet: diet_tags(diet::classify(&combined, &c.title)),
                to_buy: truncate(&c.missing_ingredients.join(", "), 40),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(5..8)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_suggestion_table(suggestions: &[IngredientSuggestion]) {
    #[derive(Tabled)]
    struct SuggestionRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Ingredient")]
        name: String,
    }

    let rows: Vec<SuggestionRow> = suggestions
        .iter()
        .map(|s| SuggestionRow {
            id: s.id,
            name: s.name.clone(),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
}

pub(crate) fn print_shopping_table(items: &[ShoppingListItem]) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "")]
        checked: &'static str,
        #[tabled(rename = "Item")]
        name: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "ID")]
        id: String,
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|item| ItemRow {
            checked: if item.checked { "[x]" } else { "[ ]" },
            name: truncate(&item.name, 30),
            recipe: item
                .recipe_title
                .as_deref()
                .map(|t| truncate(t, 30))
                .unwrap_or_default(),
            id: item.id.clone(),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        // Multi-byte characters must not split
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Pâtes", 10), "Pâtes");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(45), "45s");
        assert_eq!(format_seconds(125), "2m 05s");
        assert_eq!(format_seconds(3725), "1h 02m 05s");
    }

    #[test]
    fn test_format_minutes_and_difficulty() {
        assert_eq!(format_minutes(Some(15)), "15 min");
        assert_eq!(format_minutes(None), "-");
        assert_eq!(format_difficulty(None), "-");
        assert_eq!(
            format_difficulty(Some(Difficulty::Hard)),
            Difficulty::Hard.label()
        );
    }

    #[test]
    fn test_diet_tags() {
        let vegan = DietProfile {
            vegetarian: true,
            vegan: true,
            gluten_free: true,
        };
        assert_eq!(diet_tags(vegan), "vegan, gf");

        let veg = DietProfile {
            vegetarian: true,
            vegan: false,
            gluten_free: false,
        };
        assert_eq!(diet_tags(veg), "veg");

        let none = DietProfile {
            vegetarian: false,
            vegan: false,
            gluten_free: false,
        };
        assert_eq!(diet_tags(none), "-");
    }

    #[test]
    fn test_json_error_escapes() {
        let out = json_error("bad \"quote\"");
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["error"], "bad \"quote\"");
    }
}
