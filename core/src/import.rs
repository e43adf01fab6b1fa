use std::collections::HashSet;
use std::io::Read;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::models::{ImportSummary, NewRecipe, validate_new_recipe};
use crate::normalize::normalize_ingredient_name;
use crate::service::RecipeStore;

/// Parse a JSON array of recipes from any reader.
///
/// Each element uses the same shape as the HTTP API:
/// `{title, description?, steps, timeMin?, difficulty?, imageUrl?, ingredients}`.
pub fn parse_recipes_json<R: Read>(reader: R) -> Result<Vec<NewRecipe>> {
    let value: serde_json::Value =
        serde_json::from_reader(reader).context("Failed to parse recipe JSON")?;
    if !value.is_array() {
        bail!("Recipe file must contain a JSON array");
    }
    let recipes: Vec<NewRecipe> =
        serde_json::from_value(value).context("Invalid recipe entry")?;
    Ok(recipes)
}

/// Validate every recipe up front, then insert the ones whose title is new.
///
/// Returns an `ImportSummary`. When `dry_run` is true, no data is written.
pub fn import_recipes(
    store: &dyn RecipeStore,
    recipes: &[NewRecipe],
    dry_run: bool,
) -> Result<ImportSummary> {
    for (idx, recipe) in recipes.iter().enumerate() {
        validate_new_recipe(recipe).with_context(|| format!("Recipe #{} is invalid", idx + 1))?;
    }

    let mut summary = ImportSummary {
        recipes_parsed: recipes.len(),
        ..ImportSummary::default()
    };
    let mut seen_titles = HashSet::new();
    let mut pending_ingredients = HashSet::new();

    for recipe in recipes {
        let title_key = recipe.title.trim().to_lowercase();
        if !seen_titles.insert(title_key) || store.recipe_exists_by_title(&recipe.title)? {
            warn!(title = %recipe.title, "skipping recipe with an existing title");
            summary.recipes_skipped += 1;
            continue;
        }

        if dry_run {
            for raw in recipe.ingredients.iter().filter(|i| !i.trim().is_empty()) {
                let name = normalize_ingredient_name(raw);
                if !pending_ingredients.contains(&name) && !store.ingredient_exists(&name)? {
                    pending_ingredients.insert(name);
                    summary.ingredients_created += 1;
                }
            }
        } else {
            let inserted = store
                .insert_recipe(recipe)
                .with_context(|| format!("Failed to import recipe '{}'", recipe.title))?;
            summary.ingredients_created += inserted.ingredients_created;
        }
        summary.recipes_imported += 1;
    }

    info!(
        parsed = summary.recipes_parsed,
        imported = summary.recipes_imported,
        skipped = summary.recipes_skipped,
        dry_run,
        "recipe import finished"
    );
    Ok(summary)
}
