use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use eatthis_core::import::parse_recipes_json;
use eatthis_core::service::RecipeService;

use super::helpers::print_json;

pub(crate) fn cmd_seed(service: &RecipeService, json: bool) -> Result<()> {
    let summary = service.seed_demo()?;
    if json {
        return print_json(&summary);
    }
    println!(
        "Seeded {} demo recipe(s), {} already present",
        summary.inserted, summary.skipped
    );
    Ok(())
}

pub(crate) fn cmd_import(service: &RecipeService, file: &Path, dry_run: bool, json: bool) -> Result<()> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    let recipes = parse_recipes_json(reader)?;
    let summary = service.import_recipes(&recipes, dry_run)?;

    if json {
        return print_json(&summary);
    }

    let prefix = if dry_run { "Dry run: would import" } else { "Imported" };
    println!(
        "{prefix} {} of {} recipe(s), {} skipped (title already present)",
        summary.recipes_imported, summary.recipes_parsed, summary.recipes_skipped
    );
    println!("New ingredients: {}", summary.ingredients_created);
    Ok(())
}
