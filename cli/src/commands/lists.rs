use anyhow::{Result, bail};
use serde::Serialize;
use std::path::Path;
use std::process;
use tracing::debug;

use eatthis_core::service::RecipeService;
use eatthis_core::storage::FileStorage;
use eatthis_core::stores::{FavoritesStore, ShoppingListStore};

use super::helpers::{print_card_table, print_json, print_shopping_table};

fn open_favorites(storage_dir: &Path) -> Result<FavoritesStore<FileStorage>> {
    let mut store = FavoritesStore::new(FileStorage::new(storage_dir)?);
    store.subscribe(|ids| debug!(count = ids.len(), "favorites changed"));
    Ok(store)
}

fn open_shopping_list(storage_dir: &Path) -> Result<ShoppingListStore<FileStorage>> {
    let mut store = ShoppingListStore::new(FileStorage::new(storage_dir)?);
    store.subscribe(|items| debug!(count = items.len(), "shopping list changed"));
    Ok(store)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteChange {
    recipe_id: i64,
    favorite: bool,
}

// --- Favorites ---

pub(crate) fn cmd_favorites_list(
    service: &RecipeService,
    storage_dir: &Path,
    json: bool,
) -> Result<()> {
    let ids = open_favorites(storage_dir)?.list();
    let cards = service.recipes_by_ids(&ids)?;
    if cards.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No favorite recipes yet");
        }
        process::exit(2);
    }
    if json {
        print_json(&cards)
    } else {
        print_card_table(&cards, &[]);
        Ok(())
    }
}

pub(crate) fn cmd_favorites_add(
    service: &RecipeService,
    storage_dir: &Path,
    recipe_id: i64,
    json: bool,
) -> Result<()> {
    if !service.recipe_exists(recipe_id)? {
        bail!("Recipe {recipe_id} not found");
    }
    open_favorites(storage_dir)?.add(recipe_id)?;
    report_favorite(recipe_id, true, json)
}

pub(crate) fn cmd_favorites_remove(storage_dir: &Path, recipe_id: i64, json: bool) -> Result<()> {
    open_favorites(storage_dir)?.remove(recipe_id)?;
    report_favorite(recipe_id, false, json)
}

pub(crate) fn cmd_favorites_toggle(
    service: &RecipeService,
    storage_dir: &Path,
    recipe_id: i64,
    json: bool,
) -> Result<()> {
    let mut favorites = open_favorites(storage_dir)?;
    if !favorites.contains(recipe_id) && !service.recipe_exists(recipe_id)? {
        bail!("Recipe {recipe_id} not found");
    }
    let favorite = favorites.toggle(recipe_id)?;
    report_favorite(recipe_id, favorite, json)
}

fn report_favorite(recipe_id: i64, favorite: bool, json: bool) -> Result<()> {
    if json {
        print_json(&FavoriteChange {
            recipe_id,
            favorite,
        })
    } else {
        if favorite {
            println!("Recipe {recipe_id} is in your favorites");
        } else {
            println!("Recipe {recipe_id} is not in your favorites");
        }
        Ok(())
    }
}

// --- Shopping list ---

pub(crate) fn cmd_shopping_list(storage_dir: &Path, json: bool) -> Result<()> {
    let list = open_shopping_list(storage_dir)?;
    let items = list.items();
    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        eprintln!("Shopping list is empty");
        return Ok(());
    }
    print_shopping_table(&items);
    println!("{} left to buy", list.unchecked_count());
    Ok(())
}

/// With `--recipe` and no names, every ingredient of that recipe is added.
pub(crate) fn cmd_shopping_add(
    service: &RecipeService,
    storage_dir: &Path,
    names: &[String],
    recipe_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let mut names = names.to_vec();
    let mut recipe_title = None;
    if let Some(id) = recipe_id {
        let Some(detail) = service.recipe_detail(id)? else {
            bail!("Recipe {id} not found");
        };
        if names.is_empty() {
            names = detail.ingredients;
        }
        recipe_title = Some(detail.title);
    }
    if names.is_empty() {
        bail!("Give item names or --recipe <ID>");
    }

    let mut list = open_shopping_list(storage_dir)?;
    let added = list.add_items(&names, recipe_id, recipe_title.as_deref())?;
    if json {
        print_json(&list.items())
    } else {
        println!("Added {added} item(s), {} left to buy", list.unchecked_count());
        Ok(())
    }
}

pub(crate) fn cmd_shopping_toggle(storage_dir: &Path, item_id: &str, json: bool) -> Result<()> {
    let mut list = open_shopping_list(storage_dir)?;
    let Some(checked) = list.toggle(item_id)? else {
        bail!("No shopping list item with id '{item_id}'");
    };
    if json {
        print_json(&serde_json::json!({ "id": item_id, "checked": checked }))
    } else {
        let state = if checked { "checked" } else { "unchecked" };
        println!("Item {item_id} {state}");
        Ok(())
    }
}

pub(crate) fn cmd_shopping_remove(storage_dir: &Path, item_id: &str, json: bool) -> Result<()> {
    let mut list = open_shopping_list(storage_dir)?;
    if !list.remove(item_id)? {
        bail!("No shopping list item with id '{item_id}'");
    }
    if json {
        print_json(&serde_json::json!({ "id": item_id, "removed": true }))
    } else {
        println!("Removed item {item_id}");
        Ok(())
    }
}

pub(crate) fn cmd_shopping_clear(storage_dir: &Path, json: bool) -> Result<()> {
    open_shopping_list(storage_dir)?.clear()?;
    if json {
        print_json(&serde_json::json!({ "cleared": true }))
    } else {
        println!("Shopping list cleared");
        Ok(())
    }
}
