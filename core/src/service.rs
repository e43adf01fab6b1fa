use std::collections::HashSet;
use std::path::Path;

use anyhow::{Result, bail};
use tracing::debug;

use crate::db::{Database, InsertedRecipe};
use crate::filters::rank_cards;
use crate::import;
use crate::models::{
    ImportSummary, IngredientSuggestion, NewRecipe, RecipeCard, RecipeDetail, TimerStats,
    validate_time_seconds,
};
use crate::normalize::normalize_ingredient_name;
use crate::seed::{self, SeedSummary};

pub const MIN_AUTOCOMPLETE_CHARS: usize = 2;
pub const DEFAULT_AUTOCOMPLETE_LIMIT: usize = 20;
pub const DEFAULT_SEARCH_LIMIT: usize = crate::controller::DEFAULT_SEARCH_LIMIT;

/// Data-layer operations the service relies on.
///
/// [`Database`] is the production implementation. Every method is a single
/// round trip to the store, so callers can reason about when the store is hit.
pub trait RecipeStore: Send {
    fn autocomplete_ingredients(&self, query: &str, limit: usize) -> Result<Vec<IngredientSuggestion>>;
    /// `names` are already normalized.
    fn match_recipes_by_names(&self, names: &[String], limit: usize) -> Result<Vec<RecipeCard>>;
    fn get_recipe_detail(&self, id: i64) -> Result<Option<RecipeDetail>>;
    fn get_recipe_cards_by_ids(&self, ids: &[i64]) -> Result<Vec<RecipeCard>>;
    fn recipe_exists(&self, id: i64) -> Result<bool>;
    fn recipe_exists_by_title(&self, title: &str) -> Result<bool>;
    fn ingredient_exists(&self, name: &str) -> Result<bool>;
    fn insert_recipe(&self, recipe: &NewRecipe) -> Result<InsertedRecipe>;
    fn record_recipe_time(&self, id: i64, time_seconds: i64) -> Result<()>;
    fn get_recipe_time_stats(&self, id: i64) -> Result<TimerStats>;
}

impl RecipeStore for Database {
    fn autocomplete_ingredients(&self, query: &str, limit: usize) -> Result<Vec<IngredientSuggestion>> {
        Database::autocomplete_ingredients(self, query, limit)
    }

    fn match_recipes_by_names(&self, names: &[String], limit: usize) -> Result<Vec<RecipeCard>> {
        Database::match_recipes_by_names(self, names, limit)
    }

    fn get_recipe_detail(&self, id: i64) -> Result<Option<RecipeDetail>> {
        Database::get_recipe_detail(self, id)
    }

    fn get_recipe_cards_by_ids(&self, ids: &[i64]) -> Result<Vec<RecipeCard>> {
        Database::get_recipe_cards_by_ids(self, ids)
    }

    fn recipe_exists(&self, id: i64) -> Result<bool> {
        Database::recipe_exists(self, id)
    }

    fn recipe_exists_by_title(&self, title: &str) -> Result<bool> {
        Database::recipe_exists_by_title(self, title)
    }

    fn ingredient_exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_ingredient_by_name(name)?.is_some())
    }

    fn insert_recipe(&self, recipe: &NewRecipe) -> Result<InsertedRecipe> {
        Database::insert_recipe(self, recipe)
    }

    fn record_recipe_time(&self, id: i64, time_seconds: i64) -> Result<()> {
        Database::record_recipe_time(self, id, time_seconds)
    }

    fn get_recipe_time_stats(&self, id: i64) -> Result<TimerStats> {
        Database::get_recipe_time_stats(self, id)
    }
}

/// Normalize a raw ingredient query: blanks dropped, duplicates after
/// normalization removed, first occurrence order kept.
#[must_use]
pub fn normalize_query(ingredients: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ingredients
        .iter()
        .map(|raw| normalize_ingredient_name(raw))
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Cache key for a search: sorted normalized names and the limit.
#[must_use]
pub fn search_cache_key(normalized: &[String], limit: usize) -> String {
    let mut sorted = normalized.to_vec();
    sorted.sort();
    format!("{}:{limit}", sorted.join(","))
}

pub struct RecipeService {
    store: Box<dyn RecipeStore>,
}

impl RecipeService {
    pub fn new(store: impl RecipeStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open(db_path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    // --- Search ---

    /// Queries shorter than two characters after trimming return nothing
    /// without touching the store.
    pub fn autocomplete(&self, query: &str, limit: usize) -> Result<Vec<IngredientSuggestion>> {
        let trimmed = query.trim();
        if trimmed.chars().count() < MIN_AUTOCOMPLETE_CHARS || limit == 0 {
            return Ok(Vec::new());
        }
        self.store.autocomplete_ingredients(trimmed, limit)
    }

    /// Ranked cards for a raw ingredient list. An empty list is an error; a
    /// list that normalizes to nothing yields no results without a store call.
    pub fn search(&self, ingredients: &[String], limit: usize) -> Result<Vec<RecipeCard>> {
        if ingredients.is_empty() {
            bail!("ingredients must be a non-empty array");
        }
        let normalized = normalize_query(ingredients);
        self.search_normalized(&normalized, limit)
    }

    pub fn search_normalized(&self, normalized: &[String], limit: usize) -> Result<Vec<RecipeCard>> {
        if normalized.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        debug!(ingredients = ?normalized, limit, "matching recipes");
        let mut cards = self.store.match_recipes_by_names(normalized, limit)?;
        rank_cards(&mut cards);
        cards.truncate(limit);
        Ok(cards)
    }

    // --- Recipes ---

    pub fn recipe_detail(&self, id: i64) -> Result<Option<RecipeDetail>> {
        self.store.get_recipe_detail(id)
    }

    pub fn recipes_by_ids(&self, ids: &[i64]) -> Result<Vec<RecipeCard>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store.get_recipe_cards_by_ids(ids)
    }

    pub fn recipe_exists(&self, id: i64) -> Result<bool> {
        self.store.recipe_exists(id)
    }

    // --- Timer ---

    /// Record one elapsed-time sample and return the updated statistics.
    pub fn record_time(&self, id: i64, time_seconds: f64) -> Result<TimerStats> {
        let seconds = validate_time_seconds(time_seconds)?;
        if !self.store.recipe_exists(id)? {
            bail!("Recipe {id} not found");
        }
        self.store.record_recipe_time(id, seconds)?;
        self.store.get_recipe_time_stats(id)
    }

    pub fn time_stats(&self, id: i64) -> Result<TimerStats> {
        self.store.get_recipe_time_stats(id)
    }

    // --- Admin ---

    pub fn seed_demo(&self) -> Result<SeedSummary> {
        seed::seed_demo_recipes(self.store.as_ref())
    }

    /// When `dry_run` is true, nothing is written.
    pub fn import_recipes(&self, recipes: &[NewRecipe], dry_run: bool) -> Result<ImportSummary> {
        import::import_recipes(self.store.as_ref(), recipes, dry_run)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::models::Difficulty;

    /// Store that counts calls and serves canned match results.
    #[derive(Default, Clone)]
    struct CountingStore {
        calls: Arc<AtomicUsize>,
        cards: Vec<RecipeCard>,
    }

    impl CountingStore {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl RecipeStore for CountingStore {
        fn autocomplete_ingredients(&self, _query: &str, _limit: usize) -> Result<Vec<IngredientSuggestion>> {
            self.hit();
            Ok(vec![IngredientSuggestion {
                id: 1,
                name: "tomate".to_string(),
            }])
        }
        fn match_recipes_by_names(&self, _names: &[String], _limit: usize) -> Result<Vec<RecipeCard>> {
            self.hit();
            Ok(self.cards.clone())
        }
        fn get_recipe_detail(&self, _id: i64) -> Result<Option<RecipeDetail>> {
            self.hit();
            Ok(None)
        }
        fn get_recipe_cards_by_ids(&self, _ids: &[i64]) -> Result<Vec<RecipeCard>> {
            self.hit();
            Ok(Vec::new())
        }
        fn recipe_exists(&self, _id: i64) -> Result<bool> {
            self.hit();
            Ok(false)
        }
        fn recipe_exists_by_title(&self, _title: &str) -> Result<bool> {
            self.hit();
            Ok(false)
        }
        fn ingredient_exists(&self, _name: &str) -> Result<bool> {
            self.hit();
            Ok(false)
        }
        fn insert_recipe(&self, _recipe: &NewRecipe) -> Result<InsertedRecipe> {
            self.hit();
            bail!("read-only store")
        }
        fn record_recipe_time(&self, _id: i64, _time_seconds: i64) -> Result<()> {
            self.hit();
            Ok(())
        }
        fn get_recipe_time_stats(&self, _id: i64) -> Result<TimerStats> {
            self.hit();
            Ok(TimerStats {
                average_time_seconds: None,
                count: 0,
            })
        }
    }

    fn card(id: i64, score: i64, missing: i64) -> RecipeCard {
        RecipeCard {
            id,
            title: format!("Recette {id}"),
            time_min: Some(10),
            difficulty: Some(Difficulty::Easy),
            have: 1,
            missing,
            score,
            image_url: None,
            missing_ingredients: Vec::new(),
        }
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_short_autocomplete_skips_store() {
        let store = CountingStore::default();
        let calls = Arc::clone(&store.calls);
        let svc = RecipeService::new(store);

        assert!(svc.autocomplete("t", 20).unwrap().is_empty());
        assert!(svc.autocomplete("  t  ", 20).unwrap().is_empty());
        assert!(svc.autocomplete("", 20).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(svc.autocomplete("to", 20).unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_autocomplete_counts_characters_not_bytes() {
        let store = CountingStore::default();
        let calls = Arc::clone(&store.calls);
        let svc = RecipeService::new(store);
        // One character, two bytes
        assert!(svc.autocomplete("œ", 20).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_search_is_rejected_without_store_call() {
        let store = CountingStore::default();
        let calls = Arc::clone(&store.calls);
        let svc = RecipeService::new(store);

        assert!(svc.search(&[], 30).is_err());
        assert!(svc.search(&strings(&["  "]), 30).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_search_reranks_store_results() {
        let store = CountingStore {
            cards: vec![card(1, 3, 0), card(9, 5, 2), card(3, 5, 1)],
            ..CountingStore::default()
        };
        let svc = RecipeService::new(store);
        let ids: Vec<i64> = svc
            .search(&strings(&["riz"]), 30)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![3, 9, 1]);
    }

    #[test]
    fn test_normalize_query_dedups() {
        let normalized = normalize_query(&strings(&["2 œufs", "oeufs", " ", "Riz"]));
        assert_eq!(normalized, vec!["oeufs", "riz"]);
    }

    #[test]
    fn test_search_cache_key() {
        let key = search_cache_key(&strings(&["riz", "oeufs"]), 30);
        assert_eq!(key, "oeufs,riz:30");
    }

    #[test]
    fn test_search_against_database() {
        let svc = RecipeService::open_in_memory().unwrap();
        svc.seed_demo().unwrap();
        let cards = svc.search(&strings(&["3 œufs", "Fromage"]), 30).unwrap();
        assert!(!cards.is_empty());
        assert_eq!(cards[0].title, "Omelette au fromage");
        assert!(cards.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_record_time_validates() {
        let svc = RecipeService::open_in_memory().unwrap();
        let summary = svc.seed_demo().unwrap();
        let id = summary.recipe_ids[0];

        assert!(svc.record_time(id, 0.0).is_err());
        assert!(svc.record_time(9999, 60.0).is_err());

        let stats = svc.record_time(id, 120.4).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.average_time_seconds, Some(120));
    }

    #[test]
    fn test_batch_with_no_ids_skips_store() {
        let store = CountingStore::default();
        let calls = Arc::clone(&store.calls);
        let svc = RecipeService::new(store);
        assert!(svc.recipes_by_ids(&[]).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
