use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{
    Difficulty, Ingredient, IngredientSuggestion, NewRecipe, RecipeCard, RecipeDetail, TimerStats,
};
use crate::normalize::{fold_query, normalize_ingredient_name};

pub struct Database {
    conn: Connection,
}

/// Outcome of inserting one recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertedRecipe {
    pub id: i64,
    pub ingredients_created: usize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT,
                    steps TEXT NOT NULL DEFAULT '[]',
                    time_min INTEGER CHECK (time_min IS NULL OR time_min >= 0),
                    difficulty INTEGER CHECK (difficulty IS NULL OR difficulty BETWEEN 1 AND 3),
                    image_url TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
                    PRIMARY KEY (recipe_id, ingredient_id)
                );

                CREATE INDEX IF NOT EXISTS idx_recipes_title ON recipes(title);
                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_ingredient ON recipe_ingredients(ingredient_id);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipe_times (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    time_seconds INTEGER NOT NULL CHECK (time_seconds > 0),
                    recorded_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_recipe_times_recipe ON recipe_times(recipe_id);

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Ingredients ---

    /// `name` must already be normalized. Returns the row and whether it was created.
    pub fn get_or_create_ingredient(&self, name: &str) -> Result<(Ingredient, bool)> {
        if let Some(existing) = self.get_ingredient_by_name(name)? {
            return Ok((existing, false));
        }
        self.conn
            .execute("INSERT INTO ingredients (name) VALUES (?1)", params![name])
            .with_context(|| format!("Failed to insert ingredient '{name}'"))?;
        let id = self.conn.last_insert_rowid();
        Ok((
            Ingredient {
                id,
                name: name.to_string(),
            },
            true,
        ))
    }

    pub fn get_ingredient_by_name(&self, name: &str) -> Result<Option<Ingredient>> {
        let ingredient = self
            .conn
            .query_row(
                "SELECT id, name FROM ingredients WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Ingredient {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(ingredient)
    }

    /// Ingredients whose name contains `query`: prefix matches first, then
    /// shorter names, then alphabetical.
    #[allow(clippy::cast_possible_wrap)]
    pub fn autocomplete_ingredients(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<IngredientSuggestion>> {
        let folded = fold_query(query);
        let escaped = folded
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let contains = format!("%{escaped}%");
        let prefix = format!("{escaped}%");
        let mut stmt = self.conn.prepare(
            "SELECT id, name FROM ingredients
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY CASE WHEN name LIKE ?2 ESCAPE '\\' THEN 0 ELSE 1 END,
                      LENGTH(name),
                      name
             LIMIT ?3",
        )?;
        let suggestions = stmt
            .query_map(params![contains, prefix, limit as i64], |row| {
                Ok(IngredientSuggestion {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(suggestions)
    }

    pub fn count_ingredients(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM ingredients", [], |row| row.get(0))?)
    }

    // --- Recipes ---

    /// Insert a recipe and link its ingredients, creating missing ones.
    /// Ingredient names are normalized; duplicates after normalization are linked once.
    pub fn insert_recipe(&self, recipe: &NewRecipe) -> Result<InsertedRecipe> {
        let now = Local::now().to_rfc3339();
        let steps = serde_json::to_string(&recipe.steps)?;
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO recipes (title, description, steps, time_min, difficulty, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                recipe.title.trim(),
                recipe.description,
                steps,
                recipe.time_min,
                recipe.difficulty.map(Difficulty::tier),
                recipe.image_url,
                now,
            ],
        )
        .with_context(|| format!("Failed to insert recipe '{}'", recipe.title))?;
        let id = self.conn.last_insert_rowid();

        let mut ingredients_created = 0;
        let mut linked = HashSet::new();
        for raw in &recipe.ingredients {
            if raw.trim().is_empty() {
                continue;
            }
            let name = normalize_ingredient_name(raw);
            let (ingredient, created) = self.get_or_create_ingredient(&name)?;
            if created {
                ingredients_created += 1;
            }
            if linked.insert(ingredient.id) {
                tx.execute(
                    "INSERT INTO recipe_ingredients (recipe_id, ingredient_id) VALUES (?1, ?2)",
                    params![id, ingredient.id],
                )?;
            }
        }

        tx.commit()?;
        Ok(InsertedRecipe {
            id,
            ingredients_created,
        })
    }

    pub fn recipe_exists_by_title(&self, title: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE LOWER(title) = LOWER(?1)",
            params![title.trim()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn recipe_exists(&self, id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count_recipes(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?)
    }

    /// Recipes sharing at least one ingredient with `names`, ranked and truncated.
    /// `names` must already be normalized.
    pub fn match_recipes_by_names(&self, names: &[String], limit: usize) -> Result<Vec<RecipeCard>> {
        let wanted: BTreeSet<&str> = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        // Bound as one JSON array: SQLite caps the number of bound variables.
        let wanted_json = serde_json::to_string(&wanted)?;
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.title, r.time_min, r.difficulty, r.image_url,
                    COUNT(*) AS total,
                    SUM(CASE WHEN i.name IN (SELECT value FROM json_each(?1)) THEN 1 ELSE 0 END) AS have
             FROM recipes r
             JOIN recipe_ingredients ri ON ri.recipe_id = r.id
             JOIN ingredients i ON i.id = ri.ingredient_id
             GROUP BY r.id
             HAVING have > 0",
        )?;
        let mut cards = stmt
            .query_map(params![wanted_json], |row| {
                let total: i64 = row.get(5)?;
                let have: i64 = row.get(6)?;
                Ok(RecipeCard {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    time_min: row.get(2)?,
                    difficulty: difficulty_from_row(row, 3)?,
                    have,
                    missing: total - have,
                    score: have * 100 / total,
                    image_url: row.get(4)?,
                    missing_ingredients: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        crate::filters::rank_cards(&mut cards);
        cards.truncate(limit);

        for card in &mut cards {
            card.missing_ingredients = self
                .get_recipe_ingredient_names(card.id)?
                .into_iter()
                .filter(|name| !wanted.contains(name.as_str()))
                .collect();
        }
        Ok(cards)
    }

    /// Distinct ingredient names of a recipe, sorted.
    pub fn get_recipe_ingredient_names(&self, recipe_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT i.name
             FROM recipe_ingredients ri
             JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id = ?1
             ORDER BY i.name",
        )?;
        let names = stmt
            .query_map(params![recipe_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn get_recipe_detail(&self, recipe_id: i64) -> Result<Option<RecipeDetail>> {
        let detail = self
            .conn
            .query_row(
                "SELECT id, title, description, steps, time_min, difficulty, image_url
                 FROM recipes WHERE id = ?1",
                params![recipe_id],
                Self::detail_from_row,
            )
            .optional()?;
        let Some(mut detail) = detail else {
            return Ok(None);
        };
        detail.ingredients = self.get_recipe_ingredient_names(recipe_id)?;
        Ok(Some(detail))
    }

    /// Cards for `ids` in input order with zeroed match statistics. Unknown ids are skipped.
    pub fn get_recipe_cards_by_ids(&self, ids: &[i64]) -> Result<Vec<RecipeCard>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids_json = serde_json::to_string(ids)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, title, time_min, difficulty, image_url
             FROM recipes WHERE id IN (SELECT value FROM json_each(?1))",
        )?;
        let found: HashMap<i64, RecipeCard> = stmt
            .query_map(params![ids_json], |row| {
                Ok(RecipeCard {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    time_min: row.get(2)?,
                    difficulty: difficulty_from_row(row, 3)?,
                    have: 0,
                    missing: 0,
                    score: 0,
                    image_url: row.get(4)?,
                    missing_ingredients: Vec::new(),
                })
            })?
            .map(|card| card.map(|c| (c.id, c)))
            .collect::<Result<_, _>>()?;

        Ok(ids.iter().filter_map(|id| found.get(id).cloned()).collect())
    }

    // --- Timer ---

    pub fn record_recipe_time(&self, recipe_id: i64, time_seconds: i64) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO recipe_times (recipe_id, time_seconds, recorded_at) VALUES (?1, ?2, ?3)",
                params![recipe_id, time_seconds, now],
            )
            .with_context(|| format!("Failed to record time for recipe {recipe_id}"))?;
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn get_recipe_time_stats(&self, recipe_id: i64) -> Result<TimerStats> {
        let (sum, count): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(time_seconds), 0), COUNT(*) FROM recipe_times WHERE recipe_id = ?1",
            params![recipe_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let average_time_seconds = if count == 0 {
            None
        } else {
            Some((sum as f64 / count as f64).round() as i64)
        };
        Ok(TimerStats {
            average_time_seconds,
            count,
        })
    }

    // --- Row mapping helpers ---

    // Expects columns:
    // 0: id, 1: title, 2: description, 3: steps (JSON), 4: time_min,
    // 5: difficulty, 6: image_url
    fn detail_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeDetail> {
        let steps_json: String = row.get(3)?;
        let steps: Vec<String> = serde_json::from_str(&steps_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        Ok(RecipeDetail {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            steps,
            time_min: row.get(4)?,
            difficulty: difficulty_from_row(row, 5)?,
            image_url: row.get(6)?,
            ingredients: Vec::new(),
        })
    }
}

fn difficulty_from_row(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Difficulty>> {
    row.get::<_, Option<u8>>(idx)?
        .map(|tier| {
            Difficulty::try_from(tier)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, e.into()))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(title: &str, ingredients: &[&str]) -> NewRecipe {
        NewRecipe {
            title: title.to_string(),
            description: Some(format!("{title} maison")),
            steps: vec!["Préparer".to_string(), "Servir".to_string()],
            time_min: Some(15),
            difficulty: Some(Difficulty::Easy),
            image_url: None,
            ingredients: ingredients.iter().map(ToString::to_string).collect(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eatthis.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_recipe(&recipe("Omelette", &["oeufs"])).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_recipes().unwrap(), 1);
    }

    #[test]
    fn test_insert_recipe_normalizes_and_dedups_ingredients() {
        let db = Database::open_in_memory().unwrap();
        let inserted = db
            .insert_recipe(&recipe("Omelette", &["3 œufs", "oeufs", "1 pincée sel", " "]))
            .unwrap();
        assert_eq!(inserted.ingredients_created, 2);

        let detail = db.get_recipe_detail(inserted.id).unwrap().unwrap();
        assert_eq!(detail.ingredients, vec!["oeufs", "sel"]);
        assert_eq!(detail.steps, vec!["Préparer", "Servir"]);
        assert_eq!(detail.difficulty, Some(Difficulty::Easy));
    }

    #[test]
    fn test_ingredients_shared_between_recipes() {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(&recipe("Omelette", &["oeufs", "sel"])).unwrap();
        let second = db.insert_recipe(&recipe("Crêpes", &["oeufs", "farine"])).unwrap();
        assert_eq!(second.ingredients_created, 1);
        assert_eq!(db.count_ingredients().unwrap(), 3);
    }

    #[test]
    fn test_get_recipe_detail_missing() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_recipe_detail(42).unwrap().is_none());
    }

    #[test]
    fn test_recipe_exists_by_title_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(&recipe("Salade César", &["laitue"])).unwrap();
        assert!(db.recipe_exists_by_title("salade césar").unwrap());
        assert!(!db.recipe_exists_by_title("Salade niçoise").unwrap());
    }

    #[test]
    fn test_match_counts_and_score() {
        let db = Database::open_in_memory().unwrap();
        let omelette = db
            .insert_recipe(&recipe("Omelette", &["oeufs", "beurre", "sel"]))
            .unwrap();
        db.insert_recipe(&recipe("Riz cantonais", &["riz", "oeufs", "petits pois", "jambon"]))
            .unwrap();
        db.insert_recipe(&recipe("Salade", &["laitue"])).unwrap();

        let cards = db
            .match_recipes_by_names(&names(&["oeufs", "beurre"]), 30)
            .unwrap();
        assert_eq!(cards.len(), 2);

        let first = &cards[0];
        assert_eq!(first.id, omelette.id);
        assert_eq!(first.have, 2);
        assert_eq!(first.missing, 1);
        assert_eq!(first.score, 66);
        assert_eq!(first.missing_ingredients, vec!["sel"]);

        let second = &cards[1];
        assert_eq!(second.have, 1);
        assert_eq!(second.missing, 3);
        assert_eq!(second.score, 25);
        assert_eq!(second.missing_ingredients.len(), 3);
    }

    #[test]
    fn test_match_excludes_zero_overlap_and_truncates() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            db.insert_recipe(&recipe(&format!("Riz {i}"), &["riz"])).unwrap();
        }
        db.insert_recipe(&recipe("Salade", &["laitue"])).unwrap();

        let cards = db.match_recipes_by_names(&names(&["riz"]), 3).unwrap();
        assert_eq!(cards.len(), 3);
        assert!(cards.iter().all(|c| c.have == 1 && c.score == 100));
        // Equal score and missing count fall back to ascending id
        assert!(cards.windows(2).all(|w| w[0].id < w[1].id));

        assert!(db.match_recipes_by_names(&names(&["chocolat"]), 30).unwrap().is_empty());
        assert!(db.match_recipes_by_names(&[], 30).unwrap().is_empty());
    }

    #[test]
    fn test_match_ignores_duplicate_query_names() {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(&recipe("Omelette", &["oeufs", "sel"])).unwrap();
        let cards = db
            .match_recipes_by_names(&names(&["oeufs", "oeufs"]), 30)
            .unwrap();
        assert_eq!(cards[0].have, 1);
        assert_eq!(cards[0].score, 50);
    }

    #[test]
    fn test_autocomplete_ordering() {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(&recipe(
            "Mélange",
            &["tomates cerises", "sauce tomate", "tomate", "riz"],
        ))
        .unwrap();

        let results = db.autocomplete_ingredients("TOM", 20).unwrap();
        let names: Vec<&str> = results.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["tomate", "tomates", "sauce tomate"]);

        let limited = db.autocomplete_ingredients("tom", 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_autocomplete_escapes_wildcards() {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(&recipe("Riz", &["riz"])).unwrap();
        assert!(db.autocomplete_ingredients("%", 20).unwrap().is_empty());
        assert!(db.autocomplete_ingredients("_", 20).unwrap().is_empty());
    }

    #[test]
    fn test_recipe_cards_by_ids_preserves_order() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_recipe(&recipe("A", &["riz"])).unwrap();
        let b = db.insert_recipe(&recipe("B", &["riz"])).unwrap();

        let cards = db.get_recipe_cards_by_ids(&[b.id, 999, a.id]).unwrap();
        let ids: Vec<i64> = cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert!(cards.iter().all(|c| c.have == 0 && c.missing == 0 && c.score == 0));
        assert!(db.get_recipe_cards_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_lookups_accept_more_values_than_bind_limit() {
        let db = Database::open_in_memory().unwrap();
        let r = db.insert_recipe(&recipe("Riz", &["riz"])).unwrap();

        let mut ids: Vec<i64> = (1_000..41_000).collect();
        ids.push(r.id);
        let cards = db.get_recipe_cards_by_ids(&ids).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, r.id);

        let mut wanted: Vec<String> = (0..40_000).map(|i| format!("item{i}")).collect();
        wanted.push("riz".to_string());
        let cards = db.match_recipes_by_names(&wanted, 30).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].have, 1);
    }

    #[test]
    fn test_timer_stats() {
        let db = Database::open_in_memory().unwrap();
        let r = db.insert_recipe(&recipe("Omelette", &["oeufs"])).unwrap();

        let empty = db.get_recipe_time_stats(r.id).unwrap();
        assert_eq!(empty.average_time_seconds, None);
        assert_eq!(empty.count, 0);

        db.record_recipe_time(r.id, 600).unwrap();
        db.record_recipe_time(r.id, 601).unwrap();
        let stats = db.get_recipe_time_stats(r.id).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.average_time_seconds, Some(601));
    }

    #[test]
    fn test_timer_rejects_unknown_recipe() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.record_recipe_time(7, 60).is_err());
    }
}
