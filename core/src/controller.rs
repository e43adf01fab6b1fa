//! Search page state machine.
//!
//! The controller never performs I/O. A query change hands back a
//! [`SearchRequest`] for the caller to execute; the outcome is fed back through
//! [`SearchController::complete_search`].

use crate::filters::{RecipeFilters, apply_filters, rank_cards};
use crate::models::RecipeCard;

pub const DEFAULT_SEARCH_LIMIT: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub ingredients: Vec<String>,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct SearchController {
    ingredients: Vec<String>,
    filters: RecipeFilters,
    limit: usize,
    all_results: Vec<RecipeCard>,
    visible: Vec<RecipeCard>,
    loading: bool,
    error: Option<String>,
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_LIMIT)
    }
}

impl SearchController {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            ingredients: Vec::new(),
            filters: RecipeFilters::default(),
            limit,
            all_results: Vec::new(),
            visible: Vec::new(),
            loading: false,
            error: None,
        }
    }

    #[must_use]
    pub fn ingredients(&self) -> &[String] {
        &self.ingredients
    }

    #[must_use]
    pub fn filters(&self) -> RecipeFilters {
        self.filters
    }

    /// Full ranked result set of the last successful search.
    #[must_use]
    pub fn all_results(&self) -> &[RecipeCard] {
        &self.all_results
    }

    /// Results after the current filters.
    #[must_use]
    pub fn visible(&self) -> &[RecipeCard] {
        &self.visible
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replace the whole query. Blank entries and case-insensitive duplicates are dropped.
    pub fn set_ingredients<I, S>(&mut self, ingredients: I) -> Option<SearchRequest>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ingredients.clear();
        for name in ingredients {
            self.push_unique(name.as_ref());
        }
        self.query_changed()
    }

    /// Returns `None` when the ingredient was blank or already present.
    pub fn add_ingredient(&mut self, name: &str) -> Option<SearchRequest> {
        if !self.push_unique(name) {
            return None;
        }
        self.query_changed()
    }

    /// Returns `None` when nothing was removed or the query became empty.
    pub fn remove_ingredient(&mut self, name: &str) -> Option<SearchRequest> {
        let needle = name.trim().to_lowercase();
        let before = self.ingredients.len();
        self.ingredients.retain(|i| i.to_lowercase() != needle);
        if self.ingredients.len() == before {
            return None;
        }
        self.query_changed()
    }

    /// Feed back the outcome of the last request. A failure leaves no partial results.
    pub fn complete_search(&mut self, outcome: Result<Vec<RecipeCard>, String>) {
        self.loading = false;
        match outcome {
            Ok(mut cards) => {
                rank_cards(&mut cards);
                self.all_results = cards;
                self.error = None;
                self.refilter();
            }
            Err(message) => {
                self.all_results.clear();
                self.visible.clear();
                self.error = Some(message);
            }
        }
    }

    pub fn set_filters(&mut self, filters: RecipeFilters) {
        self.filters = filters;
        self.refilter();
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.limit);
    }

    fn push_unique(&mut self, name: &str) -> bool {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return false;
        }
        let lower = trimmed.to_lowercase();
        if self.ingredients.iter().any(|i| i.to_lowercase() == lower) {
            return false;
        }
        self.ingredients.push(trimmed.to_string());
        true
    }

    fn query_changed(&mut self) -> Option<SearchRequest> {
        if self.ingredients.is_empty() {
            self.all_results.clear();
            self.visible.clear();
            self.loading = false;
            self.error = None;
            return None;
        }
        self.loading = true;
        self.error = None;
        Some(SearchRequest {
            ingredients: self.ingredients.clone(),
            limit: self.limit,
        })
    }

    fn refilter(&mut self) {
        self.visible = apply_filters(&self.all_results, &self.filters, &self.ingredients);
    }
}
