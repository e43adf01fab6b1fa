use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::client::{ApiClient, Debouncer, Fetched};
use eatthis_core::controller::SearchController;
use eatthis_core::filters::RecipeFilters;
use eatthis_core::models::IngredientSuggestion;
use eatthis_core::normalize::normalize_ingredient_name;
use eatthis_core::service::{DEFAULT_AUTOCOMPLETE_LIMIT, RecipeService};

use super::helpers::{json_error, print_card_table, print_json, print_suggestion_table};

pub(crate) async fn cmd_search(
    service: &RecipeService,
    remote: Option<&ApiClient>,
    ingredients: &[String],
    filters: RecipeFilters,
    limit: usize,
    json: bool,
) -> Result<()> {
    let mut controller = SearchController::new(limit);
    controller.set_filters(filters);
    let Some(request) = controller.set_ingredients(ingredients) else {
        bail!("Give at least one ingredient to search with");
    };

    let outcome = match remote {
        Some(client) => client
            .search(&request.ingredients, request.limit)
            .await
            .into_result(),
        None => service
            .search(&request.ingredients, request.limit)
            .map_err(|e| format!("{e:#}")),
    };
    controller.complete_search(outcome);

    if let Some(message) = controller.error() {
        if json {
            println!("{}", json_error(message));
        } else {
            eprintln!("Search failed: {message}");
        }
        process::exit(1);
    }

    let visible = controller.visible();
    if visible.is_empty() {
        if json {
            println!("[]");
        } else if controller.all_results().is_empty() {
            eprintln!("No recipes found for {}", request.ingredients.join(", "));
        } else {
            let total = controller.all_results().len();
            eprintln!("{total} recipes matched, but none pass the filters");
        }
        process::exit(2);
    }

    if json {
        print_json(visible)?;
    } else {
        print_card_table(visible, controller.ingredients());
        if !controller.filters().is_empty() {
            let shown = visible.len();
            let total = controller.all_results().len();
            eprintln!("Showing {shown} of {total} matches (diet: {})", controller.filters().diet);
        }
    }
    Ok(())
}

fn report_suggestions(query: &str, fetched: &Fetched<IngredientSuggestion>, json: bool) {
    if let Some(message) = &fetched.error {
        if json {
            println!("{}", json_error(message));
        } else {
            eprintln!("Warning: suggestions unavailable for '{query}': {message}");
        }
        return;
    }
    if json {
        if let Err(e) = print_json(&fetched.items) {
            warn!("failed to print suggestions: {e:#}");
        }
    } else if fetched.items.is_empty() {
        eprintln!("No ingredients match '{query}'");
    } else {
        print_suggestion_table(&fetched.items);
    }
}

pub(crate) async fn cmd_suggest(
    service: &RecipeService,
    remote: Option<&ApiClient>,
    query: &str,
    json: bool,
) -> Result<()> {
    let fetched = match remote {
        Some(client) => client.autocomplete(query).await,
        None => Fetched {
            items: service.autocomplete(query, DEFAULT_AUTOCOMPLETE_LIMIT)?,
            error: None,
        },
    };
    report_suggestions(query, &fetched, json);
    if fetched.items.is_empty() {
        process::exit(2);
    }
    Ok(())
}

/// Read one query per line from stdin and print suggestions for each line
/// that is not superseded within the debounce window.
pub(crate) async fn cmd_suggest_watch(client: ApiClient, json: bool) -> Result<()> {
    let client = Arc::new(client);
    let debouncer = Debouncer::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = Vec::new();

    if !json {
        eprintln!("Type an ingredient per line, Ctrl+D to stop.");
    }
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let client = Arc::clone(&client);
        let debouncer = debouncer.clone();
        pending.push(tokio::spawn(async move {
            let Some(query) = debouncer.settle(line).await else {
                return;
            };
            let fetched = client.autocomplete(&query).await;
            report_suggestions(&query, &fetched, json);
        }));
    }

    for handle in pending {
        if let Err(e) = handle.await {
            warn!("suggestion task failed: {e}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_normalize(names: &[String], json: bool) -> Result<()> {
    #[derive(Serialize, Tabled)]
    struct Normalized {
        #[tabled(rename = "Input")]
        input: String,
        #[tabled(rename = "Normalized")]
        normalized: String,
    }

    let rows: Vec<Normalized> = names
        .iter()
        .map(|name| Normalized {
            input: name.clone(),
            normalized: normalize_ingredient_name(name),
        })
        .collect();

    if json {
        print_json(&rows)?;
    } else {
        println!("{}", Table::new(&rows).with(Style::rounded()));
    }
    Ok(())
}
