use anyhow::{Result, bail};
use serde::Serialize;
use std::process;

use eatthis_core::diet::{self, DietProfile};
use eatthis_core::models::{RecipeDetail, TimerStats};
use eatthis_core::service::RecipeService;

use super::helpers::{
    diet_tags, format_difficulty, format_minutes, format_seconds, print_card_table, print_json,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecipeView {
    #[serde(flatten)]
    detail: RecipeDetail,
    diet: DietProfile,
    timer: TimerStats,
}

pub(crate) fn cmd_recipe_show(service: &RecipeService, id: i64, json: bool) -> Result<()> {
    let Some(detail) = service.recipe_detail(id)? else {
        bail!("Recipe {id} not found");
    };
    let diet = diet::classify(&detail.ingredients, &detail.title);
    let timer = service.time_stats(id)?;

    if json {
        return print_json(&RecipeView {
            detail,
            diet,
            timer,
        });
    }

    println!("{} (id: {})", detail.title, detail.id);
    if let Some(description) = &detail.description {
        println!("{description}");
    }
    println!(
        "Time: {}  Difficulty: {}  Diet: {}",
        format_minutes(detail.time_min),
        format_difficulty(detail.difficulty),
        diet_tags(diet),
    );
    if let Some(avg) = timer.average_time_seconds {
        println!(
            "Cooks take {} on average ({} timed)",
            format_seconds(avg),
            timer.count
        );
    }

    println!("\nIngredients:");
    for ingredient in &detail.ingredients {
        println!("  - {ingredient}");
    }
    if !detail.steps.is_empty() {
        println!("\nSteps:");
        for (i, step) in detail.steps.iter().enumerate() {
            println!("  {}. {step}", i + 1);
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_batch(service: &RecipeService, ids: &[i64], json: bool) -> Result<()> {
    let cards = service.recipes_by_ids(ids)?;
    if cards.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
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

pub(crate) fn cmd_timer_record(
    service: &RecipeService,
    id: i64,
    seconds: f64,
    json: bool,
) -> Result<()> {
    let stats = service.record_time(id, seconds)?;
    if json {
        print_json(&stats)
    } else {
        print_stats(id, &stats);
        Ok(())
    }
}

pub(crate) fn cmd_timer_show(service: &RecipeService, id: i64, json: bool) -> Result<()> {
    let stats = service.time_stats(id)?;
    if json {
        print_json(&stats)
    } else {
        print_stats(id, &stats);
        Ok(())
    }
}

fn print_stats(id: i64, stats: &TimerStats) {
    match stats.average_time_seconds {
        Some(avg) => println!(
            "Recipe {id}: average {} over {} sessions",
            format_seconds(avg),
            stats.count
        ),
        None => println!("Recipe {id}: no timed sessions yet"),
    }
}
