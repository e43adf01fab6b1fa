//! Demo recipes for a fresh database.

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::models::{Difficulty, NewRecipe};
use crate::service::RecipeStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub recipe_ids: Vec<i64>,
}

struct DemoRecipe {
    title: &'static str,
    description: &'static str,
    steps: &'static [&'static str],
    time_min: i64,
    difficulty: Difficulty,
    ingredients: &'static [&'static str],
}

impl DemoRecipe {
    fn to_new_recipe(&self) -> NewRecipe {
        NewRecipe {
            title: self.title.to_string(),
            description: Some(self.description.to_string()),
            steps: self.steps.iter().map(ToString::to_string).collect(),
            time_min: Some(self.time_min),
            difficulty: Some(self.difficulty),
            image_url: None,
            ingredients: self.ingredients.iter().map(ToString::to_string).collect(),
        }
    }
}

const DEMO_RECIPES: &[DemoRecipe] = &[
    DemoRecipe {
        title: "Omelette aux champignons",
        description: "Une omelette simple et savoureuse",
        steps: &[
            "Casser les œufs dans un bol",
            "Battre les œufs",
            "Faire chauffer une poêle avec un peu de beurre",
            "Verser les œufs battus",
            "Ajouter les champignons",
            "Cuire 3-4 minutes de chaque côté",
        ],
        time_min: 10,
        difficulty: Difficulty::Easy,
        ingredients: &["œufs", "champignons", "beurre", "sel", "poivre"],
    },
    DemoRecipe {
        title: "Pâtes au saumon fumé",
        description: "Un plat rapide et délicieux",
        steps: &[
            "Faire cuire les pâtes dans l'eau bouillante salée",
            "Pendant ce temps, couper le saumon en morceaux",
            "Égoutter les pâtes",
            "Mélanger avec le saumon et la crème",
            "Servir chaud",
        ],
        time_min: 15,
        difficulty: Difficulty::Easy,
        ingredients: &["pâtes", "saumon fumé", "crème fraîche", "sel", "poivre"],
    },
    DemoRecipe {
        title: "Salade César",
        description: "Une salade classique et rafraîchissante",
        steps: &[
            "Laver et couper la laitue",
            "Préparer la sauce César",
            "Mélanger la laitue avec la sauce",
            "Ajouter les croûtons et le parmesan",
            "Servir immédiatement",
        ],
        time_min: 20,
        difficulty: Difficulty::Easy,
        ingredients: &["laitue", "parmesan", "croûtons", "sauce césar"],
    },
    DemoRecipe {
        title: "Omelette au fromage",
        description: "Omelette classique avec du fromage",
        steps: &[
            "Casser 3 œufs dans un bol",
            "Battre les œufs avec du sel et du poivre",
            "Faire chauffer une poêle avec du beurre",
            "Verser les œufs battus",
            "Ajouter le fromage râpé",
            "Plier l'omelette en deux et cuire 2 minutes de plus",
        ],
        time_min: 8,
        difficulty: Difficulty::Easy,
        ingredients: &["œufs", "fromage", "beurre", "sel", "poivre"],
    },
    DemoRecipe {
        title: "Spaghetti à la carbonara",
        description: "Plat italien traditionnel",
        steps: &[
            "Faire cuire les spaghetti dans l'eau bouillante salée",
            "Pendant ce temps, battre les œufs avec le parmesan",
            "Faire revenir les lardons dans une poêle",
            "Égoutter les pâtes et les mélanger avec les lardons",
            "Ajouter le mélange œufs-parmesan hors du feu",
            "Servir immédiatement",
        ],
        time_min: 20,
        difficulty: Difficulty::Medium,
        ingredients: &["spaghetti", "œufs", "lardons", "parmesan", "poivre"],
    },
    DemoRecipe {
        title: "Risotto aux champignons",
        description: "Risotto crémeux aux champignons",
        steps: &[
            "Faire revenir les champignons dans une poêle",
            "Dans une casserole, faire revenir l'oignon",
            "Ajouter le riz et faire nacrer",
            "Ajouter le vin blanc et laisser évaporer",
            "Ajouter le bouillon progressivement en remuant",
            "Ajouter les champignons et le parmesan en fin de cuisson",
        ],
        time_min: 30,
        difficulty: Difficulty::Medium,
        ingredients: &["riz arborio", "champignons", "oignon", "vin blanc", "bouillon", "parmesan"],
    },
    DemoRecipe {
        title: "Salade de tomates et mozzarella",
        description: "Salade fraîche et simple",
        steps: &[
            "Couper les tomates en rondelles",
            "Couper la mozzarella en rondelles",
            "Disposer en alternance sur une assiette",
            "Arroser d'huile d'olive et de vinaigre balsamique",
            "Ajouter du basilic frais",
            "Saler et poivrer",
        ],
        time_min: 10,
        difficulty: Difficulty::Easy,
        ingredients: &[
            "tomates",
            "mozzarella",
            "huile d'olive",
            "vinaigre balsamique",
            "basilic",
            "sel",
            "poivre",
        ],
    },
    DemoRecipe {
        title: "Poulet rôti aux herbes",
        description: "Poulet rôti savoureux",
        steps: &[
            "Préchauffer le four à 200°C",
            "Mélanger les herbes avec de l'huile d'olive",
            "Badigeonner le poulet avec le mélange",
            "Enfourner pour 45 minutes",
            "Vérifier la cuisson",
            "Laisser reposer 10 minutes avant de servir",
        ],
        time_min: 60,
        difficulty: Difficulty::Medium,
        ingredients: &["poulet", "herbes de provence", "huile d'olive", "sel", "poivre"],
    },
];

/// Insert every demo recipe whose title is not already present.
pub fn seed_demo_recipes(store: &dyn RecipeStore) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    for demo in DEMO_RECIPES {
        if store.recipe_exists_by_title(demo.title)? {
            summary.skipped += 1;
            continue;
        }
        let inserted = store.insert_recipe(&demo.to_new_recipe())?;
        summary.inserted += 1;
        summary.recipe_ids.push(inserted.id);
    }
    info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        "seeded demo recipes"
    );
    Ok(summary)
}
