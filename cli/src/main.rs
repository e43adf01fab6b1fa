mod client;
mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, fmt};

use crate::client::ApiClient;
use crate::commands::{
    cmd_favorites_add, cmd_favorites_list, cmd_favorites_remove, cmd_favorites_toggle,
    cmd_import, cmd_normalize, cmd_recipe_batch, cmd_recipe_show, cmd_search, cmd_seed,
    cmd_shopping_add, cmd_shopping_clear, cmd_shopping_list, cmd_shopping_remove,
    cmd_shopping_toggle, cmd_suggest, cmd_suggest_watch, cmd_timer_record, cmd_timer_show,
};
use crate::config::Config;
use eatthis_core::filters::{DietFilter, DifficultyFilter, RecipeFilters, TimeFilter};
use eatthis_core::service::{DEFAULT_SEARCH_LIMIT, RecipeService};

#[derive(Parser)]
#[command(
    name = "eatthis",
    version,
    about = "Find recipes from the ingredients you already have",
    long_about = "\n\n   ___  __ _| |_| |_| |__ (_)___
  / _ \\/ _` | __| __| '_ \\| / __|
 |  __/ (_| | |_| |_| | | | \\__ \\
  \\___|\\__,_|\\__|\\__|_| |_|_|___/
     cook what's in the fridge.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find recipes that use the given ingredients
    Search {
        /// Ingredients you have (free text, e.g. "2 œufs" "tomates")
        #[arg(required = true)]
        ingredients: Vec<String>,
        /// Cooking time: all, fast (<15 min), medium (15-30), slow (>30)
        #[arg(long, default_value = "all")]
        time: TimeFilter,
        /// Difficulty: all, 1/easy, 2/medium, 3/hard
        #[arg(long, default_value = "all")]
        difficulty: DifficultyFilter,
        /// Diet: all, vegetarian, vegan, gluten-free
        #[arg(long, default_value = "all")]
        diet: DietFilter,
        /// Maximum number of matches to fetch
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
        /// Query a running server instead of the local database
        #[arg(long, value_name = "URL")]
        remote: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest ingredient names for a partial query
    Suggest {
        /// Partial ingredient name (at least 2 characters)
        #[arg(required_unless_present = "watch")]
        query: Option<String>,
        /// Read queries from stdin, one per line, with debouncing
        #[arg(long, requires = "remote")]
        watch: bool,
        /// Query a running server instead of the local database
        #[arg(long, value_name = "URL")]
        remote: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how ingredient phrases are normalized for matching
    Normalize {
        /// Ingredient phrases
        #[arg(required = true)]
        names: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Record and read cooking times
    Timer {
        #[command(subcommand)]
        command: TimerCommands,
    },
    /// Manage favorite recipes
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },
    /// Manage the shopping list
    Shopping {
        #[command(subcommand)]
        command: ShoppingCommands,
    },
    /// Insert the demo recipes into the local database
    Seed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import recipes from a JSON file
    Import {
        /// Path to a JSON array of recipes
        file: PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Insert the demo recipes before serving
        #[arg(long)]
        seed: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Show a recipe with its ingredients and steps
    Show {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show several recipes by ID, in the given order
    Batch {
        /// Recipe IDs
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TimerCommands {
    /// Record how long a recipe took
    Record {
        /// Recipe ID
        id: i64,
        /// Elapsed time in seconds
        seconds: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the average cooking time of a recipe
    Show {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FavoritesCommands {
    /// List favorite recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a recipe to favorites
    Add {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a recipe from favorites
    Remove {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add or remove a recipe depending on its current state
    Toggle {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ShoppingCommands {
    /// Show the shopping list
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add items, or every ingredient of a recipe with --recipe
    Add {
        /// Item names
        names: Vec<String>,
        /// Recipe the items are for
        #[arg(long, value_name = "ID")]
        recipe: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check or uncheck an item
    Toggle {
        /// Item ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an item
    Remove {
        /// Item ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every item
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn remote_client(remote: Option<&str>) -> Result<Option<ApiClient>> {
    remote.map(ApiClient::new).transpose()
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    if let Commands::Normalize { names, json } = &cli.command {
        return cmd_normalize(names, *json);
    }

    let config = Config::load()?;
    let service = RecipeService::open(&config.db_path)?;

    match cli.command {
        Commands::Search {
            ingredients,
            time,
            difficulty,
            diet,
            limit,
            remote,
            json,
        } => {
            let client = remote_client(remote.as_deref())?;
            let filters = RecipeFilters {
                time,
                difficulty,
                diet,
            };
            cmd_search(&service, client.as_ref(), &ingredients, filters, limit, json).await
        }
        Commands::Suggest {
            query,
            watch,
            remote,
            json,
        } => {
            let client = remote_client(remote.as_deref())?;
            match (watch, client, query) {
                (true, Some(client), _) => cmd_suggest_watch(client, json).await,
                (_, client, Some(query)) => cmd_suggest(&service, client.as_ref(), &query, json).await,
                _ => anyhow::bail!("Give a query, or --watch with --remote"),
            }
        }
        Commands::Normalize { .. } => Ok(()),
        Commands::Recipe { command } => match command {
            RecipeCommands::Show { id, json } => cmd_recipe_show(&service, id, json),
            RecipeCommands::Batch { ids, json } => cmd_recipe_batch(&service, &ids, json),
        },
        Commands::Timer { command } => match command {
            TimerCommands::Record { id, seconds, json } => {
                cmd_timer_record(&service, id, seconds, json)
            }
            TimerCommands::Show { id, json } => cmd_timer_show(&service, id, json),
        },
        Commands::Favorites { command } => match command {
            FavoritesCommands::List { json } => {
                cmd_favorites_list(&service, &config.storage_dir, json)
            }
            FavoritesCommands::Add { id, json } => {
                cmd_favorites_add(&service, &config.storage_dir, id, json)
            }
            FavoritesCommands::Remove { id, json } => {
                cmd_favorites_remove(&config.storage_dir, id, json)
            }
            FavoritesCommands::Toggle { id, json } => {
                cmd_favorites_toggle(&service, &config.storage_dir, id, json)
            }
        },
        Commands::Shopping { command } => match command {
            ShoppingCommands::List { json } => cmd_shopping_list(&config.storage_dir, json),
            ShoppingCommands::Add {
                names,
                recipe,
                json,
            } => cmd_shopping_add(&service, &config.storage_dir, &names, recipe, json),
            ShoppingCommands::Toggle { id, json } => {
                cmd_shopping_toggle(&config.storage_dir, &id, json)
            }
            ShoppingCommands::Remove { id, json } => {
                cmd_shopping_remove(&config.storage_dir, &id, json)
            }
            ShoppingCommands::Clear { json } => cmd_shopping_clear(&config.storage_dir, json),
        },
        Commands::Seed { json } => cmd_seed(&service, json),
        Commands::Import {
            file,
            dry_run,
            json,
        } => cmd_import(&service, &file, dry_run, json),
        Commands::Serve { port, bind, seed } => {
            if seed {
                service.seed_demo()?;
            }
            let (admin_token, new_admin_token) = config.load_or_create_admin_token()?;
            server::start_server(service, port, &bind, &admin_token, new_admin_token).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_filters_parse_from_flags() {
        let cli = Cli::try_parse_from([
            "eatthis", "search", "riz", "tomates", "--time", "fast", "--difficulty", "2", "--diet",
            "vegan",
        ])
        .unwrap();
        let Commands::Search {
            ingredients,
            time,
            difficulty,
            diet,
            limit,
            ..
        } = cli.command
        else {
            panic!("expected search");
        };
        assert_eq!(ingredients, vec!["riz", "tomates"]);
        assert_eq!(time, TimeFilter::Fast);
        assert_eq!(difficulty, "medium".parse::<DifficultyFilter>().unwrap());
        assert_eq!(diet, "vegan".parse::<DietFilter>().unwrap());
        assert_eq!(limit, DEFAULT_SEARCH_LIMIT);
    }

    #[test]
    fn search_rejects_unknown_filter() {
        assert!(Cli::try_parse_from(["eatthis", "search", "riz", "--time", "forever"]).is_err());
    }

    #[test]
    fn suggest_watch_requires_remote() {
        assert!(Cli::try_parse_from(["eatthis", "suggest", "--watch"]).is_err());
        assert!(
            Cli::try_parse_from(["eatthis", "suggest", "--watch", "--remote", "http://x"]).is_ok()
        );
    }
}
