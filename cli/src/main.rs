mod commands;
mod config;
mod logging;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    cmd_calendar, cmd_day, cmd_recipe_create, cmd_recipe_list, cmd_recipe_schedule,
    cmd_recipe_seed, cmd_recipe_show, cmd_schedule, cmd_unschedule,
};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "mealplan",
    version,
    about = "Plan meals on a calendar from your own recipe box",
    long_about = "Plan meals on a calendar from your own recipe box.\n\n\
        Recipes and scheduled meals live in a local SQLite file in your data \
        directory. Use --db or MEALPLAN_DB to point somewhere else, or \
        --ephemeral to keep everything in memory for one run."
)]
struct Cli {
    /// Database file to use (default: data directory, or $MEALPLAN_DB)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Keep recipes and meals in memory only; nothing is written to disk
    #[arg(long, global = true, conflicts_with = "db")]
    ephemeral: bool,
    /// More log output (-v info, -vv debug). `RUST_LOG` overrides this.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a month grid with the meals planned on each day
    Calendar {
        /// Month to show (YYYY-MM, default: current month)
        #[arg(long)]
        month: Option<String>,
        /// Move forward this many months
        #[arg(long, default_value = "0")]
        next: u32,
        /// Move back this many months
        #[arg(long, default_value = "0")]
        prev: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the meals planned for a day, grouped by breakfast, lunch and dinner
    Day {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Schedule a recipe on a date (defaults to the first recipe)
    Schedule {
        /// Recipe ID (default: first recipe)
        recipe_id: Option<i64>,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(short, long)]
        date: Option<String>,
        /// Meal type: breakfast, lunch, dinner
        #[arg(short, long, default_value = "breakfast")]
        meal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a scheduled meal by ID
    Unschedule {
        /// Scheduled meal ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Browse and create recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Add the sample recipes if the recipe list is empty
        #[arg(long)]
        seed: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with its ingredients and instructions
    Show {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new recipe
    Create {
        /// Recipe name
        name: String,
        /// Short description
        #[arg(short, long)]
        description: String,
        /// Ingredients, one per line (blank lines are ignored)
        #[arg(long, required_unless_present = "ingredient")]
        ingredients: Option<String>,
        /// A single ingredient; repeat for more
        #[arg(short, long)]
        ingredient: Vec<String>,
        /// Preparation instructions
        #[arg(long)]
        instructions: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Schedule this recipe on a date
    Schedule {
        /// Recipe ID
        id: i64,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(short, long)]
        date: Option<String>,
        /// Meal type: breakfast, lunch, dinner
        #[arg(short, long, default_value = "breakfast")]
        meal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add the sample recipes if there are no recipes yet
    Seed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, matches!(cli.command, Commands::Serve { .. }));

    if let Err(e) = run(cli).await {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db, cli.ephemeral)?;
    let svc = config.open_service()?;

    match cli.command {
        Commands::Calendar {
            month,
            next,
            prev,
            json,
        } => cmd_calendar(&svc, month.as_deref(), next, prev, json),
        Commands::Day { date, json } => cmd_day(&svc, date, json),
        Commands::Schedule {
            recipe_id,
            date,
            meal,
            json,
        } => cmd_schedule(&svc, recipe_id, date, &meal, json),
        Commands::Unschedule { id, json } => cmd_unschedule(&svc, id, json),
        Commands::Recipe { command } => match command {
            RecipeCommands::List { json } => cmd_recipe_list(&svc, json),
            RecipeCommands::Show { id, json } => cmd_recipe_show(&svc, id, json),
            RecipeCommands::Create {
                name,
                description,
                ingredients,
                ingredient,
                instructions,
                json,
            } => cmd_recipe_create(
                &svc,
                &name,
                &description,
                ingredients.as_deref(),
                &ingredient,
                &instructions,
                json,
            ),
            RecipeCommands::Schedule {
                id,
                date,
                meal,
                json,
            } => cmd_recipe_schedule(&svc, id, date, &meal, json),
            RecipeCommands::Seed { json } => cmd_recipe_seed(&svc, json),
        },
        Commands::Serve { port, bind, seed } => {
            if seed {
                let seeded = svc.seed_sample_recipes()?;
                if !seeded.is_empty() {
                    tracing::info!(count = seeded.len(), "added sample recipes");
                }
            }
            server::start_server(svc, port, &bind).await
        }
    }
}
