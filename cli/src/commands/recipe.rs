use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplan_core::calendar::CalendarView;
use mealplan_core::models::{Recipe, RecipeForm, validate_meal_type};
use mealplan_core::service::PlannerService;

use super::helpers::{parse_date, truncate};
use super::require_recipe;

pub(crate) fn cmd_recipe_list(svc: &PlannerService, json: bool) -> Result<()> {
    let recipes = svc.list_recipes()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }

    if recipes.is_empty() {
        println!("No recipes yet.");
        println!("Create one with: mealplan recipe create <name> ... or add samples with: mealplan recipe seed");
        return Ok(());
    }

    print_recipe_table(&recipes);
    Ok(())
}

pub(crate) fn cmd_recipe_show(svc: &PlannerService, id: i64, json: bool) -> Result<()> {
    let recipe = require_recipe(svc, id, json)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
        return Ok(());
    }

    let name = &recipe.name;
    println!("{name} (id: {id})");
    println!("{}\n", recipe.description);
    println!("Ingredients:");
    for ingredient in &recipe.ingredients {
        println!("  - {ingredient}");
    }
    println!("\nInstructions:");
    for line in recipe.instructions.lines() {
        println!("  {line}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_create(
    svc: &PlannerService,
    name: &str,
    description: &str,
    ingredients_text: Option<&str>,
    ingredient: &[String],
    instructions: &str,
    json: bool,
) -> Result<()> {
    let recipe = svc.add_recipe_from_form(recipe_form(
        name,
        description,
        ingredients_text,
        ingredient,
        instructions,
    ))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        let id = recipe.id;
        let count = recipe.ingredients.len();
        println!("Created recipe: {} (id: {id}, {count} ingredients)", recipe.name);
        println!("Schedule it with: mealplan recipe schedule {id} --date <YYYY-MM-DD> --meal <slot>");
    }
    Ok(())
}

/// Form input as the create command received it: `--ingredients` text first,
/// then each `--ingredient` on its own line.
fn recipe_form(
    name: &str,
    description: &str,
    ingredients_text: Option<&str>,
    ingredient: &[String],
    instructions: &str,
) -> RecipeForm {
    let mut ingredients = ingredients_text.unwrap_or_default().to_string();
    for line in ingredient {
        if !ingredients.is_empty() && !ingredients.ends_with('\n') {
            ingredients.push('\n');
        }
        ingredients.push_str(line);
    }
    RecipeForm {
        name: name.to_string(),
        description: description.to_string(),
        ingredients,
        instructions: instructions.to_string(),
    }
}

/// Schedule from the recipe's own page: the recipe is fixed, only date and
/// meal type are chosen.
pub(crate) fn cmd_recipe_schedule(
    svc: &PlannerService,
    id: i64,
    date: Option<String>,
    meal: &str,
    json: bool,
) -> Result<()> {
    let recipe = require_recipe(svc, id, json)?;
    let date = parse_date(date)?;
    let meal_type = validate_meal_type(meal)?;

    let mut view = CalendarView::new(date);
    view.open_dialog(date, std::slice::from_ref(&recipe));
    view.choose_meal_type(meal_type);
    let Some(scheduled) = view.confirm(svc)? else {
        bail!("Could not schedule recipe {id}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&scheduled)?);
    } else {
        println!(
            "Scheduled {} for {meal_type} on {date} (entry {})",
            recipe.name, scheduled.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_recipe_seed(svc: &PlannerService, json: bool) -> Result<()> {
    let seeded = svc.seed_sample_recipes()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&seeded)?);
    } else if seeded.is_empty() {
        println!("Recipes already exist; nothing to add.");
    } else {
        let count = seeded.len();
        println!("Added {count} sample recipes:");
        for r in &seeded {
            println!("  {}: {}", r.id, r.name);
        }
    }
    Ok(())
}

fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            name: truncate(&r.name, 30),
            description: truncate(&r.description, 50),
            ingredients: r.ingredients.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
