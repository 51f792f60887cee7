use anyhow::{Result, bail};
use chrono::NaiveDate;
use std::process;

use mealplan_core::calendar::CalendarView;
use mealplan_core::models::{MealType, Recipe, ScheduledMeal, validate_meal_type};
use mealplan_core::service::PlannerService;

use super::helpers::{json_error, parse_date};
use super::require_recipe;

pub(crate) fn cmd_schedule(
    svc: &PlannerService,
    recipe_id: Option<i64>,
    date: Option<String>,
    meal: &str,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let meal_type = validate_meal_type(meal)?;
    let recipes = svc.list_recipes()?;
    if let Some(id) = recipe_id {
        require_recipe(svc, id, json)?;
    }

    let scheduled = schedule_with_dialog(svc, &recipes, recipe_id, date, meal_type)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scheduled)?);
    } else {
        let name = recipes
            .iter()
            .find(|r| r.id == scheduled.recipe_id)
            .map_or("?", |r| r.name.as_str());
        println!(
            "Scheduled {name} for {meal_type} on {date} (entry {})",
            scheduled.id
        );
    }
    Ok(())
}

/// Run the calendar's add-meal dialog: the first of `recipes` is preselected
/// unless `recipe_id` picks another.
fn schedule_with_dialog(
    svc: &PlannerService,
    recipes: &[Recipe],
    recipe_id: Option<i64>,
    date: NaiveDate,
    meal_type: MealType,
) -> Result<ScheduledMeal> {
    let mut view = CalendarView::new(date);
    view.open_dialog(date, recipes);
    if let Some(id) = recipe_id {
        view.choose_recipe(id);
    }
    view.choose_meal_type(meal_type);

    match view.confirm(svc)? {
        Some(scheduled) => Ok(scheduled),
        None => {
            view.cancel();
            bail!("No recipes to schedule. Create one with: mealplan recipe create")
        }
    }
}

pub(crate) fn cmd_unschedule(svc: &PlannerService, id: i64, json: bool) -> Result<()> {
    if svc.remove_scheduled_meal(id)? {
        if json {
            println!("{}", serde_json::json!({ "deleted": id }));
        } else {
            println!("Removed scheduled meal {id}");
        }
        Ok(())
    } else {
        if json {
            println!("{}", json_error(&format!("Scheduled meal {id} not found")));
        } else {
            eprintln!("Scheduled meal {id} not found");
        }
        process::exit(2);
    }
}
