mod calendar;
mod helpers;
mod meal;
mod recipe;

use std::process;

use mealplan_core::models::Recipe;
use mealplan_core::service::PlannerService;

use helpers::json_error;

pub(crate) use calendar::{cmd_calendar, cmd_day};
pub(crate) use meal::{cmd_schedule, cmd_unschedule};
pub(crate) use recipe::{
    cmd_recipe_create, cmd_recipe_list, cmd_recipe_schedule, cmd_recipe_seed, cmd_recipe_show,
};

/// Look up a recipe by id, or report "Recipe not found" and exit with code 2.
pub(super) fn require_recipe(svc: &PlannerService, id: i64, json: bool) -> anyhow::Result<Recipe> {
    if let Some(recipe) = svc.get_recipe(id)? {
        return Ok(recipe);
    }
    if json {
        println!("{}", json_error(&format!("Recipe {id} not found")));
    } else {
        eprintln!("Recipe not found (id {id})");
    }
    process::exit(2);
}
