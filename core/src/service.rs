use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;

use crate::calendar::{DayAgenda, MealScheduler, MonthGrid, YearMonth};
use crate::db::Database;
use crate::models::{
    MealType, MealsByType, NewRecipe, NewScheduledMeal, Recipe, RecipeForm, ScheduledMeal,
};

/// The recipes a fresh planner starts out with.
const SAMPLE_RECIPES: &[(&str, &str, &[&str], &str)] = &[
    (
        "Spaghetti Carbonara",
        "Classic Italian pasta dish with eggs, cheese, pancetta, and black pepper",
        &["Spaghetti", "Eggs", "Parmesan", "Pancetta", "Black Pepper"],
        "1. Cook pasta\n2. Fry pancetta\n3. Mix eggs and cheese\n4. Combine all ingredients",
    ),
    (
        "Chicken Curry",
        "Spicy Indian curry with tender chicken pieces",
        &["Chicken", "Curry Powder", "Coconut Milk", "Onions", "Garlic"],
        "1. Marinate chicken\n2. Cook onions and garlic\n3. Add spices\n4. Simmer with coconut milk",
    ),
    (
        "Chocolate Cake",
        "Rich and moist chocolate cake",
        &["Flour", "Cocoa Powder", "Sugar", "Eggs", "Butter"],
        "1. Mix dry ingredients\n2. Cream butter and sugar\n3. Add eggs\n4. Bake at 350°F",
    ),
];

/// Owns both stores. Every consumer (CLI commands, HTTP handlers) reads and
/// mutates recipes and scheduled meals through this one object.
pub struct PlannerService {
    db: Database,
}

impl PlannerService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    // --- Recipes ---

    pub fn add_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let recipe = self.db.insert_recipe(recipe)?;
        tracing::info!(id = recipe.id, name = %recipe.name, "recipe created");
        Ok(recipe)
    }

    /// Create a recipe from raw form input, ingredients one per line.
    pub fn add_recipe_from_form(&self, form: RecipeForm) -> Result<Recipe> {
        let recipe = form.into_new_recipe()?;
        self.add_recipe(&recipe)
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.db.list_recipes()
    }

    pub fn get_recipe(&self, id: i64) -> Result<Option<Recipe>> {
        self.db.get_recipe(id)
    }

    /// Insert the sample recipes when the recipe store is empty. Returns the
    /// recipes inserted, which is nothing if any recipe already exists.
    pub fn seed_sample_recipes(&self) -> Result<Vec<Recipe>> {
        let samples = SAMPLE_RECIPES
            .iter()
            .map(|(name, description, ingredients, instructions)| {
                NewRecipe::new(name, description, ingredients.iter(), instructions)
            })
            .collect::<Result<Vec<_>>>()?;
        let seeded = self.db.insert_recipes_if_empty(&samples)?;
        if !seeded.is_empty() {
            tracing::info!(count = seeded.len(), "seeded sample recipes");
        }
        Ok(seeded)
    }

    // --- Scheduled meals ---

    /// Append a scheduled meal. `recipe_id` is not checked against the
    /// recipe store.
    pub fn add_scheduled_meal(
        &self,
        recipe_id: i64,
        date: NaiveDate,
        meal_type: MealType,
    ) -> Result<ScheduledMeal> {
        let meal = self.db.insert_scheduled_meal(&NewScheduledMeal {
            recipe_id,
            date,
            meal_type,
        })?;
        tracing::info!(id = meal.id, recipe_id, %date, %meal_type, "meal scheduled");
        Ok(meal)
    }

    /// Returns whether a meal was removed; an unknown id is a no-op.
    pub fn remove_scheduled_meal(&self, id: i64) -> Result<bool> {
        let removed = self.db.delete_scheduled_meal(id)?;
        if removed {
            tracing::info!(id, "scheduled meal removed");
        }
        Ok(removed)
    }

    pub fn list_scheduled_meals(&self) -> Result<Vec<ScheduledMeal>> {
        self.db.list_scheduled_meals()
    }

    pub fn list_for_date(&self, date: NaiveDate) -> Result<Vec<ScheduledMeal>> {
        self.db.get_scheduled_meals_for_date(date)
    }

    pub fn list_for_date_grouped(&self, date: NaiveDate) -> Result<MealsByType> {
        Ok(MealsByType::from_meals(self.list_for_date(date)?))
    }

    pub fn list_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ScheduledMeal>> {
        self.db.get_scheduled_meals_between(start, end)
    }

    // --- Calendar ---

    pub fn month_grid(&self, month: YearMonth) -> Result<MonthGrid> {
        let meals = self.list_between(month.first_day(), month.last_day())?;
        Ok(MonthGrid::build(month, &meals))
    }

    pub fn day_agenda(&self, date: NaiveDate) -> Result<DayAgenda> {
        let grouped = self.list_for_date_grouped(date)?;
        let recipes = self.list_recipes()?;
        Ok(DayAgenda::build(date, &grouped, &recipes))
    }
}

impl MealScheduler for PlannerService {
    fn add_scheduled_meal(
        &self,
        recipe_id: i64,
        date: NaiveDate,
        meal_type: MealType,
    ) -> Result<ScheduledMeal> {
        PlannerService::add_scheduled_meal(self, recipe_id, date, meal_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarView, UNKNOWN_RECIPE};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tea_form() -> RecipeForm {
        RecipeForm {
            name: "Tea".to_string(),
            description: "desc".to_string(),
            ingredients: "Water\nTea bag".to_string(),
            instructions: "Boil water".to_string(),
        }
    }

    #[test]
    fn test_add_recipe_assigns_sequential_ids() {
        let svc = PlannerService::new_in_memory().unwrap();

        let first = svc.add_recipe_from_form(tea_form()).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.name, "Tea");
        assert_eq!(first.ingredients, vec!["Water", "Tea bag"]);
        assert_eq!(first.instructions, "Boil water");

        let second = svc.add_recipe_from_form(tea_form()).unwrap();
        assert_eq!(second.id, 2);

        let ids: Vec<i64> = svc.list_recipes().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_add_recipe_rejects_empty_form() {
        let svc = PlannerService::new_in_memory().unwrap();
        let mut form = tea_form();
        form.ingredients = "\n  \n".to_string();
        assert!(svc.add_recipe_from_form(form).is_err());
        assert!(svc.list_recipes().unwrap().is_empty());
    }

    #[test]
    fn test_get_recipe_not_found() {
        let svc = PlannerService::new_in_memory().unwrap();
        assert!(svc.get_recipe(1).unwrap().is_none());
    }

    #[test]
    fn test_seed_sample_recipes_once() {
        let svc = PlannerService::new_in_memory().unwrap();
        let seeded = svc.seed_sample_recipes().unwrap();
        assert_eq!(seeded.len(), 3);
        assert_eq!(seeded[0].name, "Spaghetti Carbonara");
        assert_eq!(seeded[2].id, 3);

        assert!(svc.seed_sample_recipes().unwrap().is_empty());
        assert_eq!(svc.list_recipes().unwrap().len(), 3);
        assert_eq!(svc.add_recipe_from_form(tea_form()).unwrap().id, 4);
    }

    #[test]
    fn test_schedule_and_list_for_date() {
        let svc = PlannerService::new_in_memory().unwrap();
        svc.add_scheduled_meal(1, date(2024, 3, 5), MealType::Lunch)
            .unwrap();

        let on_day = svc.list_for_date(date(2024, 3, 5)).unwrap();
        assert_eq!(on_day.len(), 1);
        assert_eq!(on_day[0].meal_type, MealType::Lunch);
        assert!(svc.list_for_date(date(2024, 3, 6)).unwrap().is_empty());
    }

    #[test]
    fn test_schedule_does_not_require_recipe() {
        let svc = PlannerService::new_in_memory().unwrap();
        let meal = svc
            .add_scheduled_meal(404, date(2024, 3, 5), MealType::Dinner)
            .unwrap();
        assert_eq!(meal.recipe_id, 404);

        let agenda = svc.day_agenda(date(2024, 3, 5)).unwrap();
        assert_eq!(agenda.dinner[0].recipe_name, UNKNOWN_RECIPE);
    }

    #[test]
    fn test_remove_scheduled_meal() {
        let svc = PlannerService::new_in_memory().unwrap();
        let day = date(2024, 3, 5);
        let keep = svc.add_scheduled_meal(1, day, MealType::Lunch).unwrap();
        let gone = svc.add_scheduled_meal(1, day, MealType::Dinner).unwrap();

        assert!(svc.remove_scheduled_meal(gone.id).unwrap());
        let ids: Vec<i64> = svc.list_for_date(day).unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![keep.id]);

        // Unknown id is a no-op
        assert!(!svc.remove_scheduled_meal(gone.id).unwrap());
        assert!(!svc.remove_scheduled_meal(999).unwrap());
        assert_eq!(svc.list_for_date(day).unwrap().len(), 1);
    }

    #[test]
    fn test_list_for_date_grouped() {
        let svc = PlannerService::new_in_memory().unwrap();
        let day = date(2024, 3, 5);
        svc.add_scheduled_meal(1, day, MealType::Dinner).unwrap();
        svc.add_scheduled_meal(2, day, MealType::Breakfast).unwrap();
        svc.add_scheduled_meal(3, day, MealType::Dinner).unwrap();
        svc.add_scheduled_meal(4, date(2024, 3, 6), MealType::Lunch)
            .unwrap();

        let grouped = svc.list_for_date_grouped(day).unwrap();
        assert_eq!(grouped.breakfast.len(), 1);
        assert!(grouped.lunch.is_empty());
        let dinner: Vec<i64> = grouped.dinner.iter().map(|m| m.recipe_id).collect();
        assert_eq!(dinner, vec![1, 3]);
    }

    #[test]
    fn test_month_grid_only_counts_month() {
        let svc = PlannerService::new_in_memory().unwrap();
        svc.add_scheduled_meal(1, date(2024, 2, 29), MealType::Lunch)
            .unwrap();
        svc.add_scheduled_meal(1, date(2024, 3, 1), MealType::Lunch)
            .unwrap();
        svc.add_scheduled_meal(1, date(2024, 3, 1), MealType::Breakfast)
            .unwrap();

        let grid = svc.month_grid(YearMonth::new(2024, 3).unwrap()).unwrap();
        let total: usize = grid.day_cells().map(|c| c.meal_count).sum();
        assert_eq!(total, 2);
        let first = grid.day_cells().next().unwrap();
        assert_eq!(first.counts.breakfast, 1);
        assert_eq!(first.counts.lunch, 1);
    }

    #[test]
    fn test_calendar_dialog_against_service() {
        let svc = PlannerService::new_in_memory().unwrap();
        svc.seed_sample_recipes().unwrap();
        let recipes = svc.list_recipes().unwrap();

        let mut view = CalendarView::new(date(2024, 3, 1));
        view.open_dialog(date(2024, 3, 5), &recipes);
        view.choose_meal_type(MealType::Lunch);
        let meal = view.confirm(&svc).unwrap().unwrap();

        assert_eq!(meal.id, 1);
        assert_eq!(meal.recipe_id, 1);
        let agenda = svc.day_agenda(date(2024, 3, 5)).unwrap();
        assert_eq!(agenda.lunch[0].recipe_name, "Spaghetti Carbonara");
    }
}
