use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::models::{NewRecipe, NewScheduledMeal, Recipe, ScheduledMeal, validate_meal_type};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        // AUTOINCREMENT keeps ids monotonic: a deleted row's id is never handed out again.
        if version < 1 {
            tracing::info!("creating schema version 1");
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL,
                    ingredients TEXT NOT NULL,
                    instructions TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS scheduled_meals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    recipe_id INTEGER NOT NULL,
                    date TEXT NOT NULL,
                    meal_type TEXT NOT NULL CHECK (meal_type IN ('breakfast', 'lunch', 'dinner')),
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_scheduled_meals_date ON scheduled_meals(date);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    // Columns: id, uuid, name, description, ingredients (JSON array), instructions, created_at
    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        let ingredients_json: String = row.get(4)?;
        let ingredients: Vec<String> = serde_json::from_str(&ingredients_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
        Ok(Recipe {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            ingredients,
            instructions: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    // Columns: id, uuid, recipe_id, date, meal_type, created_at
    fn scheduled_meal_from_row(row: &rusqlite::Row) -> rusqlite::Result<ScheduledMeal> {
        let date_str: String = row.get(3)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        let meal_str: String = row.get(4)?;
        let meal_type = validate_meal_type(&meal_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into())
        })?;
        Ok(ScheduledMeal {
            id: row.get(0)?,
            uuid: row.get(1)?,
            recipe_id: row.get(2)?,
            date,
            meal_type,
            created_at: row.get(5)?,
        })
    }

    // --- Recipes ---

    pub fn insert_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        let ingredients = serde_json::to_string(&recipe.ingredients)?;
        self.conn.execute(
            "INSERT INTO recipes (uuid, name, description, ingredients, instructions, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                uuid,
                recipe.name,
                recipe.description,
                ingredients,
                recipe.instructions,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, name = %recipe.name, "inserted recipe");
        self.get_recipe(id)?
            .with_context(|| format!("Recipe {id} vanished after insert"))
    }

    pub fn get_recipe(&self, id: i64) -> Result<Option<Recipe>> {
        let recipe = self
            .conn
            .query_row(
                "SELECT id, uuid, name, description, ingredients, instructions, created_at
                 FROM recipes WHERE id = ?1",
                params![id],
                Self::recipe_from_row,
            )
            .optional()?;
        Ok(recipe)
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, description, ingredients, instructions, created_at
             FROM recipes ORDER BY id",
        )?;
        let recipes = stmt
            .query_map([], Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    /// Insert `recipes` in one transaction, but only when the table is empty.
    /// Returns the inserted rows; nothing is written if any insert fails.
    pub fn insert_recipes_if_empty(&self, recipes: &[NewRecipe]) -> Result<Vec<Recipe>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("failed to start transaction")?;
        if self.count_recipes()? > 0 {
            return Ok(Vec::new());
        }
        let inserted = recipes
            .iter()
            .map(|recipe| self.insert_recipe(recipe))
            .collect::<Result<Vec<_>>>()?;
        tx.commit().context("failed to commit recipes")?;
        Ok(inserted)
    }

    pub fn count_recipes(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Scheduled meals ---

    pub fn insert_scheduled_meal(&self, meal: &NewScheduledMeal) -> Result<ScheduledMeal> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        let date_str = meal.date.format(DATE_FORMAT).to_string();
        self.conn.execute(
            "INSERT INTO scheduled_meals (uuid, recipe_id, date, meal_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![uuid, meal.recipe_id, date_str, meal.meal_type.as_str(), now],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(
            id,
            recipe_id = meal.recipe_id,
            date = %date_str,
            meal_type = %meal.meal_type,
            "scheduled meal"
        );
        self.get_scheduled_meal(id)?
            .with_context(|| format!("Scheduled meal {id} vanished after insert"))
    }

    pub fn get_scheduled_meal(&self, id: i64) -> Result<Option<ScheduledMeal>> {
        let meal = self
            .conn
            .query_row(
                "SELECT id, uuid, recipe_id, date, meal_type, created_at
                 FROM scheduled_meals WHERE id = ?1",
                params![id],
                Self::scheduled_meal_from_row,
            )
            .optional()?;
        Ok(meal)
    }

    pub fn delete_scheduled_meal(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM scheduled_meals WHERE id = ?1", params![id])?;
        tracing::debug!(id, removed = rows > 0, "delete scheduled meal");
        Ok(rows > 0)
    }

    pub fn list_scheduled_meals(&self) -> Result<Vec<ScheduledMeal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, recipe_id, date, meal_type, created_at
             FROM scheduled_meals ORDER BY id",
        )?;
        let meals = stmt
            .query_map([], Self::scheduled_meal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meals)
    }

    pub fn get_scheduled_meals_for_date(&self, date: NaiveDate) -> Result<Vec<ScheduledMeal>> {
        let date_str = date.format(DATE_FORMAT).to_string();
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, recipe_id, date, meal_type, created_at
             FROM scheduled_meals
             WHERE date = ?1
             ORDER BY id",
        )?;
        let meals = stmt
            .query_map(params![date_str], Self::scheduled_meal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meals)
    }

    /// Meals dated within `start..=end`, ordered by id.
    pub fn get_scheduled_meals_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ScheduledMeal>> {
        let start_str = start.format(DATE_FORMAT).to_string();
        let end_str = end.format(DATE_FORMAT).to_string();
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, recipe_id, date, meal_type, created_at
             FROM scheduled_meals
             WHERE date >= ?1 AND date <= ?2
             ORDER BY id",
        )?;
        let meals = stmt
            .query_map(params![start_str, end_str], Self::scheduled_meal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meals)
    }
}
