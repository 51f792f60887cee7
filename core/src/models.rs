use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    #[serde(default)]
    pub created_at: String,
}

/// A validated recipe ready to be inserted. Build it with [`NewRecipe::new`]
/// or from a [`RecipeForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
}

impl NewRecipe {
    /// Trim every field, drop blank ingredient lines and require that nothing
    /// ends up empty.
    pub fn new(
        name: &str,
        description: &str,
        ingredients: impl IntoIterator<Item = impl AsRef<str>>,
        instructions: &str,
    ) -> Result<Self> {
        let recipe = Self {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            ingredients: ingredients
                .into_iter()
                .map(|line| line.as_ref().trim().to_string())
                .filter(|line| !line.is_empty())
                .collect(),
            instructions: instructions.trim().to_string(),
        };
        validate_new_recipe(&recipe)?;
        Ok(recipe)
    }
}

/// Recipe input as typed into the create form, ingredients one per line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeForm {
    pub name: String,
    pub description: String,
    pub ingredients: String,
    pub instructions: String,
}

impl RecipeForm {
    pub fn into_new_recipe(self) -> Result<NewRecipe> {
        NewRecipe::new(
            &self.name,
            &self.description,
            parse_ingredient_lines(&self.ingredients),
            &self.instructions,
        )
    }
}

/// Split free-text ingredient input on newlines, trimming each line and
/// discarding the empty ones.
#[must_use]
pub fn parse_ingredient_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

pub fn validate_new_recipe(recipe: &NewRecipe) -> Result<()> {
    if recipe.name.trim().is_empty() {
        bail!("Recipe name must not be empty");
    }
    if recipe.description.trim().is_empty() {
        bail!("Recipe description must not be empty");
    }
    if recipe.ingredients.is_empty() {
        bail!("Recipe must have at least one ingredient");
    }
    if recipe.ingredients.iter().any(|i| i.trim().is_empty()) {
        bail!("Ingredient lines must not be empty");
    }
    if recipe.instructions.trim().is_empty() {
        bail!("Recipe instructions must not be empty");
    }
    Ok(())
}

// --- Meal slots ---

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
        }
    }

    /// Single-letter badge shown in month grid cells.
    #[must_use]
    pub fn badge(self) -> char {
        match self {
            Self::Breakfast => 'B',
            Self::Lunch => 'L',
            Self::Dinner => 'D',
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        validate_meal_type(s)
    }
}

pub fn validate_meal_type(meal: &str) -> Result<MealType> {
    match meal.trim().to_lowercase().as_str() {
        "breakfast" => Ok(MealType::Breakfast),
        "lunch" => Ok(MealType::Lunch),
        "dinner" => Ok(MealType::Dinner),
        _ => bail!(
            "Invalid meal type '{meal}'. Must be one of: {}",
            MEAL_TYPES.join(", ")
        ),
    }
}

// --- Scheduled meals ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMeal {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    /// Weak reference: the recipe may not exist.
    pub recipe_id: i64,
    pub date: NaiveDate,
    pub meal_type: MealType,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewScheduledMeal {
    pub recipe_id: i64,
    pub date: NaiveDate,
    pub meal_type: MealType,
}

/// Scheduled meals of one day split by slot, each bucket in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MealsByType {
    pub breakfast: Vec<ScheduledMeal>,
    pub lunch: Vec<ScheduledMeal>,
    pub dinner: Vec<ScheduledMeal>,
}

impl MealsByType {
    pub fn from_meals(meals: impl IntoIterator<Item = ScheduledMeal>) -> Self {
        let mut grouped = Self::default();
        for meal in meals {
            grouped.bucket_mut(meal.meal_type).push(meal);
        }
        grouped
    }

    #[must_use]
    pub fn get(&self, meal_type: MealType) -> &[ScheduledMeal] {
        match meal_type {
            MealType::Breakfast => &self.breakfast,
            MealType::Lunch => &self.lunch,
            MealType::Dinner => &self.dinner,
        }
    }

    fn bucket_mut(&mut self, meal_type: MealType) -> &mut Vec<ScheduledMeal> {
        match meal_type {
            MealType::Breakfast => &mut self.breakfast,
            MealType::Lunch => &mut self.lunch,
            MealType::Dinner => &mut self.dinner,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.breakfast.len() + self.lunch.len() + self.dinner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalise a date input to its calendar date.
///
/// Accepts `YYYY-MM-DD`, a naive date-time (`2024-03-05T23:30:00`) or an
/// RFC 3339 timestamp. The time of day and any UTC offset are dropped; the
/// date is the one written in the input.
pub fn parse_plan_date(input: &str) -> Result<NaiveDate> {
    let s = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{input}'. Use YYYY-MM-DD"))
}
