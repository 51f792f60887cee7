//! Month grid construction, month navigation and the calendar's view state.
//!
//! Everything here is pure: callers pass in the scheduled meals and recipes
//! they already loaded, and mutations go through [`MealScheduler`].

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::models::{MealType, MealsByType, Recipe, ScheduledMeal};

/// Placeholder shown for a scheduled meal whose recipe no longer resolves.
pub const UNKNOWN_RECIPE: &str = "Unknown Recipe";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A calendar month, `month` in `1..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("Invalid month {month}. Must be between 1 and 12");
        }
        NaiveDate::from_ymd_opt(year, month, 1)
            .with_context(|| format!("Year {year} is out of range"))?;
        Ok(Self { year, month })
    }

    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn month(self) -> u32 {
        self.month
    }

    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated in constructor")
    }

    /// The day before the first of the following month.
    #[must_use]
    pub fn last_day(self) -> NaiveDate {
        let first = self.first_day();
        first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    #[must_use]
    pub fn days(self) -> u32 {
        self.last_day().day()
    }

    /// Weekday index of the 1st, 0 = Sunday.
    #[must_use]
    pub fn first_weekday(self) -> u32 {
        self.first_day().weekday().num_days_from_sunday()
    }

    #[must_use]
    pub fn title(self) -> String {
        let name = MONTH_NAMES[(self.month - 1) as usize];
        format!("{name} {}", self.year)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .with_context(|| format!("Invalid month '{s}'. Use YYYY-MM"))?;
        let year: i32 = year
            .parse()
            .with_context(|| format!("Invalid year in '{s}'. Use YYYY-MM"))?;
        let month: u32 = month
            .parse()
            .with_context(|| format!("Invalid month in '{s}'. Use YYYY-MM"))?;
        Self::new(year, month)
    }
}

#[must_use]
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    YearMonth::new(year, month).ok().map(YearMonth::days)
}

#[must_use]
pub fn first_weekday(year: i32, month: u32) -> Option<u32> {
    YearMonth::new(year, month).ok().map(YearMonth::first_weekday)
}

/// Move `date` by whole months. The day of month is kept when the target
/// month has it and clamped to the target's last day otherwise.
#[must_use]
pub fn shift_months(date: NaiveDate, delta: i32) -> NaiveDate {
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    };
    shifted.unwrap_or(date)
}

pub fn meals_for_date(
    meals: &[ScheduledMeal],
    date: NaiveDate,
) -> impl Iterator<Item = &ScheduledMeal> {
    meals.iter().filter(move |m| m.date == date)
}

// --- Month grid ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealCounts {
    pub breakfast: usize,
    pub lunch: usize,
    pub dinner: usize,
}

impl MealCounts {
    pub fn add(&mut self, meal_type: MealType) {
        match meal_type {
            MealType::Breakfast => self.breakfast += 1,
            MealType::Lunch => self.lunch += 1,
            MealType::Dinner => self.dinner += 1,
        }
    }

    #[must_use]
    pub fn get(&self, meal_type: MealType) -> usize {
        match meal_type {
            MealType::Breakfast => self.breakfast,
            MealType::Lunch => self.lunch,
            MealType::Dinner => self.dinner,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.breakfast + self.lunch + self.dinner
    }

    /// Badge text such as `B L2`: slot initial, count appended when above one.
    #[must_use]
    pub fn badges(&self) -> String {
        MealType::ALL
            .iter()
            .filter_map(|&t| match self.get(t) {
                0 => None,
                1 => Some(t.badge().to_string()),
                n => Some(format!("{}{n}", t.badge())),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub date: NaiveDate,
    pub day: u32,
    pub has_meals: bool,
    pub meal_count: usize,
    pub counts: MealCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GridCell {
    Empty,
    Day(DayCell),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthGrid {
    pub month: YearMonth,
    pub title: String,
    pub leading_blanks: u32,
    pub days_in_month: u32,
    pub cells: Vec<GridCell>,
}

impl MonthGrid {
    /// Lay out `month` as leading blanks up to the weekday of the 1st (weeks
    /// start on Sunday) followed by one cell per day, each annotated with the
    /// meals from `meals` that fall on it.
    #[must_use]
    pub fn build(month: YearMonth, meals: &[ScheduledMeal]) -> Self {
        let leading_blanks = month.first_weekday();
        let days = month.days();
        let mut cells = Vec::with_capacity((leading_blanks + days) as usize);
        cells.extend((0..leading_blanks).map(|_| GridCell::Empty));

        for date in month.first_day().iter_days().take(days as usize) {
            let mut counts = MealCounts::default();
            for meal in meals_for_date(meals, date) {
                counts.add(meal.meal_type);
            }
            cells.push(GridCell::Day(DayCell {
                date,
                day: date.day(),
                has_meals: counts.total() > 0,
                meal_count: counts.total(),
                counts,
            }));
        }

        Self {
            month,
            title: month.title(),
            leading_blanks,
            days_in_month: days,
            cells,
        }
    }

    pub fn day_cells(&self) -> impl Iterator<Item = &DayCell> {
        self.cells.iter().filter_map(|c| match c {
            GridCell::Day(day) => Some(day),
            GridCell::Empty => None,
        })
    }

    /// Rows of seven cells; the last row is not padded.
    pub fn weeks(&self) -> std::slice::Chunks<'_, GridCell> {
        self.cells.chunks(7)
    }
}

// --- Day agenda ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaEntry {
    pub meal_id: i64,
    pub recipe_id: i64,
    pub recipe_name: String,
    pub recipe_found: bool,
    pub meal_type: MealType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAgenda {
    pub date: NaiveDate,
    pub breakfast: Vec<AgendaEntry>,
    pub lunch: Vec<AgendaEntry>,
    pub dinner: Vec<AgendaEntry>,
}

impl DayAgenda {
    #[must_use]
    pub fn build(date: NaiveDate, meals: &MealsByType, recipes: &[Recipe]) -> Self {
        let resolve = |bucket: &[ScheduledMeal]| -> Vec<AgendaEntry> {
            bucket
                .iter()
                .map(|meal| {
                    let recipe = recipes.iter().find(|r| r.id == meal.recipe_id);
                    AgendaEntry {
                        meal_id: meal.id,
                        recipe_id: meal.recipe_id,
                        recipe_name: recipe
                            .map_or_else(|| UNKNOWN_RECIPE.to_string(), |r| r.name.clone()),
                        recipe_found: recipe.is_some(),
                        meal_type: meal.meal_type,
                    }
                })
                .collect()
        };
        Self {
            date,
            breakfast: resolve(&meals.breakfast),
            lunch: resolve(&meals.lunch),
            dinner: resolve(&meals.dinner),
        }
    }

    #[must_use]
    pub fn slot(&self, meal_type: MealType) -> &[AgendaEntry] {
        match meal_type {
            MealType::Breakfast => &self.breakfast,
            MealType::Lunch => &self.lunch,
            MealType::Dinner => &self.dinner,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakfast.is_empty() && self.lunch.is_empty() && self.dinner.is_empty()
    }
}

// --- View state ---

/// Whatever owns the scheduled meal store. The calendar only ever appends.
pub trait MealScheduler {
    fn add_scheduled_meal(
        &self,
        recipe_id: i64,
        date: NaiveDate,
        meal_type: MealType,
    ) -> Result<ScheduledMeal>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Month,
    Day,
}

/// The open "add meal" dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDraft {
    pub date: NaiveDate,
    pub recipe_id: Option<i64>,
    pub meal_type: MealType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarView {
    selected_date: NaiveDate,
    mode: ViewMode,
    draft: Option<MealDraft>,
    last_meal_type: MealType,
}

impl CalendarView {
    #[must_use]
    pub fn new(selected_date: NaiveDate) -> Self {
        Self {
            selected_date,
            mode: ViewMode::Month,
            draft: None,
            last_meal_type: MealType::Breakfast,
        }
    }

    #[must_use]
    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    #[must_use]
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    #[must_use]
    pub fn draft(&self) -> Option<&MealDraft> {
        self.draft.as_ref()
    }

    #[must_use]
    pub fn visible_month(&self) -> YearMonth {
        YearMonth::of(self.selected_date)
    }

    pub fn previous_month(&mut self) {
        self.selected_date = shift_months(self.selected_date, -1);
    }

    pub fn next_month(&mut self) {
        self.selected_date = shift_months(self.selected_date, 1);
    }

    pub fn open_day(&mut self, date: NaiveDate) {
        self.selected_date = date;
        self.mode = ViewMode::Day;
    }

    pub fn back_to_month(&mut self) {
        self.mode = ViewMode::Month;
    }

    /// Select `date` and open the dialog with the first recipe preselected.
    /// The meal type carries over from the previous dialog.
    pub fn open_dialog(&mut self, date: NaiveDate, recipes: &[Recipe]) {
        self.selected_date = date;
        self.draft = Some(MealDraft {
            date,
            recipe_id: recipes.first().map(|r| r.id),
            meal_type: self.last_meal_type,
        });
    }

    /// Returns false when no dialog is open.
    pub fn choose_recipe(&mut self, recipe_id: i64) -> bool {
        match self.draft.as_mut() {
            Some(draft) => {
                draft.recipe_id = Some(recipe_id);
                true
            }
            None => false,
        }
    }

    /// Returns false when no dialog is open.
    pub fn choose_meal_type(&mut self, meal_type: MealType) -> bool {
        match self.draft.as_mut() {
            Some(draft) => {
                draft.meal_type = meal_type;
                self.last_meal_type = meal_type;
                true
            }
            None => false,
        }
    }

    /// Schedule the drafted meal and close the dialog.
    ///
    /// Without an open dialog, or with no recipe chosen, nothing is written
    /// and `Ok(None)` is returned; in the latter case the dialog stays open.
    /// On a store error the dialog stays open too.
    pub fn confirm(&mut self, store: &impl MealScheduler) -> Result<Option<ScheduledMeal>> {
        let Some(draft) = self.draft else {
            return Ok(None);
        };
        let Some(recipe_id) = draft.recipe_id else {
            return Ok(None);
        };
        let meal = store.add_scheduled_meal(recipe_id, draft.date, draft.meal_type)?;
        self.draft = None;
        Ok(Some(meal))
    }

    pub fn cancel(&mut self) {
        self.draft = None;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn meal(id: i64, recipe_id: i64, on: NaiveDate, meal_type: MealType) -> ScheduledMeal {
        ScheduledMeal {
            id,
            uuid: String::new(),
            recipe_id,
            date: on,
            meal_type,
            created_at: String::new(),
        }
    }

    fn recipe(id: i64, name: &str) -> Recipe {
        Recipe {
            id,
            uuid: String::new(),
            name: name.to_string(),
            description: "d".to_string(),
            ingredients: vec!["x".to_string()],
            instructions: "i".to_string(),
            created_at: String::new(),
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        added: RefCell<Vec<ScheduledMeal>>,
    }

    impl MealScheduler for RecordingStore {
        fn add_scheduled_meal(
            &self,
            recipe_id: i64,
            date: NaiveDate,
            meal_type: MealType,
        ) -> Result<ScheduledMeal> {
            let mut added = self.added.borrow_mut();
            let m = meal(added.len() as i64 + 1, recipe_id, date, meal_type);
            added.push(m.clone());
            Ok(m)
        }
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(1900, 2), Some(28));
        assert_eq!(days_in_month(2000, 2), Some(29));
        assert_eq!(days_in_month(2024, 4), Some(30));
        assert_eq!(days_in_month(2024, 12), Some(31));
        assert_eq!(days_in_month(2024, 13), None);
    }

    #[test]
    fn test_first_weekday_sunday_based() {
        // 2024-09-01 was a Sunday, 2024-03-01 a Friday
        assert_eq!(first_weekday(2024, 9), Some(0));
        assert_eq!(first_weekday(2024, 3), Some(5));
    }

    #[test]
    fn test_grid_thirty_day_month_starting_wednesday() {
        // November 2023 has 30 days and starts on a Wednesday
        let month = YearMonth::new(2023, 11).unwrap();
        let grid = MonthGrid::build(month, &[]);

        assert_eq!(grid.leading_blanks, 3);
        let blanks = grid
            .cells
            .iter()
            .take_while(|c| matches!(c, GridCell::Empty))
            .count();
        assert_eq!(blanks, 3);
        assert_eq!(grid.day_cells().count(), 30);
        assert_eq!(grid.cells.len(), 33);
        assert_eq!(grid.title, "November 2023");
    }

    #[test]
    fn test_grid_counts_meals_per_day() {
        let month = YearMonth::new(2024, 3).unwrap();
        let meals = vec![
            meal(1, 1, date(2024, 3, 5), MealType::Lunch),
            meal(2, 2, date(2024, 3, 5), MealType::Lunch),
            meal(3, 1, date(2024, 3, 5), MealType::Dinner),
            meal(4, 1, date(2024, 4, 5), MealType::Breakfast),
        ];
        let grid = MonthGrid::build(month, &meals);

        let fifth = grid.day_cells().find(|c| c.day == 5).unwrap();
        assert!(fifth.has_meals);
        assert_eq!(fifth.meal_count, 3);
        assert_eq!(fifth.counts.lunch, 2);
        assert_eq!(fifth.counts.dinner, 1);
        assert_eq!(fifth.counts.badges(), "L2 D");

        let sixth = grid.day_cells().find(|c| c.day == 6).unwrap();
        assert!(!sixth.has_meals);
        assert_eq!(sixth.counts.badges(), "");
    }

    #[test]
    fn test_grid_weeks() {
        let grid = MonthGrid::build(YearMonth::new(2024, 3).unwrap(), &[]);
        let weeks: Vec<_> = grid.weeks().collect();
        // 5 blanks + 31 days = 36 cells
        assert_eq!(weeks.len(), 6);
        assert_eq!(weeks[5].len(), 1);
    }

    #[test]
    fn test_shift_months() {
        assert_eq!(shift_months(date(2024, 3, 15), 1), date(2024, 4, 15));
        assert_eq!(shift_months(date(2024, 1, 10), -1), date(2023, 12, 10));
        assert_eq!(shift_months(date(2023, 12, 10), 1), date(2024, 1, 10));
        assert_eq!(shift_months(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(shift_months(date(2024, 3, 31), -13), date(2023, 2, 28));
    }

    #[test]
    fn test_year_month_parse_and_display() {
        let ym: YearMonth = "2024-03".parse().unwrap();
        assert_eq!(ym.to_string(), "2024-03");
        assert_eq!(ym.last_day(), date(2024, 3, 31));
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("march".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_view_next_month_preserves_day() {
        let mut view = CalendarView::new(date(2024, 3, 20));
        view.next_month();
        assert_eq!(view.selected_date(), date(2024, 4, 20));
        assert_eq!(view.visible_month(), YearMonth::new(2024, 4).unwrap());

        view.previous_month();
        view.previous_month();
        view.previous_month();
        assert_eq!(view.visible_month(), YearMonth::new(2024, 1).unwrap());
        view.previous_month();
        assert_eq!(view.visible_month(), YearMonth::new(2023, 12).unwrap());
    }

    #[test]
    fn test_view_day_mode_transitions() {
        let mut view = CalendarView::new(date(2024, 3, 1));
        assert_eq!(view.mode(), ViewMode::Month);
        view.open_day(date(2024, 3, 5));
        assert_eq!(view.mode(), ViewMode::Day);
        assert_eq!(view.selected_date(), date(2024, 3, 5));
        view.back_to_month();
        assert_eq!(view.mode(), ViewMode::Month);
    }

    #[test]
    fn test_dialog_confirm_adds_exactly_one_meal() {
        let store = RecordingStore::default();
        let recipes = vec![recipe(1, "Tea"), recipe(2, "Toast")];
        let mut view = CalendarView::new(date(2024, 3, 1));

        view.open_dialog(date(2024, 3, 5), &recipes);
        let draft = view.draft().unwrap();
        assert_eq!(draft.recipe_id, Some(1));
        assert_eq!(draft.meal_type, MealType::Breakfast);

        assert!(view.choose_recipe(2));
        assert!(view.choose_meal_type(MealType::Lunch));
        let created = view.confirm(&store).unwrap().unwrap();

        assert_eq!(created.recipe_id, 2);
        assert_eq!(created.date, date(2024, 3, 5));
        assert_eq!(created.meal_type, MealType::Lunch);
        assert!(view.draft().is_none());
        assert_eq!(store.added.borrow().len(), 1);

        // Closed dialog: confirming again writes nothing
        assert!(view.confirm(&store).unwrap().is_none());
        assert_eq!(store.added.borrow().len(), 1);
    }

    #[test]
    fn test_dialog_remembers_meal_type() {
        let recipes = vec![recipe(1, "Tea")];
        let mut view = CalendarView::new(date(2024, 3, 1));
        view.open_dialog(date(2024, 3, 5), &recipes);
        view.choose_meal_type(MealType::Dinner);
        view.cancel();
        view.open_dialog(date(2024, 3, 6), &recipes);
        assert_eq!(view.draft().unwrap().meal_type, MealType::Dinner);
    }

    #[test]
    fn test_dialog_cancel_discards_draft() {
        let store = RecordingStore::default();
        let mut view = CalendarView::new(date(2024, 3, 1));
        view.open_dialog(date(2024, 3, 5), &[recipe(1, "Tea")]);
        view.cancel();
        assert!(view.draft().is_none());
        assert!(view.confirm(&store).unwrap().is_none());
        assert!(store.added.borrow().is_empty());
        assert!(!view.choose_recipe(1));
    }

    #[test]
    fn test_dialog_without_recipes_stays_open() {
        let store = RecordingStore::default();
        let mut view = CalendarView::new(date(2024, 3, 1));
        view.open_dialog(date(2024, 3, 5), &[]);
        assert_eq!(view.draft().unwrap().recipe_id, None);
        assert!(view.confirm(&store).unwrap().is_none());
        assert!(view.draft().is_some());
        assert!(store.added.borrow().is_empty());
    }

    #[test]
    fn test_day_agenda_unknown_recipe() {
        let on = date(2024, 3, 5);
        let grouped = MealsByType::from_meals(vec![
            meal(1, 1, on, MealType::Breakfast),
            meal(2, 99, on, MealType::Dinner),
        ]);
        let agenda = DayAgenda::build(on, &grouped, &[recipe(1, "Tea")]);

        assert_eq!(agenda.breakfast[0].recipe_name, "Tea");
        assert!(agenda.breakfast[0].recipe_found);
        assert_eq!(agenda.slot(MealType::Dinner)[0].recipe_name, UNKNOWN_RECIPE);
        assert!(!agenda.dinner[0].recipe_found);
        assert!(agenda.lunch.is_empty());
        assert!(!agenda.is_empty());
    }

    #[test]
    fn test_grid_serializes_tagged_cells() {
        let grid = MonthGrid::build(YearMonth::new(2023, 11).unwrap(), &[]);
        let json = serde_json::to_value(&grid).unwrap();
        assert_eq!(json["cells"][0]["kind"], "empty");
        assert_eq!(json["cells"][3]["kind"], "day");
        assert_eq!(json["cells"][3]["day"], 1);
        assert_eq!(json["cells"][3]["date"], "2023-11-01");
        assert_eq!(json["month"]["month"], 11);
    }
}
