use anyhow::Result;
use chrono::{Local, NaiveDate};
use tabled::{builder::Builder, settings::Style};

use mealplan_core::calendar::{CalendarView, GridCell, MonthGrid, YearMonth};
use mealplan_core::models::MealType;
use mealplan_core::service::PlannerService;

use super::helpers::{long_date, parse_date, truncate};

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub(crate) fn cmd_calendar(
    svc: &PlannerService,
    month: Option<&str>,
    next: u32,
    prev: u32,
    json: bool,
) -> Result<()> {
    let today = Local::now().date_naive();
    let start = match month {
        Some(m) => m.parse::<YearMonth>()?.first_day(),
        None => today,
    };

    let mut view = CalendarView::new(start);
    for _ in 0..next {
        view.next_month();
    }
    for _ in 0..prev {
        view.previous_month();
    }

    let grid = svc.month_grid(view.visible_month())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&grid)?);
        return Ok(());
    }

    println!("{}", grid.title);
    println!("{}", render_grid(&grid, today));

    let planned: usize = grid.day_cells().map(|c| c.meal_count).sum();
    if planned == 0 {
        println!("No meals planned this month. Add one with: mealplan schedule --date <YYYY-MM-DD>");
    } else {
        println!("{planned} meal(s) planned. B = breakfast, L = lunch, D = dinner");
    }
    Ok(())
}

/// Seven columns starting on Sunday; each day shows its number (today in
/// brackets) and slot badges underneath.
fn render_grid(grid: &MonthGrid, today: NaiveDate) -> String {
    let mut builder = Builder::default();
    builder.push_record(WEEKDAYS);

    for week in grid.weeks() {
        let mut row: Vec<String> = week
            .iter()
            .map(|cell| match cell {
                GridCell::Empty => String::new(),
                GridCell::Day(day) => {
                    let number = if day.date == today {
                        format!("[{}]", day.day)
                    } else {
                        day.day.to_string()
                    };
                    if day.has_meals {
                        format!("{number}\n{}", day.counts.badges())
                    } else {
                        number
                    }
                }
            })
            .collect();
        row.resize(WEEKDAYS.len(), String::new());
        builder.push_record(row);
    }

    builder.build().with(Style::rounded()).to_string()
}

pub(crate) fn cmd_day(svc: &PlannerService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;

    let mut view = CalendarView::new(date);
    view.open_day(date);
    let agenda = svc.day_agenda(view.selected_date())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&agenda)?);
        return Ok(());
    }

    println!("{}\n", long_date(agenda.date));
    for meal_type in MealType::ALL {
        let label = meal_type.label();
        println!("{label}");
        let entries = agenda.slot(meal_type);
        if entries.is_empty() {
            println!("  No {} planned", label.to_lowercase());
        }
        for entry in entries {
            println!("  [{}] {}", entry.meal_id, truncate(&entry.recipe_name, 50));
        }
    }

    if agenda.is_empty() {
        let day = agenda.date;
        println!("\nNo meals planned for this day. Add one with: mealplan schedule --date {day}");
    } else {
        println!("\nRemove an entry with: mealplan unschedule <id>");
    }
    Ok(())
}
