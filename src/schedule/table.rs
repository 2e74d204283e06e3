use crate::schedule::types::Category;
use chrono::{Datelike, NaiveDate, Weekday};

/// Monday-first order used for lookups and for joining day names.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "月曜日",
        Weekday::Tue => "火曜日",
        Weekday::Wed => "水曜日",
        Weekday::Thu => "木曜日",
        Weekday::Fri => "金曜日",
        Weekday::Sat => "土曜日",
        Weekday::Sun => "日曜日",
    }
}

/// Fixed weekday to category table. One entry per weekday, `None` meaning
/// there is no collection that day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    entries: [(Weekday, Option<Category>); 7],
}

impl Schedule {
    /// Builds a table from categories listed Monday first.
    pub fn new(categories: [Option<Category>; 7]) -> Self {
        Self {
            entries: std::array::from_fn(|i| (WEEK[i], categories[i])),
        }
    }

    pub fn entries(&self) -> &[(Weekday, Option<Category>)] {
        &self.entries
    }

    pub fn category_for(&self, day: Weekday) -> Option<Category> {
        self.entries[day.num_days_from_monday() as usize].1
    }

    pub fn category_on(&self, date: NaiveDate) -> Option<Category> {
        self.category_for(date.weekday())
    }

    /// All weekdays collecting `category`, in table order.
    pub fn days_for(&self, category: Category) -> Vec<Weekday> {
        self.entries
            .iter()
            .filter(|(_, entry)| *entry == Some(category))
            .map(|(day, _)| *day)
            .collect()
    }

    /// Comma-joined day names for `category`; empty when no day matches.
    pub fn days_text(&self, category: Category) -> String {
        self.days_for(category)
            .into_iter()
            .map(weekday_name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new([
            None,
            Some(Category::Burnable),
            Some(Category::Plastic),
            Some(Category::BottlesCans),
            Some(Category::Burnable),
            None,
            None,
        ])
    }
}
