//! Garbage collection schedule: the weekday table and category vocabulary.

pub mod reference;
pub mod table;
pub mod types;

pub use reference::{ReferenceMonth, ReferenceMonthError};
pub use table::{Schedule, WEEK, weekday_name};
pub use types::{Category, normalize};
