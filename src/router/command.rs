use crate::schedule::Category;

pub const TODAY: &str = "今日";
pub const TOMORROW: &str = "明日";
pub const DAY_MARKER: char = '日';
pub const CALENDAR_KEYWORD: &str = "カレンダー";

/// Fixed call-and-response pairs.
pub const GREETINGS: &[(&str, &str)] = &[("ただいま", "おかえり"), ("いってきます", "いってらっしゃい")];

/// Which day a date question refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayQuery {
    Today,
    Tomorrow,
    /// `<N>日`; `None` when the prefix is not an integer
    DayOfMonth(Option<u32>),
}

/// Classified user input. Variants are listed in matching priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CategoryDays(Category),
    DayCategory(DayQuery),
    Calendar,
    Greeting(&'static str),
    Template(String),
    Help,
}

/// Parses the text before the day marker. Surrounding whitespace, a leading
/// `+`, full-width digits and single `_` separators between digits are
/// accepted. Digits from other scripts are not.
pub fn parse_day_number(prefix: &str) -> Option<u32> {
    let trimmed = prefix.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() {
        return None;
    }

    let ascii: String = digits
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            other => other,
        })
        .collect();

    let grouped = ascii
        .split('_')
        .all(|group| !group.is_empty() && group.chars().all(|c| c.is_ascii_digit()));
    if !grouped {
        return None;
    }
    ascii.replace('_', "").parse().ok()
}

/// Classifies a date question, or returns `None` for other text.
pub fn parse_day_query(text: &str) -> Option<DayQuery> {
    match text {
        TODAY => Some(DayQuery::Today),
        TOMORROW => Some(DayQuery::Tomorrow),
        _ => text
            .strip_suffix(DAY_MARKER)
            .map(|prefix| DayQuery::DayOfMonth(parse_day_number(prefix))),
    }
}

pub fn greeting_reply(text: &str) -> Option<&'static str> {
    GREETINGS
        .iter()
        .find(|(call, _)| *call == text)
        .map(|(_, response)| *response)
}
