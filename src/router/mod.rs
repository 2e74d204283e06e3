//! Message router: turns one inbound text into exactly one reply.
//!
//! Input is first classified into a [`Command`], trying rules in a fixed
//! order (first match wins), and the command is then answered from the
//! schedule table, the assets, or the help text.

pub mod clock;
pub mod command;

pub use clock::{Clock, FixedClock, SystemClock};
pub use command::{Command, DayQuery};

use crate::assets::AssetStore;
use crate::chat::Reply;
use crate::schedule::{Category, ReferenceMonth, Schedule};
use crate::session::SessionManager;
use chrono::{Days, NaiveDate};
use command::{CALENDAR_KEYWORD, greeting_reply, parse_day_query};
use std::sync::Arc;

/// Appended to every schedule answer.
pub const REPLY_SUFFIX: &str = "です";
/// Stands in for the category on days without collection.
pub const NO_COLLECTION: &str = "収集はない";
/// Returned for day-of-month input that does not name a real date.
pub const DAY_HINT: &str = "例)1日, 15日, 30日というように入力してください";

pub const HELP_TEXT: &str = "\
このようにしてください！
カレンダーを表示したければ、
メニューの「カレンダー」をタップ
今日のごみ収集の種類が知りたければ、メニューの「今日」をタップ
明日のごみ収集の種類が知りたければ、メニューの「明日」をタップ
「燃えるごみ」「プラスチックごみ」「びん缶ペットボトル」の
どれかを入力すると、対応する曜日を教えます";

pub struct MessageRouter {
    schedule: Schedule,
    reference: ReferenceMonth,
    assets: AssetStore,
    sessions: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
}

impl MessageRouter {
    pub fn new(
        schedule: Schedule,
        reference: ReferenceMonth,
        assets: AssetStore,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            schedule,
            reference,
            assets,
            sessions,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Maps text to the first command whose rule matches.
    pub fn classify(&self, text: &str) -> Command {
        if let Some(category) = Category::from_synonym(text) {
            return Command::CategoryDays(category);
        }
        if let Some(query) = parse_day_query(text) {
            return Command::DayCategory(query);
        }
        if text == CALENDAR_KEYWORD {
            return Command::Calendar;
        }
        if let Some(response) = greeting_reply(text) {
            return Command::Greeting(response);
        }
        if let Some(template) = self.assets.template_for(text) {
            return Command::Template(template.keyword.clone());
        }
        Command::Help
    }

    /// Answers one message from `sender_id`.
    ///
    /// The sender's session is registered first; its state does not
    /// influence the reply.
    pub async fn handle(&self, sender_id: &str, text: &str) -> Reply {
        self.sessions.register(sender_id).await;

        let command = self.classify(text);
        tracing::debug!(sender_id = %sender_id, command = ?command, "Classified message");
        self.answer(command)
    }

    /// Produces the reply for an already classified command.
    pub fn answer(&self, command: Command) -> Reply {
        match command {
            Command::CategoryDays(category) => {
                Reply::text(format!("{}{}", self.schedule.days_text(category), REPLY_SUFFIX))
            }
            Command::DayCategory(query) => {
                Reply::text(format!("{}{}", self.answer_day(query), REPLY_SUFFIX))
            }
            Command::Calendar => self.assets.calendar_reply(),
            Command::Greeting(response) => Reply::text(response),
            Command::Template(keyword) => match self.assets.template_for(&keyword) {
                Some(template) => template.reply(),
                None => Reply::text(HELP_TEXT),
            },
            Command::Help => Reply::text(HELP_TEXT),
        }
    }

    /// Answers a date question given as text (`今日`, `明日`, `<N>日`)
    /// without the reply suffix. Text that names no date gets the day-input
    /// hint; `answer` appends the suffix either way.
    pub fn resolve_day(&self, text: &str) -> String {
        match parse_day_query(text) {
            Some(query) => self.answer_day(query),
            None => DAY_HINT.to_string(),
        }
    }

    fn answer_day(&self, query: DayQuery) -> String {
        match self.date_for(query) {
            Some(date) => self
                .schedule
                .category_on(date)
                .map(|category| category.label())
                .unwrap_or(NO_COLLECTION)
                .to_string(),
            None => DAY_HINT.to_string(),
        }
    }

    fn date_for(&self, query: DayQuery) -> Option<NaiveDate> {
        match query {
            DayQuery::Today => Some(self.clock.today()),
            DayQuery::Tomorrow => self.clock.today().checked_add_days(Days::new(1)),
            DayQuery::DayOfMonth(day) => day.and_then(|day| self.reference.date(day)),
        }
    }
}
