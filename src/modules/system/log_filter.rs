use dashmap::DashMap;
use regex::Regex;
use std::sync::{Arc, LazyLock, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

// Result lines an unattended add-license attempt typically produces.
static COMMON_ADD_LICENSE_ERRORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:add\s*license|purchase\s*result|rate\s*limit|already\s*purchased|region\s*not\s*supported|invalid\s*package|does\s*not\s*own\s*required\s*app|\bfail(?:ed|ure)?\b)",
    )
    .expect("Invalid add-license error regex")
});

static SHARED_FILTER: OnceLock<Arc<LoggerFilter>> = OnceLock::new();

/// Per-account mute switches for repetitive add-license error lines.
#[derive(Debug, Default)]
pub struct LoggerFilter {
    scopes: DashMap<String, usize>,
}

impl LoggerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance consulted by [`LoggerFilterLayer`].
    pub fn shared() -> Arc<LoggerFilter> {
        SHARED_FILTER
            .get_or_init(|| Arc::new(LoggerFilter::new()))
            .clone()
    }

    pub fn disable_add_license_errors(&self, bot: &str, enabled: bool) -> FilterGuard<'_> {
        if !enabled {
            return FilterGuard {
                filter: self,
                bot: None,
            };
        }
        *self.scopes.entry(bot.to_string()).or_insert(0) += 1;
        FilterGuard {
            filter: self,
            bot: Some(bot.to_string()),
        }
    }

    pub fn is_filtered(&self, bot: &str, message: &str) -> bool {
        self.scopes.get(bot).is_some_and(|count| *count > 0)
            && COMMON_ADD_LICENSE_ERRORS.is_match(message)
    }

    pub fn is_active(&self, bot: &str) -> bool {
        self.scopes.get(bot).is_some_and(|count| *count > 0)
    }

    pub fn remove_filters(&self, bot: &str) {
        if self.scopes.remove(bot).is_some() {
            tracing::debug!(bot = %bot, "Cleared log filters");
        }
    }

    fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    fn leave(&self, bot: &str) {
        if let Some(mut count) = self.scopes.get_mut(bot) {
            *count = count.saturating_sub(1);
        }
        self.scopes.remove_if(bot, |_, count| *count == 0);
    }
}

/// Keeps a suppression scope open until dropped.
#[must_use = "the filter is lifted as soon as the guard is dropped"]
pub struct FilterGuard<'a> {
    filter: &'a LoggerFilter,
    bot: Option<String>,
}

impl Drop for FilterGuard<'_> {
    fn drop(&mut self) {
        if let Some(bot) = self.bot.take() {
            self.filter.leave(&bot);
        }
    }
}

#[derive(Default)]
struct BotEventVisitor {
    bot: Option<String>,
    message: Option<String>,
}

impl Visit for BotEventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            "bot" => self.bot = Some(format!("{:?}", value).trim_matches('"').to_string()),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "bot" => self.bot = Some(value.to_string()),
            _ => {}
        }
    }
}

/// Drops events tagged with a `bot` field while that account is muted.
pub struct LoggerFilterLayer {
    filter: Arc<LoggerFilter>,
}

impl LoggerFilterLayer {
    pub fn new(filter: Arc<LoggerFilter>) -> Self {
        Self { filter }
    }
}

impl<S: Subscriber> Layer<S> for LoggerFilterLayer {
    fn event_enabled(&self, event: &Event<'_>, _ctx: Context<'_, S>) -> bool {
        if self.filter.is_empty() {
            return true;
        }
        let mut visitor = BotEventVisitor::default();
        event.record(&mut visitor);
        match (visitor.bot, visitor.message) {
            (Some(bot), Some(message)) => !self.filter.is_filtered(&bot, &message),
            _ => true,
        }
    }
}
