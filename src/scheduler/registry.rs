use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};

use crate::bot::BotRuntime;
use crate::modules::persistence::BotContext;

/// Active accounts and their contexts. Always used behind one coarse lock.
///
/// Removed contexts stay reachable through `detached` while a cycle or a save
/// still holds them, so a quick reconnect picks up the same instance.
#[derive(Default)]
pub struct AccountRegistry {
    bots: Vec<Arc<dyn BotRuntime>>,
    contexts: HashMap<String, Arc<BotContext>>,
    detached: HashMap<String, Weak<BotContext>>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the account with the same name.
    pub fn add_bot(&mut self, bot: Arc<dyn BotRuntime>) {
        match self.bots.iter_mut().find(|b| b.name() == bot.name()) {
            Some(slot) => *slot = bot,
            None => self.bots.push(bot),
        }
    }

    pub fn remove_bot(&mut self, name: &str) -> bool {
        let before = self.bots.len();
        self.bots.retain(|b| b.name() != name);
        self.bots.len() != before
    }

    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    pub fn context(&self, name: &str) -> Option<Arc<BotContext>> {
        self.contexts.get(name).cloned()
    }

    pub fn get_or_create_context(&mut self, name: &str, contexts_dir: &Path) -> Arc<BotContext> {
        if let Some(context) = self.contexts.get(name) {
            return context.clone();
        }
        let context = self
            .detached
            .remove(name)
            .and_then(|weak| weak.upgrade())
            .unwrap_or_else(|| Arc::new(BotContext::new(name, contexts_dir)));
        self.contexts.insert(name.to_string(), context.clone());
        context
    }

    pub fn remove_context(&mut self, name: &str) -> Option<Arc<BotContext>> {
        self.detached.retain(|_, weak| weak.strong_count() > 0);
        let context = self.contexts.remove(name)?;
        self.detached
            .insert(name.to_string(), Arc::downgrade(&context));
        Some(context)
    }

    /// Accounts sorted by descending last-run duration; accounts without a
    /// context have never run and go first. Ties keep registration order.
    pub fn ordered_by_last_run(&self) -> Vec<Arc<dyn BotRuntime>> {
        let key = |bot: &Arc<dyn BotRuntime>| {
            self.contexts
                .get(bot.name())
                .map(|ctx| ctx.run_elapsed_ms())
                .unwrap_or(i64::MAX)
        };
        let mut ordered = self.bots.clone();
        ordered.sort_by(|a, b| key(b).cmp(&key(a)));
        ordered
    }
}
