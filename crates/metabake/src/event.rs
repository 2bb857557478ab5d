use std::cell::RefCell;

use indexmap::IndexMap;

use metabake_datasmart::DataSmart;
use metabake_util::words::{append_unique, words};

use crate::MetaResult;

pub const BBHANDLERS: &str = "__BBHANDLERS";

pub fn add_handler(name: &str, d: &DataSmart) {
    if let Some(handlers) = append_unique(d.get_var(BBHANDLERS).as_deref(), name) {
        d.set_var(BBHANDLERS, handlers);
    }
    d.set_var_flag(name, "handler", "1");
}

pub fn handlers(d: &DataSmart) -> Vec<String> {
    words(d.get_var(BBHANDLERS).as_deref())
}

pub trait EventRegistry {
    fn register_handler(&self, name: &str, body: &str) -> MetaResult<()>;
}

/// Registered handler bodies by name, in registration order.
#[derive(Debug, Default)]
pub struct EventHandlers {
    handlers: RefCell<IndexMap<String, String>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.handlers.borrow().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers.borrow().keys().cloned().collect()
    }
}

impl EventRegistry for EventHandlers {
    fn register_handler(&self, name: &str, body: &str) -> MetaResult<()> {
        self.handlers
            .borrow_mut()
            .insert(name.to_string(), body.to_string());
        Ok(())
    }
}
