use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use metabake_util::split::split_filter_empty;

use crate::data_smart::DataSmart;
use crate::errors::DataSmartResult;

static SETVAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>.+?)_(?P<keyword>append|prepend)(?:_(?P<add>.+))?$").unwrap()
});

impl DataSmart {
    /// Recompute variables derived from other variables.
    ///
    /// For each override in `OVERRIDES` (lowest priority first), `NAME_override` replaces `NAME`.
    /// Then every `NAME_append` / `NAME_prepend`, optionally filtered by an active override
    /// (`NAME_append_override`), is applied to `NAME` and removed, so running this twice does not
    /// apply anything twice.
    pub fn update_data(&self) -> DataSmartResult<()> {
        let overrides = match self.get_var("OVERRIDES") {
            Some(raw) => self.expand(&raw)?,
            None => String::new(),
        };
        let active: Vec<&str> = split_filter_empty(&overrides, ":").collect();
        debug!(?active, "update_data");

        let keys = self.keys();
        for o in &active {
            let suffix = format!("_{}", o);
            for key in &keys {
                if SETVAR_REGEX.is_match(key) {
                    continue;
                }

                let Some(base) = key.strip_suffix(suffix.as_str()) else {
                    continue;
                };
                if base.is_empty() {
                    continue;
                }

                if let Some(value) = self.get_var(key) {
                    trace!(key = key.as_str(), base, "applying override");
                    self.set_var(base, value);
                }
            }
        }

        for key in self.keys() {
            let Some(caps) = SETVAR_REGEX.captures(&key) else {
                continue;
            };

            if let Some(add) = caps.name("add") {
                if !active.contains(&add.as_str()) {
                    continue;
                }
            }

            let Some(value) = self.get_var(&key) else {
                continue;
            };

            let base = &caps["base"];
            let current = self.get_var(base).unwrap_or_default();
            let new_value = match &caps["keyword"] {
                "append" => current + &value,
                _ => value + &current,
            };

            trace!(key = key.as_str(), base, "applying {}", &caps["keyword"]);
            self.set_var(base, new_value);
            self.del_var(&key);
        }

        Ok(())
    }
}
