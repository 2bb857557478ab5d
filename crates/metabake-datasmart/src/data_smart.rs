use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use im_rc::HashMap;
use tracing::{trace, warn};

use crate::errors::{DataSmartError, DataSmartResult};
use crate::expand::{ExpansionError, Expander, VariableLookup};

/// A variable's value and flags. Either may be absent independently of the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variable {
    pub value: Option<String>,
    pub flags: BTreeMap<String, String>,
}

impl Variable {
    fn is_empty(&self) -> bool {
        self.value.is_none() && self.flags.is_empty()
    }
}

struct DataSmartInner {
    parent: Option<DataSmart>,
    /// `None` marks a variable deleted in this layer, hiding whatever the parent has.
    vars: HashMap<String, Option<Variable>>,
}

/// Shared handle to a layered variable store. Cloning the handle does not copy the store; use
/// [`DataSmart::create_copy`] for that.
#[derive(Clone)]
pub struct DataSmart {
    inner: Rc<RefCell<DataSmartInner>>,
    expander: Rc<Expander>,
}

impl Default for DataSmart {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataSmart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSmart")
            .field("keys", &self.keys())
            .finish()
    }
}

impl VariableLookup for DataSmart {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get_var(name)
    }
}

impl DataSmart {
    pub fn new() -> Self {
        Self::with_expander(Rc::new(Expander::default()))
    }

    pub fn with_expander(expander: Rc<Expander>) -> Self {
        DataSmart {
            inner: Rc::new(RefCell::new(DataSmartInner {
                parent: None,
                vars: HashMap::new(),
            })),
            expander,
        }
    }

    pub fn expander(&self) -> &Rc<Expander> {
        &self.expander
    }

    /// Fork a child layer. Reads fall through to `self` until the child writes the key; writes
    /// and deletes in the child never reach `self`.
    pub fn create_copy(&self) -> DataSmart {
        DataSmart {
            inner: Rc::new(RefCell::new(DataSmartInner {
                parent: Some(self.clone()),
                vars: HashMap::new(),
            })),
            expander: self.expander.clone(),
        }
    }

    pub fn get_variable(&self, var: &str) -> Option<Variable> {
        let parent = {
            let inner = self.inner.borrow();
            match inner.vars.get(var) {
                Some(local) => return local.clone(),
                None => inner.parent.clone(),
            }
        };

        parent.and_then(|p| p.get_variable(var))
    }

    fn store_variable(&self, var: &str, contents: Variable) {
        let mut inner = self.inner.borrow_mut();
        if !contents.is_empty() {
            inner.vars.insert(var.to_string(), Some(contents));
        } else if inner.parent.is_some() {
            inner.vars.insert(var.to_string(), None);
        } else {
            inner.vars.remove(var);
        }
    }

    fn modify_variable(&self, var: &str, f: impl FnOnce(&mut Variable)) {
        let mut contents = self.get_variable(var).unwrap_or_default();
        f(&mut contents);
        self.store_variable(var, contents);
    }

    pub fn get_var(&self, var: &str) -> Option<String> {
        self.get_variable(var).and_then(|v| v.value)
    }

    pub fn set_var<V: Into<String>>(&self, var: &str, value: V) {
        let value = value.into();
        trace!(var, value = value.as_str(), "set_var");
        self.modify_variable(var, |v| v.value = Some(value));
    }

    /// Remove the value and every flag.
    pub fn del_var(&self, var: &str) {
        trace!(var, "del_var");
        self.store_variable(var, Variable::default());
    }

    pub fn get_var_flag(&self, var: &str, flag: &str) -> Option<String> {
        self.get_variable(var)
            .and_then(|mut v| v.flags.remove(flag))
    }

    /// A flag counts as set when present, non-empty and not `"0"`.
    pub fn is_flag_set(&self, var: &str, flag: &str) -> bool {
        self.get_var_flag(var, flag)
            .is_some_and(|v| !v.is_empty() && v != "0")
    }

    pub fn set_var_flag<V: Into<String>>(&self, var: &str, flag: &str, value: V) {
        let value = value.into();
        self.modify_variable(var, |v| {
            v.flags.insert(flag.to_string(), value);
        });
    }

    pub fn del_var_flag(&self, var: &str, flag: &str) {
        if self.get_var_flag(var, flag).is_none() {
            return;
        }
        self.modify_variable(var, |v| {
            v.flags.remove(flag);
        });
    }

    pub fn get_var_flags(&self, var: &str) -> BTreeMap<String, String> {
        self.get_variable(var).map(|v| v.flags).unwrap_or_default()
    }

    /// Every variable visible from this layer, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = BTreeSet::new();
        self.collect_keys(&mut keys);
        keys.into_iter().collect()
    }

    fn collect_keys(&self, keys: &mut BTreeSet<String>) {
        let inner = self.inner.borrow();
        if let Some(parent) = &inner.parent {
            parent.collect_keys(keys);
        }

        for (key, contents) in inner.vars.iter() {
            match contents {
                Some(_) => keys.insert(key.clone()),
                None => keys.remove(key),
            };
        }
    }

    /// Move `old`'s value and flags onto `new`. The value replaces `new`'s value; flags are merged.
    pub fn rename_var(&self, old: &str, new: &str) -> DataSmartResult<()> {
        let source = self
            .get_variable(old)
            .ok_or_else(|| DataSmartError::NoSuchVariable(old.to_string()))?;

        self.modify_variable(new, |target| {
            if source.value.is_some() {
                target.value = source.value;
            }
            target.flags.extend(source.flags);
        });
        self.del_var(old);
        Ok(())
    }

    /// Expand `input` against this store.
    ///
    /// A malformed reference yields an empty string rather than an error; missing upper-case
    /// variables and failing embedded expressions are errors.
    pub fn expand(&self, input: &str) -> DataSmartResult<String> {
        match self.expander.expand(input, self, false) {
            Ok(expanded) => Ok(expanded),
            Err(ExpansionError::UnterminatedToken(raw)) => {
                warn!("unterminated variable reference in {:?}, expanding to nothing", raw);
                Ok(String::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rename every variable whose name contains a reference to its expanded name.
    pub fn expand_keys(&self) -> DataSmartResult<()> {
        for key in self.keys().into_iter().filter(|k| k.contains("${")) {
            let expanded = match self.expander.expand(&key, self, false) {
                Ok(expanded) => expanded,
                Err(e) => {
                    warn!("unable to expand variable key {}: {}", key, e);
                    continue;
                }
            };

            if expanded == key || expanded.is_empty() {
                continue;
            }

            if self.get_variable(&expanded).is_some() {
                warn!(
                    "Variable key {} ({}) replaces original key {}",
                    key, expanded, expanded
                );
            }
            self.rename_var(&key, &expanded)?;
        }

        Ok(())
    }
}
