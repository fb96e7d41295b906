//! Cached option bags
//!
//! An [`OptionBag`] is a namespace of named values for one component (the
//! orchestrator itself, one dependency, the dependency search path). Values
//! come from three places, strongest first:
//!
//! 1. command-line switches declared with [`OptionBag::add_option`],
//! 2. persisted state restored through the cache,
//! 3. configuration files merged with [`OptionBag::state_merge`].
//!
//! Only names declared as cached end up in the persisted state.

use crate::cache::Cacheable;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Shared handle to an option bag that is also registered with a cache
pub type SharedOptions = Rc<RefCell<OptionBag>>;

/// Shape of a declared switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    /// Takes a value; `multi` accumulates repeated occurrences into a list
    Value { multi: bool, unique: bool },
    /// Boolean switch that sets its value to `true`
    Flag,
}

/// A command-line switch bound to a named value
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub short: Option<char>,
    pub long: String,
    pub dest: String,
    pub kind: OptionKind,
    pub metavar: Option<String>,
    pub help: String,
    pub choices: Vec<String>,
    pub heading: Option<String>,
    default: Option<Value>,
    cache: bool,
    show_default: bool,
}

impl OptionSpec {
    /// Declare a value-taking switch from `"-c|--configuration"` style flags
    pub fn value(flags: &str, dest: impl Into<String>) -> Self {
        Self::build(
            flags,
            dest.into(),
            OptionKind::Value {
                multi: false,
                unique: true,
            },
        )
    }

    /// Declare a boolean switch
    pub fn flag(flags: &str, dest: impl Into<String>) -> Self {
        Self::build(flags, dest.into(), OptionKind::Flag)
    }

    fn build(flags: &str, dest: String, kind: OptionKind) -> Self {
        let mut short = None;
        let mut long = dest.replace('_', "-");
        for flag in flags.split('|') {
            if let Some(name) = flag.strip_prefix("--") {
                long = name.to_string();
            } else if let Some(name) = flag.strip_prefix('-') {
                short = name.chars().next();
            }
        }

        Self {
            short,
            long,
            dest,
            kind,
            metavar: None,
            help: String::new(),
            choices: Vec::new(),
            heading: None,
            default: None,
            cache: true,
            show_default: true,
        }
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Accumulate repeated occurrences into a list
    pub fn multi(mut self) -> Self {
        if let OptionKind::Value { multi, .. } = &mut self.kind {
            *multi = true;
        }
        self
    }

    /// Do not persist this value in the cache
    pub fn no_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    /// Do not render the current value as `[default: ...]`
    pub fn hide_default(mut self) -> Self {
        self.show_default = false;
        self
    }
}

/// Named values of one component, partially persisted
#[derive(Debug, Clone, Default)]
pub struct OptionBag {
    key: Option<String>,
    values: BTreeMap<String, Value>,
    cached: BTreeSet<String>,
    specs: Vec<OptionSpec>,
}

impl OptionBag {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// A bag that is never registered with a cache
    pub fn unkeyed() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedOptions {
        Rc::new(RefCell::new(self))
    }

    /// Current value, treating an explicit `null` as unset
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get_list(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set `name` only if it is unset
    pub fn ensure_value(&mut self, name: &str, value: impl Into<Value>) {
        if !self.is_set(name) {
            self.values.insert(name.to_string(), value.into());
        }
    }

    /// Replace a scalar value, or append to a list value
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>, unique: bool) {
        let value = value.into();
        match self.values.get_mut(name) {
            Some(Value::Array(current)) => {
                let incoming = match value {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                for item in incoming {
                    if !unique || !current.contains(&item) {
                        current.push(item);
                    }
                }
            }
            _ => {
                self.values.insert(name.to_string(), value);
            }
        }
    }

    /// Fill unset values from `values`, never overwriting what is already set
    pub fn state_merge<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in values {
            self.ensure_value(name.as_ref(), value);
        }
    }

    /// Declare a switch and bind it to its destination value
    pub fn add_option(&mut self, mut spec: OptionSpec) {
        match spec.kind {
            OptionKind::Flag => self.ensure_value(&spec.dest, false),
            OptionKind::Value { multi, .. } => {
                let default = match spec.default.take() {
                    Some(value) => value,
                    None if multi => Value::Array(Vec::new()),
                    None => Value::Null,
                };
                self.ensure_value(&spec.dest, default);
            }
        }

        if spec.show_default {
            if let Some(rendered) = self.render_default(&spec) {
                spec.help = format!("{} [default: {}]", spec.help, rendered);
            }
        }

        if spec.cache {
            self.cached.insert(spec.dest.clone());
        }
        self.specs.push(spec);
    }

    fn render_default(&self, spec: &OptionSpec) -> Option<String> {
        if spec.kind == OptionKind::Flag {
            return None;
        }
        match self.get(&spec.dest)? {
            Value::Array(items) if items.is_empty() => None,
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(display_value)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            other => Some(display_value(other)),
        }
    }

    /// Switches declared on this bag, in declaration order
    pub fn specs(&self) -> &[OptionSpec] {
        &self.specs
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Cacheable for OptionBag {
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn state(&self) -> Value {
        let state: Map<String, Value> = self
            .values
            .iter()
            .filter(|(name, value)| self.cached.contains(*name) && !value.is_null())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Value::Object(state)
    }

    fn set_state(&mut self, state: Value) {
        if let Value::Object(values) = state {
            self.values.extend(values);
        }
    }
}
