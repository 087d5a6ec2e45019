//! Declarative option format.
//!
//! A [`Format`] maps long option names to an [`OptionFormat`] record. It can
//! be built in code with the builder methods or deserialized from JSON:
//!
//! ```json
//! {
//!   "verbose": { "short": "v", "flag": true, "description": "More output" },
//!   "level":   { "short": "l", "type": "int", "defaults": 1 },
//!   "include": { "short": "I", "many": true, "defaults": [] }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{FilterError, ParseResult};
use crate::value::Value;
use crate::{Parsed, help, parse};

/// How a supplied string value is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Kept as given.
    #[default]
    String,
    /// Optional `-` followed by digits.
    Int,
    /// Positive integer without leading zeros.
    Id,
}

/// Custom per-occurrence transform/validator.
///
/// Receives the coerced value, the option's long name and the value stored
/// for that option before this occurrence (`None` on the first one). The
/// returned value replaces the coerced one; an error aborts the parse and is
/// reported as-is.
pub trait Filter: Send + Sync {
    fn apply(
        &self,
        value: Value,
        name: &str,
        current: Option<&Value>,
    ) -> Result<Value, FilterError>;
}

impl<F> Filter for F
where
    F: Fn(Value, &str, Option<&Value>) -> Result<Value, FilterError> + Send + Sync,
{
    fn apply(
        &self,
        value: Value,
        name: &str,
        current: Option<&Value>,
    ) -> Result<Value, FilterError> {
        self(value, name, current)
    }
}

/// The format of a single option.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OptionFormat {
    /// Single-character alias, used as `-x`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    /// Value used when the option is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Value>,
    /// May be given several times; values accumulate into a list.
    #[serde(default)]
    pub many: bool,
    /// Given without a value; presence means `true`.
    #[serde(default)]
    pub flag: bool,
    /// A flag that also accepts a value.
    #[serde(default)]
    pub mixed: bool,
    #[serde(default, rename = "type")]
    pub value_type: ValueType,
    #[serde(skip)]
    pub filter: Option<Arc<dyn Filter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Placeholder shown in help as `--name=<description_val>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_val: Option<String>,
}

impl fmt::Debug for OptionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionFormat")
            .field("short", &self.short)
            .field("defaults", &self.defaults)
            .field("many", &self.many)
            .field("flag", &self.flag)
            .field("mixed", &self.mixed)
            .field("value_type", &self.value_type)
            .field("filter", &self.filter.as_ref().map(|_| ".."))
            .field("description", &self.description)
            .field("description_val", &self.description_val)
            .finish()
    }
}

impl OptionFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn short(mut self, alias: char) -> Self {
        self.short = Some(alias);
        self
    }

    pub fn defaults(mut self, value: impl Into<Value>) -> Self {
        self.defaults = Some(value.into());
        self
    }

    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    pub fn flag(mut self) -> Self {
        self.flag = true;
        self
    }

    /// Mark as a flag that also accepts a value.
    pub fn mixed(mut self) -> Self {
        self.flag = true;
        self.mixed = true;
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Value, &str, Option<&Value>) -> Result<Value, FilterError> + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Attach a filter implemented as a type rather than a closure.
    pub fn filter_with(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn description_val(mut self, placeholder: impl Into<String>) -> Self {
        self.description_val = Some(placeholder.into());
        self
    }
}

/// Long option name => format, in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Format {
    options: IndexMap<String, OptionFormat>,
}

impl Format {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an option. Redeclaring a name replaces its format.
    pub fn option(mut self, name: impl Into<String>, format: OptionFormat) -> Self {
        self.insert(name, format);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, format: OptionFormat) -> Option<OptionFormat> {
        self.options.insert(name.into(), format)
    }

    pub fn get(&self, name: &str) -> Option<&OptionFormat> {
        self.options.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionFormat)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Parse `argv` against this format.
    pub fn parse<S: AsRef<str>>(&self, argv: &[S]) -> ParseResult<Parsed> {
        parse(argv, Some(self))
    }

    /// Render the help listing for this format.
    pub fn help(&self) -> String {
        help(self)
    }
}

impl<K: Into<String>> FromIterator<(K, OptionFormat)> for Format {
    fn from_iter<I: IntoIterator<Item = (K, OptionFormat)>>(iter: I) -> Self {
        Self {
            options: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
