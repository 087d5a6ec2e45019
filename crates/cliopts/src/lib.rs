//! Command-line option parsing against a declarative option format.
//!
//! Tokens starting with `-` are options (`--name`, `--name=value`, `-n`,
//! `-nvalue`); everything else is a positional argument.
//!
//! - Without a [`Format`], every option is accepted and repeated options are
//!   collected into a list.
//! - With a [`Format`], short aliases resolve to long names and each option is
//!   checked against its declared shape (flag, mixed, many), coerced to its
//!   type (`string`, `int`, `id`), passed through an optional filter, and
//!   absent options get their defaults.
//!
//! ```
//! use cliopts::{Format, OptionFormat, Value, ValueType};
//!
//! let format = Format::new()
//!     .option("verbose", OptionFormat::new().short('v').flag())
//!     .option("level", OptionFormat::new().short('l').value_type(ValueType::Int).defaults(1i64));
//!
//! let parsed = format.parse(&["-v", "--level=3", "input.txt"]).unwrap();
//! assert_eq!(parsed.args, ["input.txt"]);
//! assert_eq!(parsed.get("verbose"), Some(&Value::Bool(true)));
//! assert_eq!(parsed.get("level"), Some(&Value::Int(3)));
//! ```

mod error;
mod format;
mod help;
mod parse;
mod value;

pub use error::{ErrorKind, FilterError, ParseError, ParseResult};
pub use format::{Filter, Format, OptionFormat, ValueType};
pub use help::help;
pub use parse::{HOST_RESERVED_ARGS, Parsed, parse, parse_from_env, parse_from_host};
pub use value::Value;
