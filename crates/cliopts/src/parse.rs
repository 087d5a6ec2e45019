//! Tokenizing an argument vector and resolving its options.

use std::collections::HashMap;
use std::ffi::OsString;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};
use crate::format::{Format, OptionFormat, ValueType};
use crate::value::Value;

/// Leading host arguments skipped by [`parse_from_env`] (the program path).
pub const HOST_RESERVED_ARGS: usize = 1;

/// Positional arguments and resolved options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parsed {
    /// Tokens not starting with `-`, in input order.
    pub args: Vec<String>,
    /// Option name => value. With a format, keys are long names.
    pub options: IndexMap<String, Value>,
}

impl Parsed {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionName<'a> {
    Short(char),
    Long(&'a str),
}

/// The value part of an option token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawValue<'a> {
    /// `--name` or `-n`: the option is present without a value.
    Present,
    /// `--name=value` or `-nvalue`.
    Given(&'a str),
}

impl RawValue<'_> {
    fn into_value(self) -> Value {
        match self {
            Self::Present => Value::Bool(true),
            Self::Given(s) => Value::Str(s.to_string()),
        }
    }
}

/// Split an option token (starting with `-`) into name and value.
fn split_option(token: &str) -> ParseResult<(OptionName<'_>, RawValue<'_>)> {
    if let Some(body) = token.strip_prefix("--") {
        // Only the first `=` separates; the rest belongs to the value.
        let (name, value) = match body.split_once('=') {
            Some((name, value)) => (name, RawValue::Given(value)),
            None => (body, RawValue::Present),
        };
        if name.is_empty() {
            return Err(ParseError::EmptyOption);
        }
        return Ok((OptionName::Long(name), value));
    }

    let body = token.strip_prefix('-').unwrap_or(token);
    let mut chars = body.chars();
    let Some(name) = chars.next() else {
        return Err(ParseError::EmptyOption);
    };
    let rest = chars.as_str();
    let value = if rest.is_empty() {
        RawValue::Present
    } else {
        RawValue::Given(rest)
    };
    Ok((OptionName::Short(name), value))
}

/// Per-key storage in raw mode: absent -> single -> many.
#[derive(Debug)]
enum Slot {
    Single(Value),
    Many(Vec<Value>),
}

impl Slot {
    fn push(&mut self, value: Value) {
        match self {
            Self::Many(items) => items.push(value),
            Self::Single(first) => {
                let first = std::mem::replace(first, Value::Bool(false));
                *self = Self::Many(vec![first, value]);
            }
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Single(value) => value,
            Self::Many(items) => Value::List(items),
        }
    }
}

/// Parse `argv`.
///
/// Without a format every option is accepted as-is and repeated options are
/// collected into a list. With a format, options are resolved to their long
/// names, validated, coerced and completed with defaults.
///
/// The first problem found aborts the parse.
pub fn parse<S: AsRef<str>>(argv: &[S], format: Option<&Format>) -> ParseResult<Parsed> {
    let parsed = match format {
        Some(format) => parse_with_format(argv, format)?,
        None => parse_raw(argv)?,
    };
    tracing::debug!(
        args = parsed.args.len(),
        options = parsed.options.len(),
        with_format = format.is_some(),
        "parsed argument vector"
    );
    Ok(parsed)
}

/// Parse the arguments of the running process, skipping the program path.
///
/// Arguments that are not valid UTF-8 are converted lossily.
pub fn parse_from_env(format: Option<&Format>) -> ParseResult<Parsed> {
    parse_from_host(std::env::args_os(), format)
}

/// Parse a host-style argument list whose first [`HOST_RESERVED_ARGS`]
/// entries are not arguments.
pub fn parse_from_host<I>(host_args: I, format: Option<&Format>) -> ParseResult<Parsed>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let argv: Vec<String> = host_args
        .into_iter()
        .skip(HOST_RESERVED_ARGS)
        .map(|arg| {
            let arg: OsString = arg.into();
            arg.to_string_lossy().into_owned()
        })
        .collect();
    parse(&argv, format)
}

fn parse_raw<S: AsRef<str>>(argv: &[S]) -> ParseResult<Parsed> {
    let mut args = Vec::new();
    let mut slots: IndexMap<String, Slot> = IndexMap::new();

    for arg in argv {
        let arg = arg.as_ref();
        if !arg.starts_with('-') {
            args.push(arg.to_string());
            continue;
        }

        let (name, raw) = split_option(arg)?;
        let key = match name {
            OptionName::Short(c) => c.to_string(),
            OptionName::Long(name) => name.to_string(),
        };
        tracing::trace!(option = %key, ?raw, "raw option");

        let value = raw.into_value();
        match slots.get_mut(&key) {
            Some(slot) => slot.push(value),
            None => {
                slots.insert(key, Slot::Single(value));
            }
        }
    }

    Ok(Parsed {
        args,
        options: slots
            .into_iter()
            .map(|(name, slot)| (name, slot.into_value()))
            .collect(),
    })
}

fn short_index(format: &Format) -> HashMap<char, (&str, &OptionFormat)> {
    format
        .iter()
        .filter_map(|(name, f)| f.short.map(|c| (c, (name, f))))
        .collect()
}

fn parse_with_format<S: AsRef<str>>(argv: &[S], format: &Format) -> ParseResult<Parsed> {
    let shorts = short_index(format);
    let mut args = Vec::new();
    let mut options: IndexMap<String, Value> = IndexMap::new();

    for arg in argv {
        let arg = arg.as_ref();
        if !arg.starts_with('-') {
            args.push(arg.to_string());
            continue;
        }

        let (name, raw) = split_option(arg)?;
        let (long, option_format) = match name {
            OptionName::Short(c) => shorts
                .get(&c)
                .copied()
                .ok_or(ParseError::UnknownShort(c))?,
            OptionName::Long(name) => format
                .get(name)
                .map(|f| (name, f))
                .ok_or_else(|| ParseError::UnknownLong(name.to_string()))?,
        };
        tracing::trace!(option = long, ?raw, "resolved option");

        resolve(long, raw, option_format, &mut options)?;
    }

    fill_defaults(format, &mut options)?;
    Ok(Parsed { args, options })
}

/// Validate one occurrence and store it under its long name.
fn resolve(
    name: &str,
    raw: RawValue<'_>,
    format: &OptionFormat,
    options: &mut IndexMap<String, Value>,
) -> ParseResult<()> {
    let value = validate(name, raw, format, options.get(name))?;

    if let Some(current) = options.get_mut(name) {
        if !format.many {
            return Err(ParseError::Duplicate(name.to_string()));
        }
        match current {
            Value::List(items) => items.push(value),
            scalar => {
                let first = std::mem::replace(scalar, Value::List(Vec::new()));
                *scalar = Value::List(vec![first, value]);
            }
        }
        return Ok(());
    }

    let stored = if format.many {
        // A list default is a seed; a scalar default only applies when absent.
        match &format.defaults {
            Some(Value::List(seed)) => {
                let mut items = seed.clone();
                items.push(value);
                Value::List(items)
            }
            _ => Value::List(vec![value]),
        }
    } else {
        value
    };
    options.insert(name.to_string(), stored);
    Ok(())
}

fn validate(
    name: &str,
    raw: RawValue<'_>,
    format: &OptionFormat,
    current: Option<&Value>,
) -> ParseResult<Value> {
    let value = match raw {
        RawValue::Present => {
            if !format.flag {
                return Err(ParseError::NotFlag(name.to_string()));
            }
            Value::Bool(true)
        }
        RawValue::Given(s) => {
            if format.flag && !format.mixed {
                return Err(ParseError::IsFlag(name.to_string()));
            }
            coerce(name, s, format.value_type)?
        }
    };

    match &format.filter {
        Some(filter) => filter
            .apply(value, name, current)
            .map_err(|source| ParseError::Filter {
                name: name.to_string(),
                source,
            }),
        None => Ok(value),
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn coerce(name: &str, s: &str, value_type: ValueType) -> ParseResult<Value> {
    match value_type {
        ValueType::String => Ok(Value::Str(s.to_string())),
        ValueType::Int => {
            let digits = s.strip_prefix('-').unwrap_or(s);
            if !is_digits(digits) {
                return Err(ParseError::NotInteger(name.to_string()));
            }
            s.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ParseError::NotInteger(name.to_string()))
        }
        ValueType::Id => {
            if !s.starts_with(|c: char| matches!(c, '1'..='9')) || !is_digits(s) {
                return Err(ParseError::NotPositiveInteger(name.to_string()));
            }
            s.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ParseError::NotPositiveInteger(name.to_string()))
        }
    }
}

/// Give every declared option missing from `options` its default.
fn fill_defaults(format: &Format, options: &mut IndexMap<String, Value>) -> ParseResult<()> {
    for (name, option_format) in format.iter() {
        if options.contains_key(name) {
            continue;
        }
        let value = match &option_format.defaults {
            Some(defaults) => defaults.clone(),
            None if option_format.flag => Value::Bool(false),
            None => return Err(ParseError::Required(name.to_string())),
        };
        let value = if option_format.many {
            value.into_list()
        } else {
            value
        };
        tracing::debug!(option = name, ?value, "using default");
        options.insert(name.to_string(), value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn options(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn strs(items: &[&str]) -> Value {
        Value::from(items.to_vec())
    }

    #[test]
    fn raw_mode_collects_args_and_repeated_options() {
        let argv = ["-x", "--opt=value", "-yz", "--opt", "--opt=add", "arg1", "arg2"];
        let parsed = parse(&argv, None).unwrap();
        assert_eq!(parsed.args, ["arg1", "arg2"]);
        assert_eq!(
            parsed.options,
            options(&[
                ("x", Value::Bool(true)),
                (
                    "opt",
                    Value::List(vec![
                        Value::from("value"),
                        Value::Bool(true),
                        Value::from("add"),
                    ])
                ),
                ("y", Value::from("z")),
            ])
        );
    }

    #[test]
    fn raw_mode_values_and_flags() {
        let parsed = parse(&["-a", "--b", "--c="], None).unwrap();
        assert_eq!(parsed.get("a"), Some(&Value::Bool(true)));
        assert_eq!(parsed.get("b"), Some(&Value::Bool(true)));
        assert_eq!(parsed.get("c"), Some(&Value::from("")));
    }

    #[test]
    fn only_first_equals_separates_the_value() {
        let parsed = parse(&["--option-name=option=value"], None).unwrap();
        assert_eq!(
            parsed.options,
            options(&[("option-name", Value::from("option=value"))])
        );
    }

    #[test]
    fn empty_options_are_rejected() {
        for token in ["-", "--", "--=value"] {
            let err = parse(&[token], None).unwrap_err();
            assert!(matches!(err, ParseError::EmptyOption), "{token}: {err:?}");
            assert_eq!(err.kind(), ErrorKind::Syntax);
        }
    }

    #[test]
    fn accepts_owned_argument_vectors() {
        let argv: Vec<String> = vec!["pos".to_string(), "-q".to_string()];
        let parsed = parse(&argv, None).unwrap();
        assert_eq!(parsed.args, ["pos"]);
        assert_eq!(parsed.get("q"), Some(&Value::Bool(true)));
    }

    #[test]
    fn short_aliases_resolve_to_long_names() {
        let format = Format::new()
            .option("one", OptionFormat::new().short('o').flag())
            .option("two", OptionFormat::new().short('t').many());
        let parsed = format.parse(&["-o", "-t1", "--two=2", "-t3"]).unwrap();
        assert!(parsed.args.is_empty());
        assert_eq!(
            parsed.options,
            options(&[("one", Value::Bool(true)), ("two", strs(&["1", "2", "3"]))])
        );
    }

    #[test]
    fn defaults_fill_absent_options() {
        let format = Format::new()
            .option("one", OptionFormat::new().short('o').defaults("1"))
            .option("two", OptionFormat::new().short('t').defaults("2"));
        let parsed = format.parse(&["-o3"]).unwrap();
        assert_eq!(
            parsed.options,
            options(&[("one", Value::from("3")), ("two", Value::from("2"))])
        );
    }

    #[test]
    fn many_wraps_single_occurrences() {
        let format = Format::new()
            .option("one", OptionFormat::new().short('o').many())
            .option("two", OptionFormat::new().short('t'));
        let parsed = format.parse(&["--one=1", "--two=2", "arg"]).unwrap();
        assert_eq!(parsed.args, ["arg"]);
        assert_eq!(
            parsed.options,
            options(&[("one", strs(&["1"])), ("two", Value::from("2"))])
        );
    }

    #[test]
    fn flags_and_mixed_flags() {
        let format = Format::new()
            .option("one", OptionFormat::new().short('o').flag())
            .option("two", OptionFormat::new().short('t').mixed())
            .option("three", OptionFormat::new().many().mixed());
        let parsed = format
            .parse(&["-o", "-tstr", "--three", "--three=s", "arg"])
            .unwrap();
        assert_eq!(parsed.args, ["arg"]);
        assert_eq!(
            parsed.options,
            options(&[
                ("one", Value::Bool(true)),
                ("two", Value::from("str")),
                ("three", Value::List(vec![Value::Bool(true), Value::from("s")])),
            ])
        );
    }

    #[test]
    fn typed_values_are_converted() {
        let format = Format::new()
            .option("one", OptionFormat::new().short('o').value_type(ValueType::Int))
            .option("two", OptionFormat::new().short('t').value_type(ValueType::Id));
        let parsed = format.parse(&["-o-1", "-t2", "arg"]).unwrap();
        assert_eq!(parsed.args, ["arg"]);
        assert_eq!(parsed.get("one"), Some(&Value::Int(-1)));
        assert_eq!(parsed.get("two"), Some(&Value::Int(2)));
    }

    #[test]
    fn absent_flags_default_to_false() {
        let format = Format::new()
            .option("one", OptionFormat::new().flag())
            .option("two", OptionFormat::new().flag());
        let parsed = format.parse(&["--one"]).unwrap();
        assert_eq!(
            parsed.options,
            options(&[("one", Value::Bool(true)), ("two", Value::Bool(false))])
        );
    }

    #[test]
    fn unknown_options_are_rejected() {
        let format = Format::new().option("one", OptionFormat::new().short('o'));

        let err = format.parse(&["--one=1", "--two=2"]).unwrap_err();
        assert!(matches!(&err, ParseError::UnknownLong(name) if name == "two"));
        assert_eq!(err.to_string(), "unknown option '--two'");

        let err = format.parse(&["-x"]).unwrap_err();
        assert!(matches!(err, ParseError::UnknownShort('x')));
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn flag_shape_is_enforced() {
        let format = Format::new()
            .option("one", OptionFormat::new().flag().defaults(false))
            .option("two", OptionFormat::new());

        assert!(format.parse(&["--one", "--two=value"]).is_ok());

        let err = format.parse(&["--one", "--two"]).unwrap_err();
        assert!(matches!(&err, ParseError::NotFlag(name) if name == "two"));

        let err = format.parse(&["--one=v", "--two=v"]).unwrap_err();
        assert!(matches!(&err, ParseError::IsFlag(name) if name == "one"));
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn repeats_need_many() {
        let format = Format::new()
            .option("one", OptionFormat::new().many())
            .option("two", OptionFormat::new());

        let parsed = format.parse(&["--one=1", "--two=2", "--one=3"]).unwrap();
        assert_eq!(
            parsed.options,
            options(&[("one", strs(&["1", "3"])), ("two", Value::from("2"))])
        );

        let err = format
            .parse(&["--one=1", "--two=2", "--one=3", "--two=4"])
            .unwrap_err();
        assert!(matches!(&err, ParseError::Duplicate(name) if name == "two"));
    }

    #[test]
    fn same_input_succeeds_once_declared_many() {
        let argv = ["--n=a", "--n=b"];
        let single = Format::new().option("n", OptionFormat::new());
        assert!(matches!(
            single.parse(&argv).unwrap_err(),
            ParseError::Duplicate(_)
        ));

        let many = Format::new().option("n", OptionFormat::new().many());
        assert_eq!(many.parse(&argv).unwrap().get("n"), Some(&strs(&["a", "b"])));
    }

    #[test]
    fn int_boundaries() {
        let format = Format::new().option("n", OptionFormat::new().value_type(ValueType::Int));
        for (input, expected) in [("-1", -1), ("0", 0), ("12", 12)] {
            let arg = format!("--n={input}");
            assert_eq!(
                format.parse(&[arg]).unwrap().get("n"),
                Some(&Value::Int(expected))
            );
        }
        for input in ["1.1", "abc", "s", "", "-", "+1", "99999999999999999999"] {
            let err = format.parse(&[format!("--n={input}")]).unwrap_err();
            assert!(matches!(err, ParseError::NotInteger(_)), "{input}: {err:?}");
            assert_eq!(err.kind(), ErrorKind::Type);
        }
    }

    #[test]
    fn id_boundaries() {
        let format = Format::new().option("n", OptionFormat::new().value_type(ValueType::Id));
        for (input, expected) in [("1", 1), ("23", 23)] {
            assert_eq!(
                format.parse(&[format!("--n={input}")]).unwrap().get("n"),
                Some(&Value::Int(expected))
            );
        }
        for input in ["0", "01", "-1", "-2", "1.5", "x"] {
            let err = format.parse(&[format!("--n={input}")]).unwrap_err();
            assert!(
                matches!(err, ParseError::NotPositiveInteger(_)),
                "{input}: {err:?}"
            );
        }
    }

    #[test]
    fn required_options_must_be_given() {
        let format = Format::new()
            .option("one", OptionFormat::new().defaults("value"))
            .option("two", OptionFormat::new().short('t'));

        assert!(format.parse(&["--two=1", "arg"]).is_ok());

        let parsed = format.parse(&["--one=s", "-t=2", "arg"]).unwrap();
        assert_eq!(parsed.get("two"), Some(&Value::from("=2")));

        let err = format.parse(&["--one=s", "arg"]).unwrap_err();
        assert!(matches!(&err, ParseError::Required(name) if name == "two"));
        assert_eq!(err.kind(), ErrorKind::Completeness);
        assert_eq!(err.option(), Some("two"));
    }

    #[test]
    fn first_missing_required_option_is_reported() {
        let format = Format::new()
            .option("b", OptionFormat::new())
            .option("a", OptionFormat::new());
        let err = format.parse(&["x"]).unwrap_err();
        assert!(matches!(&err, ParseError::Required(name) if name == "b"));
    }

    #[test]
    fn many_defaults_seed_or_wrap() {
        let format = Format::new()
            .option("one", OptionFormat::new().many().mixed().defaults("value"))
            .option("two", OptionFormat::new().many().defaults(vec!["a", "b"]))
            .option("three", OptionFormat::new().many().defaults("value"))
            .option("four", OptionFormat::new().many().flag());
        let parsed = format
            .parse(&["--one=1", "--one", "--two=3", "--two=4"])
            .unwrap();
        assert_eq!(
            parsed.options,
            options(&[
                ("one", Value::List(vec![Value::from("1"), Value::Bool(true)])),
                ("two", strs(&["a", "b", "3", "4"])),
                ("three", strs(&["value"])),
                ("four", Value::List(vec![Value::Bool(false)])),
            ])
        );
    }

    #[test]
    fn filter_sees_previous_value() {
        let plus = 2;
        let format = Format::new().option(
            "opt",
            OptionFormat::new()
                .value_type(ValueType::Id)
                .many()
                .filter(move |value, name, current| {
                    if name != "opt" {
                        return Err(format!("unexpected name {name}").into());
                    }
                    let Some(mut n) = value.as_int() else {
                        return Err("expected an integer".into());
                    };
                    if let Some(first) = current
                        .and_then(Value::as_list)
                        .and_then(|items| items.first())
                        .and_then(Value::as_int)
                    {
                        n += first;
                    }
                    Ok(Value::Int(n + plus))
                }),
        );
        let parsed = format.parse(&["--opt=1", "--opt=2"]).unwrap();
        assert_eq!(
            parsed.options,
            options(&[("opt", Value::List(vec![Value::Int(3), Value::Int(7)]))])
        );
    }

    #[test]
    fn filter_failure_aborts_parse() {
        let format = Format::new().option(
            "level",
            OptionFormat::new()
                .value_type(ValueType::Int)
                .filter(|value, _, _| match value.as_int() {
                    Some(n) if n < 10 => Ok(value),
                    _ => Err("level must be below 10".into()),
                }),
        );
        assert!(format.parse(&["--level=3"]).is_ok());

        let err = format.parse(&["--level=12", "arg"]).unwrap_err();
        assert_eq!(err.to_string(), "level must be below 10");
        assert_eq!(err.option(), Some("level"));
    }

    #[test]
    fn filter_runs_on_flag_presence() {
        let format = Format::new().option(
            "verbose",
            OptionFormat::new()
                .short('v')
                .flag()
                .many()
                .filter(|_, _, current| {
                    let seen = current.and_then(Value::as_list).map_or(0, <[Value]>::len);
                    Ok(Value::Int(seen as i64 + 1))
                }),
        );
        let parsed = format.parse(&["-v", "-v", "-v"]).unwrap();
        assert_eq!(parsed.get("verbose"), Some(&Value::from(vec![1i64, 2, 3])));
    }

    #[test]
    fn non_ascii_short_aliases() {
        let format = Format::new().option("lambda", OptionFormat::new().short('λ'));
        let parsed = format.parse(&["-λx"]).unwrap();
        assert_eq!(parsed.get("lambda"), Some(&Value::from("x")));
    }

    #[test]
    fn inputs_are_left_untouched() {
        let format = Format::new().option("tag", OptionFormat::new().many().defaults(vec!["a"]));
        let argv = vec!["--tag=b".to_string()];
        let first = format.parse(&argv).unwrap();
        let second = format.parse(&argv).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.get("tag"), Some(&strs(&["a", "b"])));
        assert_eq!(format.get("tag").unwrap().defaults, Some(strs(&["a"])));
    }

    #[test]
    fn host_adapter_skips_program_path() {
        let format = Format::new().option("n", OptionFormat::new().value_type(ValueType::Id));
        let host = ["/usr/bin/tool", "--n=4", "file"];
        let parsed = parse_from_host(host, Some(&format)).unwrap();
        assert_eq!(parsed.args, ["file"]);
        assert_eq!(parsed.get("n"), Some(&Value::Int(4)));

        let parsed = parse_from_host(["/usr/bin/tool"], None).unwrap();
        assert_eq!(parsed, Parsed::default());
    }

    #[test]
    fn formats_can_be_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Format>();
    }

    #[test]
    fn parsed_serializes_to_json() {
        let parsed = parse(&["-x", "file", "--n=1", "--n=2"], None).unwrap();
        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(
            json,
            r#"{"args":["file"],"options":{"x":true,"n":["1","2"]}}"#
        );
    }
}
