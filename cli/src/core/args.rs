//! # devserve Declarative Argument Parser
//!
//! File: cli/src/core/args.rs
//!
//! ## Overview
//!
//! A small argument-parsing framework driven by a single ordered table of
//! [`ParameterDefinition`]s. The same table feeds the parser here and the help
//! renderer in `core::help`, so a parameter is declared exactly once.
//!
//! ## Parsing Rules
//!
//! 1. Every parameter starts at its declared default.
//! 2. Tokens are scanned left to right. A help token (`-h`, `-help`, `--help`,
//!    `-?`) stops parsing immediately with [`ArgError::HelpRequested`].
//! 3. A token starting with `-` names a flag parameter (case-insensitive,
//!    `--name` is accepted too). Boolean flags are set by presence; other
//!    kinds consume the next token as their raw value.
//! 4. Any other token is matched to the positional parameter whose position
//!    equals the running positional counter, which then advances.
//! 5. Every produced value is checked against the parameter's validator.
//!
//! [`parse`] never touches the process. [`parse_or_exit`] is the thin wrapper
//! used by `main` that prints usage to stderr and exits with the right code.
//!
//! ## Example
//!
//! ```rust
//! let definitions = vec![
//!     ParameterDefinition::flag("port", &["p", "port"], ValueKind::Number)
//!         .with_default(Value::Number(8080.0))
//!         .describe("Port to listen on"),
//!     ParameterDefinition::positional("dirpath", 0, ValueKind::String)
//!         .with_default(Value::String(".".into())),
//! ];
//! let parsed = parse(&definitions, &["-p", "3000", "www"])?;
//! assert_eq!(parsed.number("port"), Some(3000.0));
//! ```
//!
use crate::core::help;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Spellings that always request the help text, whatever the table declares.
const HELP_NAMES: &[&str] = &["h", "help", "?"];

/// Words accepted as `true` when a boolean parameter receives a raw value.
const TRUTHY_WORDS: &[&str] = &["true", "yes", "y", "on", "1"];

/// The kind of value a parameter holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
}

impl ValueKind {
    /// Placeholder shown in help text after a flag that takes a value.
    pub fn placeholder(self) -> Option<&'static str> {
        match self {
            ValueKind::String => Some("<value>"),
            ValueKind::Number => Some("<n>"),
            ValueKind::Boolean => None,
        }
    }
}

/// A parsed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// How a parameter is spelled on the command line: by named flag or by position.
///
/// The two are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// Accepted spellings, without the leading `-`.
    Flag(&'static [&'static str]),
    /// Zero-based index among the non-flag tokens.
    Positional(usize),
}

/// A validation predicate plus the message shown when it rejects a value.
#[derive(Clone, Copy)]
pub struct Validator {
    pub check: fn(&Value) -> bool,
    pub message: &'static str,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("message", &self.message)
            .finish()
    }
}

/// # Parameter Definition (`ParameterDefinition`)
///
/// Describes one accepted argument. Built with [`ParameterDefinition::flag`] or
/// [`ParameterDefinition::positional`] and refined with the `with_*` / `describe`
/// builder methods.
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    pub key: &'static str,
    pub form: Form,
    pub kind: ValueKind,
    pub default: Option<Value>,
    pub validator: Option<Validator>,
    pub description: &'static str,
}

impl ParameterDefinition {
    /// Declares a named flag parameter.
    pub fn flag(key: &'static str, aliases: &'static [&'static str], kind: ValueKind) -> Self {
        Self {
            key,
            form: Form::Flag(aliases),
            kind,
            default: None,
            validator: None,
            description: "",
        }
    }

    /// Declares a positional parameter at `position`.
    pub fn positional(key: &'static str, position: usize, kind: ValueKind) -> Self {
        Self {
            key,
            form: Form::Positional(position),
            kind,
            default: None,
            validator: None,
            description: "",
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_validator(mut self, check: fn(&Value) -> bool, message: &'static str) -> Self {
        self.validator = Some(Validator { check, message });
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Returns `true` if `name` (already stripped of its flag marker) is one of
    /// this parameter's spellings. Comparison ignores ASCII case.
    fn answers_to(&self, name: &str) -> bool {
        match self.form {
            Form::Flag(aliases) => aliases.iter().any(|a| a.eq_ignore_ascii_case(name)),
            Form::Positional(_) => false,
        }
    }

    /// Converts a raw token into this parameter's value kind.
    fn convert(&self, raw: &str) -> Result<Value, ArgError> {
        match self.kind {
            ValueKind::String => Ok(Value::String(raw.to_string())),
            ValueKind::Number => match raw.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Value::Number(n)),
                _ => Err(ArgError::InvalidValue {
                    key: self.key.to_string(),
                    value: raw.to_string(),
                    reason: "expected a number".to_string(),
                }),
            },
            ValueKind::Boolean => Ok(Value::Boolean(
                TRUTHY_WORDS
                    .iter()
                    .any(|w| w.eq_ignore_ascii_case(raw.trim())),
            )),
        }
    }

    fn validate(&self, value: Value, raw: &str) -> Result<Value, ArgError> {
        match self.validator {
            Some(validator) if !(validator.check)(&value) => Err(ArgError::InvalidValue {
                key: self.key.to_string(),
                value: raw.to_string(),
                reason: validator.message.to_string(),
            }),
            _ => Ok(value),
        }
    }
}

/// Reasons parsing stops without producing a configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgError {
    /// A help token was seen. Not a failure; exits with code 0.
    #[error("help requested")]
    HelpRequested,

    #[error("unknown argument '{0}'")]
    UnknownArgument(String),

    #[error("missing value for parameter '{key}'")]
    MissingValue { key: String },

    #[error("invalid value '{value}' for parameter '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ArgError {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            ArgError::HelpRequested => 0,
            _ => 1,
        }
    }
}

/// The fully populated result of a successful parse, keyed by parameter key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    values: HashMap<&'static str, Value>,
}

impl ParsedArgs {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(Value::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Boolean value of `key`; absent parameters read as `false`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Boolean(true)))
    }
}

/// Strips the flag marker from `token`, returning the flag name.
fn flag_name(token: &str) -> Option<&str> {
    token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))
}

fn is_help_name(name: &str) -> bool {
    HELP_NAMES.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// # Parse Arguments (`parse`)
///
/// Converts `args` (without the program name) into a [`ParsedArgs`] according to
/// `definitions`.
///
/// ## Errors
///
/// - [`ArgError::HelpRequested`] as soon as a help token is seen.
/// - [`ArgError::UnknownArgument`] for a token matching no definition.
/// - [`ArgError::MissingValue`] for a valued flag at the end of the list.
/// - [`ArgError::InvalidValue`] when conversion or validation fails.
pub fn parse<S: AsRef<str>>(
    definitions: &[ParameterDefinition],
    args: &[S],
) -> Result<ParsedArgs, ArgError> {
    let mut values: HashMap<&'static str, Value> = definitions
        .iter()
        .filter_map(|def| def.default.clone().map(|v| (def.key, v)))
        .collect();

    let mut positional_index = 0;
    let mut tokens = args.iter().map(AsRef::as_ref);

    while let Some(token) = tokens.next() {
        match flag_name(token) {
            Some(name) if !name.is_empty() => {
                if is_help_name(name) {
                    return Err(ArgError::HelpRequested);
                }
                let def = definitions
                    .iter()
                    .find(|d| d.answers_to(name))
                    .ok_or_else(|| ArgError::UnknownArgument(token.to_string()))?;

                let value = if def.kind == ValueKind::Boolean {
                    def.validate(Value::Boolean(true), token)?
                } else {
                    let raw = tokens.next().ok_or_else(|| ArgError::MissingValue {
                        key: def.key.to_string(),
                    })?;
                    // Help still wins when it lands in a value slot (`-p -help`).
                    if flag_name(raw).is_some_and(is_help_name) {
                        return Err(ArgError::HelpRequested);
                    }
                    let converted = def.convert(raw)?;
                    def.validate(converted, raw)?
                };
                values.insert(def.key, value);
            }
            _ => {
                let def = definitions
                    .iter()
                    .find(|d| d.form == Form::Positional(positional_index))
                    .ok_or_else(|| ArgError::UnknownArgument(token.to_string()))?;
                let converted = def.convert(token)?;
                values.insert(def.key, def.validate(converted, token)?);
                positional_index += 1;
            }
        }
    }

    Ok(ParsedArgs { values })
}

/// # Parse Or Exit (`parse_or_exit`)
///
/// Runs [`parse`]; on any [`ArgError`] prints the usage text (preceded by the
/// error, unless help was requested) to stderr and exits with
/// [`ArgError::exit_code`].
pub fn parse_or_exit<S: AsRef<str>>(
    program: &str,
    definitions: &[ParameterDefinition],
    args: &[S],
) -> ParsedArgs {
    match parse(definitions, args) {
        Ok(parsed) => parsed,
        Err(err) => {
            if err != ArgError::HelpRequested {
                tracing::debug!("Argument parsing failed: {:?}", err);
                eprintln!("Error: {}\n", err);
            }
            eprint!("{}", help::render_usage(program, definitions));
            std::process::exit(err.exit_code());
        }
    }
}
