//! Key-value token parser
//!
//! This module turns loosely formatted tokens such as `--user-name=mig`,
//! `size:11` or a bare `running` flag into an ordered map of typed values,
//! merged over a set of defaults.

use crate::deserializer::MapDeserializer;
use crate::error::KvError;
use crate::separator::Separator;
use crate::value::{Map, Value};
use indexmap::map::Entry;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

/// Configuration options for the parser
#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
    /// Pattern that divides a token into key and value segments
    pub separator: Separator,
    /// Strip a leading `--` and collapse whitespace/hyphen runs in keys to `_`
    pub normalize_keys: bool,
    /// Convert value strings into booleans, integers and floats
    pub typecast_values: bool,
    /// Split every separator occurrence, producing array values for
    /// tokens with more than one value segment
    pub array_values: bool,
}

impl ParserConfig {
    /// Creates a new parser configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the separator
    pub fn with_separator(mut self, separator: Separator) -> Self {
        self.separator = separator;
        self
    }

    /// Sets whether keys are normalized
    pub fn with_normalize_keys(mut self, normalize: bool) -> Self {
        self.normalize_keys = normalize;
        self
    }

    /// Sets whether values are typecast
    pub fn with_typecast_values(mut self, typecast: bool) -> Self {
        self.typecast_values = typecast;
        self
    }

    /// Sets whether tokens may produce array values
    pub fn with_array_values(mut self, arrays: bool) -> Self {
        self.array_values = arrays;
        self
    }

    /// Builds a configuration from loosely specified options.
    ///
    /// Options left unset keep their default. A separator that cannot be
    /// compiled is reported here rather than when parsing.
    pub fn from_options(options: &ParserOptions) -> Result<Self, KvError> {
        let mut config = Self::default();

        if let Some(pattern) = &options.separator_pattern {
            config.separator = Separator::pattern(pattern)?;
        } else if let Some(literal) = &options.separator {
            config.separator = Separator::literal(literal)?;
        }
        if let Some(normalize) = options.normalize_keys {
            config.normalize_keys = normalize;
        }
        if let Some(typecast) = options.typecast_values {
            config.typecast_values = typecast;
        }
        if let Some(arrays) = options.array_values {
            config.array_values = arrays;
        }

        Ok(config)
    }

    fn split_limit(&self) -> Option<usize> {
        if self.array_values { None } else { Some(2) }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            separator: Separator::default(),
            normalize_keys: true,
            typecast_values: true,
            array_values: true,
        }
    }
}

/// Parser options as loaded from data (JSON, environment-derived maps, ...)
///
/// Every field is optional and unrecognized fields are ignored, so option
/// sets written for newer versions still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Literal separator text, matched exactly
    pub separator: Option<String>,
    /// Regular expression separator; takes precedence over `separator`
    pub separator_pattern: Option<String>,
    pub normalize_keys: Option<bool>,
    pub typecast_values: Option<bool>,
    pub array_values: Option<bool>,
}

/// Parser for key-value tokens
///
/// Configuration is fixed at construction and `parse` never mutates the
/// parser, so one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct KeyValueParser {
    defaults: Map,
    config: ParserConfig,
}

impl KeyValueParser {
    /// Creates a parser with the given defaults and the default configuration
    pub fn new(defaults: Map) -> Self {
        Self::with_config(defaults, ParserConfig::default())
    }

    /// Creates a parser with the given defaults and configuration
    pub fn with_config(defaults: Map, config: ParserConfig) -> Self {
        debug!(
            separator = %config.separator,
            normalize_keys = config.normalize_keys,
            typecast_values = config.typecast_values,
            array_values = config.array_values,
            defaults = defaults.len(),
            "created key-value parser"
        );
        Self { defaults, config }
    }

    /// Creates a parser from loosely specified options
    pub fn from_options(defaults: Map, options: &ParserOptions) -> Result<Self, KvError> {
        Ok(Self::with_config(defaults, ParserConfig::from_options(options)?))
    }

    /// Returns the defaults every parse result is merged over
    pub fn defaults(&self) -> &Map {
        &self.defaults
    }

    /// Returns the parser configuration
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses a sequence of tokens into a map merged over the defaults.
    ///
    /// When several tokens produce the same key the last one wins. Parsed
    /// entries replace defaults with the same key; defaults that were not
    /// mentioned are returned untouched.
    pub fn parse<I, S>(&self, tokens: I) -> Map
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parse_with(tokens, self.config.typecast_values)
    }

    /// Parses tokens and deserializes the merged map into `T`.
    ///
    /// Values reach the deserializer as token text and are typecast only for
    /// boolean and numeric fields, so string fields keep the text verbatim.
    pub fn parse_into<T, I, S>(&self, tokens: I) -> Result<T, KvError>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw = self.parse_with(tokens, false);
        T::deserialize(MapDeserializer::with_typecast(
            raw,
            self.config.typecast_values,
        ))
    }

    fn parse_with<I, S>(&self, tokens: I, typecast_values: bool) -> Map
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Map::new();
        for token in tokens {
            let (key, value) = self.split_token(token.as_ref(), typecast_values);
            match parsed.entry(key) {
                Entry::Occupied(mut entry) => {
                    debug!(key = %entry.key(), "repeated key overwrites earlier value");
                    entry.insert(value);
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }

        let mut result = self.defaults.clone();
        for (key, value) in parsed {
            match result.entry(key) {
                Entry::Occupied(mut entry) => {
                    debug!(key = %entry.key(), "parsed value overrides default");
                    entry.insert(value);
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
        result
    }

    /// Parses a single token into its key and value
    pub fn parse_token(&self, token: &str) -> (String, Value) {
        self.split_token(token, self.config.typecast_values)
    }

    fn split_token(&self, token: &str, typecast_values: bool) -> (String, Value) {
        let mut segments = self
            .config
            .separator
            .split(token, self.config.split_limit())
            .into_iter();
        let key = segments.next().unwrap_or_default();
        let rest: Vec<&str> = segments.collect();

        trace!(token, key, segments = rest.len(), "split token");

        let raw = match rest.as_slice() {
            [] => Value::Null,
            [single] => Value::String((*single).to_string()),
            many => Value::array(many.iter().copied()),
        };

        let key = if self.config.normalize_keys {
            normalize_key(key)
        } else {
            key.to_string()
        };
        let value = if typecast_values {
            typecast(raw)
        } else {
            raw
        };

        (key, value)
    }
}

/// Normalizes a key: strips one leading `--` and collapses every run of
/// ASCII whitespace and hyphens into a single `_`
pub fn normalize_key(key: &str) -> String {
    let key = key.strip_prefix("--").unwrap_or(key);
    let mut normalized = String::with_capacity(key.len());
    let mut in_run = false;

    for c in key.chars() {
        if is_key_gap(c) {
            if !in_run {
                normalized.push('_');
                in_run = true;
            }
        } else {
            normalized.push(c);
            in_run = false;
        }
    }

    normalized
}

// Hyphen plus the ASCII whitespace set `[ \t\n\v\f\r]`; unlike
// `char::is_ascii_whitespace` this includes vertical tab.
fn is_key_gap(c: char) -> bool {
    matches!(c, '-' | ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Infers a native type for a raw value.
///
/// Arrays are typecast element by element, a missing value becomes `true`,
/// and strings go through [`typecast_str`]. Values that are already typed
/// pass through unchanged.
pub fn typecast(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(Box::new((*items).into_iter().map(typecast).collect())),
        Value::Null => Value::Boolean(true),
        Value::String(s) => typecast_string(s),
        other => other,
    }
}

/// Infers a native type for a single string value
pub fn typecast_str(s: &str) -> Value {
    typecast_string(s.to_string())
}

fn typecast_string(s: String) -> Value {
    match s.as_str() {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }

    if is_float_literal(&s) {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    } else if is_integer_literal(&s) {
        // Out-of-range integers stay strings
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }

    Value::String(s)
}

/// `-?\d*\.\d+` over the whole string
fn is_float_literal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    match unsigned.split_once('.') {
        Some((whole, fraction)) => {
            whole.bytes().all(|b| b.is_ascii_digit())
                && !fraction.is_empty()
                && fraction.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// `-?\d+` over the whole string
fn is_integer_literal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Value {
        Value::array(items.iter().copied())
    }

    #[test]
    fn test_parser_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KeyValueParser>();
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("user-name"), "user_name");
        assert_eq!(normalize_key("machine_name"), "machine_name");
        assert_eq!(normalize_key("why not"), "why_not");
        assert_eq!(normalize_key("--user-name"), "user_name");
        assert_eq!(normalize_key("a - \t-b"), "a_b");
        assert_eq!(normalize_key("---x"), "_x");
        assert_eq!(normalize_key("x--"), "x_");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn test_normalize_key_collapses_ascii_whitespace_only() {
        assert_eq!(normalize_key("why\x0Bnot"), "why_not");
        assert_eq!(normalize_key("why \r\n\x0C-not"), "why_not");
        assert_eq!(normalize_key("why\u{a0}not"), "why\u{a0}not");
    }

    #[test]
    fn test_only_one_leading_double_dash_is_stripped() {
        assert_eq!(normalize_key("----verbose"), "_verbose");
        assert_eq!(normalize_key("-v"), "_v");
    }

    #[test]
    fn test_typecast_booleans() {
        assert_eq!(typecast_str("true"), Value::Boolean(true));
        assert_eq!(typecast_str("false"), Value::Boolean(false));
        assert_eq!(typecast_str("TRUE"), Value::String("TRUE".to_string()));
        assert_eq!(typecast(Value::Null), Value::Boolean(true));
    }

    #[test]
    fn test_typecast_integers() {
        assert_eq!(typecast_str("11"), Value::Integer(11));
        assert_eq!(typecast_str("-5"), Value::Integer(-5));
        assert_eq!(typecast_str("007"), Value::Integer(7));
        assert_eq!(typecast_str("1coconut"), Value::String("1coconut".to_string()));
        assert_eq!(typecast_str("-"), Value::String("-".to_string()));
        assert_eq!(typecast_str("+5"), Value::String("+5".to_string()));
    }

    #[test]
    fn test_typecast_floats() {
        assert_eq!(typecast_str("99.99"), Value::Float(99.99));
        assert_eq!(typecast_str("-5.0"), Value::Float(-5.0));
        assert_eq!(typecast_str(".4"), Value::Float(0.4));
        assert_eq!(typecast_str("-.4"), Value::Float(-0.4));
        assert_eq!(typecast_str("5.0coconut"), Value::String("5.0coconut".to_string()));
        assert_eq!(typecast_str("5."), Value::String("5.".to_string()));
        assert_eq!(typecast_str("1.2.3"), Value::String("1.2.3".to_string()));
        assert_eq!(typecast_str("1e5"), Value::String("1e5".to_string()));
    }

    #[test]
    fn test_integer_overflow_stays_string() {
        let huge = "99999999999999999999999";
        assert_eq!(typecast_str(huge), Value::String(huge.to_string()));
    }

    #[test]
    fn test_typecast_recurses_into_arrays() {
        let raw = strings(&["false", "POST", "500"]);
        assert_eq!(
            typecast(raw),
            Value::array(vec![Value::Boolean(false), "POST".into(), Value::Integer(500)])
        );
    }

    #[test]
    fn test_typecast_leaves_typed_values_alone() {
        assert_eq!(typecast(Value::Integer(3)), Value::Integer(3));
        assert_eq!(typecast(Value::Float(1.5)), Value::Float(1.5));
    }

    #[test]
    fn test_parse_token_segments() {
        let parser = KeyValueParser::default();
        assert_eq!(parser.parse_token("running"), ("running".to_string(), Value::Boolean(true)));
        assert_eq!(parser.parse_token("user:mig"), ("user".to_string(), Value::from("mig")));
        assert_eq!(
            parser.parse_token("numbers:3:5"),
            ("numbers".to_string(), Value::array([3, 5]))
        );
    }

    #[test]
    fn test_parse_token_without_arrays() {
        let parser = KeyValueParser::with_config(
            Map::new(),
            ParserConfig::new().with_array_values(false),
        );
        assert_eq!(parser.parse_token("numbers:3:5"), ("numbers".to_string(), Value::from("3:5")));
        // A trailing separator leaves an empty string value
        assert_eq!(parser.parse_token("key="), ("key".to_string(), Value::from("")));
    }

    #[test]
    fn test_parse_token_raw() {
        let config = ParserConfig::new()
            .with_normalize_keys(false)
            .with_typecast_values(false);
        let parser = KeyValueParser::with_config(Map::new(), config);

        assert_eq!(parser.parse_token("--dev"), ("--dev".to_string(), Value::Null));
        assert_eq!(
            parser.parse_token("crazy:false:maybe"),
            ("crazy".to_string(), strings(&["false", "maybe"]))
        );
    }

    #[test]
    fn test_empty_token() {
        let parser = KeyValueParser::default();
        assert_eq!(parser.parse_token(""), (String::new(), Value::Boolean(true)));
    }

    #[test]
    fn test_config_from_options() {
        let options = ParserOptions {
            separator: Some("|".to_string()),
            array_values: Some(false),
            ..Default::default()
        };
        let config = ParserConfig::from_options(&options).unwrap();

        assert_eq!(config.separator, Separator::literal("|").unwrap());
        assert!(!config.array_values);
        assert!(config.normalize_keys);
        assert!(config.typecast_values);
    }

    #[test]
    fn test_separator_pattern_wins_over_literal() {
        let options = ParserOptions {
            separator: Some("|".to_string()),
            separator_pattern: Some(r"\s*->\s*".to_string()),
            ..Default::default()
        };
        let config = ParserConfig::from_options(&options).unwrap();
        assert_eq!(config.separator.as_str(), r"\s*->\s*");
    }

    #[test]
    fn test_invalid_options_fail_at_construction() {
        let options = ParserOptions {
            separator_pattern: Some("[".to_string()),
            ..Default::default()
        };
        let result = KeyValueParser::from_options(Map::new(), &options);
        assert!(matches!(result, Err(KvError::InvalidSeparator { .. })));
    }
}
