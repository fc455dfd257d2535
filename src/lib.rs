//! # kv-typecast
//!
//! Turns loosely formatted key-value tokens, as found in command-line
//! arguments or simple config lines, into an ordered map of typed values.
//!
//! ## Overview
//!
//! Each token is split on a separator (by default `=` or `:` with optional
//! whitespace around it). The left-hand side becomes the key, the rest becomes
//! the value:
//!
//! - `user=mig` and `user : mig` both give `user => "mig"`
//! - `--user-name=mig` gives `user_name => "mig"` (key normalization)
//! - `running` with no separator gives `running => true`
//! - `numbers:3:5` gives `numbers => [3, 5]` (array values)
//! - `size:11`, `ratio:.4`, `dead:false` give an integer, a float and a boolean
//!
//! Repeated keys keep the last value, and the result is merged over the
//! defaults the parser was built with.
//!
//! ## Basic Usage
//!
//! ```rust
//! use kv_typecast::{KeyValueParser, Map, Value};
//!
//! let mut defaults = Map::new();
//! defaults.insert("role".to_string(), Value::from("dev"));
//!
//! let parser = KeyValueParser::new(defaults);
//! let result = parser.parse(["--user-name=mig", "--running", "numbers:3:5"]);
//!
//! assert_eq!(result["user_name"], Value::from("mig"));
//! assert_eq!(result["running"], Value::Boolean(true));
//! assert_eq!(result["numbers"], Value::array([3, 5]));
//! assert_eq!(result["role"], Value::from("dev"));
//! ```
//!
//! ## Configuration
//!
//! Every behavior can be switched off through [`ParserConfig`]:
//!
//! ```rust
//! use kv_typecast::{KeyValueParser, Map, ParserConfig, Separator, Value};
//!
//! let config = ParserConfig::new()
//!     .with_separator(Separator::literal("|")?)
//!     .with_array_values(false)
//!     .with_normalize_keys(false);
//!
//! let parser = KeyValueParser::with_config(Map::new(), config);
//! let result = parser.parse(["--size|5|6"]);
//! assert_eq!(result["--size"], Value::from("5|6"));
//! # Ok::<(), kv_typecast::KvError>(())
//! ```
//!
//! Options can also be loaded from data with [`ParserOptions`]; unknown
//! fields are ignored.
//!
//! ## Serde Integration
//!
//! ```rust
//! use serde::Deserialize;
//! use kv_typecast::from_tokens;
//!
//! #[derive(Deserialize)]
//! struct Args {
//!     user: String,
//!     port: u16,
//!     #[serde(default)]
//!     verbose: bool,
//! }
//!
//! let args: Args = from_tokens(["user=mig", "port=8080"])?;
//! assert_eq!(args.port, 8080);
//! assert!(!args.verbose);
//! # Ok::<(), kv_typecast::KvError>(())
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events at `debug` and `trace` level and never
//! installs a subscriber.

pub mod deserializer;
pub mod error;
pub mod parser;
pub mod separator;
pub mod value;

// Re-export main types and functions
pub use deserializer::{MapDeserializer, ValueDeserializer, from_map, from_tokens};
pub use error::KvError;
pub use parser::{
    KeyValueParser, ParserConfig, ParserOptions, normalize_key, typecast, typecast_str,
};
pub use separator::{DEFAULT_SEPARATOR, Separator};
pub use value::{Array, Map, Value};
