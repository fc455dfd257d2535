//! Basic usage example for kv-typecast
//!
//! Parses this program's own command-line arguments. Try:
//!
//! ```text
//! cargo run --example basic_usage -- --user-name=mig --verbose retries:3 hosts:a:b
//! ```

use kv_typecast::{KeyValueParser, KvError, Map, Value};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Args {
    user_name: String,
    #[serde(default)]
    verbose: bool,
    retries: u32,
    #[serde(default)]
    hosts: Vec<String>,
}

fn main() -> Result<(), KvError> {
    let mut defaults = Map::new();
    defaults.insert("user_name".to_string(), Value::from("anonymous"));
    defaults.insert("retries".to_string(), Value::from(1));

    let parser = KeyValueParser::new(defaults);
    let tokens: Vec<String> = std::env::args().skip(1).collect();

    println!("Parsed values:");
    for (key, value) in parser.parse(&tokens) {
        println!("  {:<12} {:<8} {}", key, value.type_name(), value);
    }

    let args: Args = parser.parse_into(&tokens)?;
    println!("\nTyped arguments: {:#?}", args);

    Ok(())
}
