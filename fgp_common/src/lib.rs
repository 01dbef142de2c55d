mod fixed;
mod money;

pub mod op;
mod quantity;
mod secret;

pub use fixed::FixedPointError;
pub use money::{Money, SOM_CURRENCY_CODE, SOM_CURRENCY_CODE_LOWER};
pub use quantity::Quantity;
pub use secret::Secret;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
