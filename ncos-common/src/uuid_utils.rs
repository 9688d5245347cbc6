//! Identifier utilities

use uuid::Uuid;

/// Generate a prefixed record identifier, e.g. `payment_2f1c…`
pub fn prefixed(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
