//! Parser for the peer's `help` reply.
//!
//! The reply's `value` lists one command per line as `name<TAB>description`.
//! Lines without a tab do not describe a command and are skipped.

use serde::{Deserialize, Serialize};

/// One command the peer advertised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCommand {
    pub name: String,
    pub description: String,
}

/// Extracts the advertised commands from a `help` reply, in reply order.
///
/// ```rust
/// use inspector_core::parse_help_text;
///
/// let commands = parse_help_text("help\tThe help menu\nreset\tReset the app\n");
/// assert_eq!(commands[1].name, "reset");
/// ```
pub fn parse_help_text(text: &str) -> Vec<CatalogCommand> {
    text.lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(name, description)| (name.trim(), description.trim()))
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, description)| CatalogCommand {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect()
}
