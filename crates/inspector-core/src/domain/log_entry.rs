//! Structured log entries parsed from the peer's raw log lines.
//!
//! # Line format (for beginners)
//!
//! The peer forwards its log output one line at a time.  A well-formed line
//! looks like this:
//!
//! ```text
//! [01.02.2024 03:04:05.000] (main|controller - ControllerClass) Setting state: On
//!  └──────── date ───────┘  └─ modules ──┘   └─ component ─┘  └─── message ───┘
//! ```
//!
//! - The date sits between the leading `[` and the first `]`, formatted as
//!   `dd.mm.yyyy HH:MM:SS.fff`.  A date in any other shape does not reject
//!   the line; the entry just carries no timestamp.
//! - The category sits between the first `(` after the date and the next `)`.
//!   It is split on ` - ` into a `|`-separated module list and a component.
//! - Everything after the `)` (trimmed) is the message.
//!
//! Lines whose brackets, parentheses or separator are missing are not an
//! error condition for the inspector: they are dropped from the structured
//! view.  [`LogEntry::parse`]
//! still reports *why* a line was rejected so callers can log it.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `chrono` format of the timestamp between the square brackets.
///
/// `%.f` accepts any number of fractional digits, so both `05.000` and `05`
/// parse.
const DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S%.f";

/// Separator between the module list and the component inside the category.
const CATEGORY_SEPARATOR: &str = " - ";

/// Reasons a raw line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogParseError {
    #[error("line does not start with '['")]
    MissingDateOpen,

    #[error("line has no closing ']' after the date")]
    MissingDateClose,

    #[error("line has no parenthesised category")]
    MissingCategory,

    #[error("category {0:?} has no \" - \" separator")]
    MissingComponent(String),
}

/// Classification of a log line by its message content.
///
/// The live views highlight state transitions of the main state machine and
/// of the VPN controller, because those are what most debugging sessions are
/// looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectedType {
    /// `Set state:` logged by the `main` module.
    VpnState,
    /// `Setting state:` logged by the `controller` module.
    ControllerState,
    /// Anything else.
    Unclassified,
}

impl DetectedType {
    /// Classifies a message given the modules that logged it.
    pub fn detect(modules: &[String], message: &str) -> Self {
        let has_module = |name: &str| modules.iter().any(|m| m == name);

        if message.contains("Set state:") && has_module("main") {
            Self::VpnState
        } else if message.contains("Setting state:") && has_module("controller") {
            Self::ControllerState
        } else {
            Self::Unclassified
        }
    }
}

/// One parsed log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp as written by the peer (no timezone information), or `None`
    /// when the bracketed text is not a `dd.mm.yyyy HH:MM:SS.fff` date.
    pub date: Option<NaiveDateTime>,
    /// Modules in the order they appear in the category.
    pub modules: Vec<String>,
    /// The logging component (usually a class name).
    pub component: String,
    /// The message text.
    pub log: String,
    /// Classification of the message.
    pub detected_type: DetectedType,
    /// The unmodified line.
    pub raw: String,
}

impl LogEntry {
    /// Parses one raw log line.
    ///
    /// # Errors
    ///
    /// Returns a [`LogParseError`] naming the first structural element that
    /// was missing or malformed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use inspector_core::LogEntry;
    ///
    /// let entry = LogEntry::parse("[01.02.2024 03:04:05.000] (main - App) started").unwrap();
    /// assert_eq!(entry.component, "App");
    /// assert_eq!(entry.log, "started");
    /// ```
    pub fn parse(line: &str) -> Result<Self, LogParseError> {
        let rest = line
            .strip_prefix('[')
            .ok_or(LogParseError::MissingDateOpen)?;
        let (date_text, rest) = rest
            .split_once(']')
            .ok_or(LogParseError::MissingDateClose)?;

        let date = NaiveDateTime::parse_from_str(date_text.trim(), DATE_FORMAT).ok();

        let rest = rest.trim();
        let open = rest.find('(').ok_or(LogParseError::MissingCategory)?;
        let (category, message) = rest[open + 1..]
            .split_once(')')
            .ok_or(LogParseError::MissingCategory)?;

        let (module_list, component) = category
            .split_once(CATEGORY_SEPARATOR)
            .ok_or_else(|| LogParseError::MissingComponent(category.to_string()))?;

        let modules: Vec<String> = module_list.split('|').map(str::to_string).collect();
        let log = message.trim().to_string();
        let detected_type = DetectedType::detect(&modules, &log);

        Ok(Self {
            date,
            modules,
            component: component.to_string(),
            log,
            detected_type,
            raw: line.to_string(),
        })
    }

    /// Returns `true` if `module` is one of the entry's modules.
    pub fn has_module(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
