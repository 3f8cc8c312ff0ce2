//! Recognition of bridge commands in outgoing chat lines.
//!
//! A line qualifies when, after trimming, it is `/<verb>` followed by
//! whitespace or end of line and `<verb>` is on the whitelist
//! (case-insensitive). Arguments are raw whitespace-separated tokens;
//! there is no quoting.

use std::collections::BTreeSet;

/// Verbs recognised when no whitelist is configured.
pub const DEFAULT_COMMANDS: [&str; 4] = ["come", "follow", "mine", "hello"];

/// A recognised command: lower-cased verb plus arguments in original
/// case and order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub verb: String,
    pub args: Vec<String>,
}

impl ParsedCommand {
    /// Arguments joined by single spaces, for diagnostics.
    pub fn args_line(&self) -> String {
        self.args.join(" ")
    }
}

/// Whitelist-driven command recogniser.
#[derive(Debug, Clone)]
pub struct CommandParser {
    verbs: BTreeSet<String>,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(DEFAULT_COMMANDS)
    }
}

impl CommandParser {
    /// Build a parser for the given verbs. Verbs are stored lower-cased;
    /// empty entries and entries containing whitespace or `/` are skipped.
    pub fn new<I, S>(verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let verbs = verbs
            .into_iter()
            .map(|v| v.as_ref().trim().to_lowercase())
            .filter(|v| !v.is_empty() && !v.contains(char::is_whitespace) && !v.contains('/'))
            .collect();
        Self { verbs }
    }

    /// The recognised verbs, lower-cased and sorted.
    pub fn verbs(&self) -> impl Iterator<Item = &str> {
        self.verbs.iter().map(String::as_str)
    }

    /// Parse `line`, returning `None` when it is ordinary chat.
    pub fn parse(&self, line: &str) -> Option<ParsedCommand> {
        let rest = line.trim().strip_prefix('/')?;
        // "/ come" is chat, not a command.
        if rest.starts_with(char::is_whitespace) {
            return None;
        }

        let mut tokens = rest.split_whitespace();
        let verb = tokens.next()?.to_lowercase();
        if !self.verbs.contains(&verb) {
            return None;
        }

        Some(ParsedCommand {
            verb,
            args: tokens.map(str::to_owned).collect(),
        })
    }
}
