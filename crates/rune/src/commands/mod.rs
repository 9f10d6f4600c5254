//! Owner commands.
//!
//! A command is a [`CommandHandler`] registered once in the ordered
//! [`CommandRegistry`]. The dispatcher parses an [`Invocation`] out of an
//! owner message, looks the verb up (case-sensitively), and runs it with a
//! [`CommandContext`]. Handlers either return text for the dispatcher to
//! send or do their own side effects and return [`Reply::Handled`].

mod fun;
mod info;
mod menu;
mod utility;

use std::sync::Arc;

use async_trait::async_trait;
use rune_gateway_protocol::Message;
use thiserror::Error;

use crate::config::ConfigError;
use crate::format;
use crate::gateway::GatewayError;
use crate::rest::RestError;
use crate::runtime::Runtime;

// ============================================================================
// Types
// ============================================================================

/// Grouping used by the listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Help and listing commands themselves.
    Menu,
    Utility,
    Fun,
    Info,
}

impl Category {
    pub fn title(&self) -> &'static str {
        match self {
            Category::Menu => "Commands",
            Category::Utility => "Utility Commands",
            Category::Fun => "Fun Commands",
            Category::Info => "Info Commands",
        }
    }
}

/// Static description of a command.
#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    pub name: &'static str,
    /// Name plus argument synopsis, e.g. `clear [count]`.
    pub usage: &'static str,
    pub description: &'static str,
    pub category: Category,
}

/// What the dispatcher should do once a handler returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Send this content to the command's channel.
    Text(String),
    /// The handler already did everything it needed to.
    Handled,
}

impl Reply {
    /// Text wrapped in the standard panel.
    pub fn panel(body: impl AsRef<str>) -> Self {
        Reply::Text(format::panel(body.as_ref()))
    }
}

/// Everything a handler may look at or act through.
pub struct CommandContext<'a> {
    pub message: &'a Message,
    pub args: &'a [String],
    pub runtime: &'a Arc<Runtime>,
    pub registry: &'a CommandRegistry,
    /// Prefix in effect when the command was parsed.
    pub prefix: &'a str,
}

impl CommandContext<'_> {
    pub fn channel_id(&self) -> &str {
        &self.message.channel_id
    }

    /// All arguments joined back with single spaces.
    pub fn joined_args(&self) -> String {
        self.args.join(" ")
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("REST call failed: {0}")]
    Rest(#[from] RestError),

    #[error("config update failed: {0}")]
    Config(#[from] ConfigError),

    #[error("gateway write failed: {0}")]
    Gateway(#[from] GatewayError),
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn info(&self) -> &CommandInfo;

    async fn run(&self, ctx: &CommandContext<'_>) -> Result<Reply, HandlerError>;
}

/// Handler whose reply is computed synchronously from the context.
pub struct SimpleCommand {
    pub info: CommandInfo,
    pub reply: fn(&CommandContext<'_>) -> String,
}

#[async_trait]
impl CommandHandler for SimpleCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> Result<Reply, HandlerError> {
        Ok(Reply::Text((self.reply)(ctx)))
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// A parsed command message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub verb: String,
    pub args: Vec<String>,
}

/// Strip `prefix` and split the rest on ASCII spaces. Empty tokens are
/// dropped; `None` if the prefix does not match or no verb remains.
pub fn parse_invocation(content: &str, prefix: &str) -> Option<Invocation> {
    let rest = content.strip_prefix(prefix)?;
    let mut tokens = rest.split(' ').filter(|t| !t.is_empty()).map(str::to_string);
    let verb = tokens.next()?;
    Some(Invocation {
        verb,
        args: tokens.collect(),
    })
}

/// Reply for a verb nothing is registered under.
pub fn unknown_command(verb: &str, prefix: &str) -> String {
    format::panel(&format!(
        "Unknown command: `{verb}`. Type {prefix}help for a list of commands."
    ))
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered set of handlers, fixed at startup.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: Vec<Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in command, in listing order.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        menu::register(&mut registry);
        utility::register(&mut registry);
        fun::register(&mut registry);
        info::register(&mut registry);
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.push(handler);
    }

    pub fn get(&self, verb: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.iter().find(|h| h.info().name == verb)
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &CommandInfo> {
        self.handlers
            .iter()
            .map(|h| h.info())
            .filter(move |info| info.category == category)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_verb_and_args() {
        let inv = parse_invocation("&roll 20", "&").unwrap();
        assert_eq!(inv.verb, "roll");
        assert_eq!(inv.args, vec!["20"]);

        let inv = parse_invocation("&say  two  spaces ", "&").unwrap();
        assert_eq!(inv.verb, "say");
        assert_eq!(inv.args, vec!["two", "spaces"]);
    }

    #[test]
    fn parse_requires_prefix_and_verb() {
        assert_eq!(parse_invocation("help", "&"), None);
        assert_eq!(parse_invocation("&", "&"), None);
        assert_eq!(parse_invocation("&   ", "&"), None);
    }

    #[test]
    fn empty_prefix_accepts_everything() {
        let inv = parse_invocation("ping", "").unwrap();
        assert_eq!(inv.verb, "ping");
        assert!(inv.args.is_empty());
    }

    #[test]
    fn builtin_registry_is_case_sensitive_and_unique() {
        let registry = CommandRegistry::builtin();
        assert!(registry.get("help").is_some());
        assert!(registry.get("HELP").is_none());
        assert!(registry.get("ap").is_none());

        let mut names: Vec<_> = registry.handlers.iter().map(|h| h.info().name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(!registry.is_empty());
    }

    #[test]
    fn every_command_has_a_listing_category() {
        let registry = CommandRegistry::builtin();
        let listed: usize = [
            Category::Menu,
            Category::Utility,
            Category::Fun,
            Category::Info,
        ]
        .into_iter()
        .map(|c| registry.in_category(c).count())
        .sum();
        assert_eq!(listed, registry.len());
    }

    #[test]
    fn unknown_command_names_verb_and_help() {
        let text = unknown_command("nope", "!");
        assert!(text.contains("Unknown command: `nope`"));
        assert!(text.contains("!help"));
    }
}
