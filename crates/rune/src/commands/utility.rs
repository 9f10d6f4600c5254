//! Utility commands: latency, message tools, encoders, and account toggles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use rune_gateway_protocol::Status;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{
    Category, CommandContext, CommandHandler, CommandInfo, CommandRegistry, HandlerError, Reply,
    SimpleCommand,
};
use crate::format;

/// Gap between deletes in `clear`, to stay under the delete rate limit.
const CLEAR_SPACING: Duration = Duration::from_millis(300);
const CLEAR_DEFAULT: u8 = 10;
const CLEAR_MAX: u8 = 100;

const PASSWORD_DEFAULT: usize = 16;
const PASSWORD_MAX: usize = 100;
const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+[]{}|;:,.<>?";

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(Arc::new(Ping));
    registry.register(Arc::new(Clear));
    registry.register(Arc::new(Say));
    registry.register(Arc::new(ToggleAutoResponder));
    registry.register(Arc::new(SetStatus));
    registry.register(Arc::new(SetPrefix));
    registry.register(Arc::new(SimpleCommand {
        info: CommandInfo {
            name: "encode",
            usage: "encode <text>",
            description: "Encode text to base64",
            category: Category::Utility,
        },
        reply: encode,
    }));
    registry.register(Arc::new(SimpleCommand {
        info: CommandInfo {
            name: "decode",
            usage: "decode <text>",
            description: "Decode base64 to text",
            category: Category::Utility,
        },
        reply: decode,
    }));
    registry.register(Arc::new(SimpleCommand {
        info: CommandInfo {
            name: "password",
            usage: "password [length]",
            description: "Generate a secure password",
            category: Category::Utility,
        },
        reply: password,
    }));
}

// ============================================================================
// ping
// ============================================================================

struct Ping;

const PING: CommandInfo = CommandInfo {
    name: "ping",
    usage: "ping",
    description: "Check API latency",
    category: Category::Utility,
};

#[async_trait]
impl CommandHandler for Ping {
    fn info(&self) -> &CommandInfo {
        &PING
    }

    /// Posts a placeholder, times a `GET /users/@me`, then edits the
    /// placeholder with the result.
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<Reply, HandlerError> {
        let api = ctx.runtime.api();
        let placeholder = ctx
            .runtime
            .send_tracked(ctx.channel_id(), &format::panel("🏓 Pinging..."))
            .await?;

        let started = Instant::now();
        let result = match api.current_user().await {
            Ok(_) => {
                let latency = started.elapsed().as_millis();
                format::panel(&format!("🏓 Pong! Latency: {latency}ms"))
            }
            Err(e) => {
                warn!(error = %e, "Ping request failed");
                format::panel("Error calculating ping: connection failed")
            }
        };

        api.edit_message(ctx.channel_id(), &placeholder, &result)
            .await?;
        Ok(Reply::Handled)
    }
}

// ============================================================================
// say
// ============================================================================

struct Say;

const SAY: CommandInfo = CommandInfo {
    name: "say",
    usage: "say <message>",
    description: "Send a message as yourself",
    category: Category::Utility,
};

#[async_trait]
impl CommandHandler for Say {
    fn info(&self) -> &CommandInfo {
        &SAY
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> Result<Reply, HandlerError> {
        if ctx.args.is_empty() {
            return Ok(Reply::panel("Please provide something to say!"));
        }
        // Sent verbatim, without a panel.
        Ok(Reply::Text(ctx.joined_args()))
    }
}

// ============================================================================
// clear
// ============================================================================

struct Clear;

const CLEAR: CommandInfo = CommandInfo {
    name: "clear",
    usage: "clear [count]",
    description: "Delete your recent messages (default: 10, max: 100)",
    category: Category::Utility,
};

fn clear_count(args: &[String]) -> u8 {
    args.first()
        .and_then(|a| a.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .map(|n| n.min(CLEAR_MAX as u32) as u8)
        .unwrap_or(CLEAR_DEFAULT)
}

#[async_trait]
impl CommandHandler for Clear {
    fn info(&self) -> &CommandInfo {
        &CLEAR
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> Result<Reply, HandlerError> {
        let count = clear_count(ctx.args);
        let api = ctx.runtime.api();
        let history = api.list_messages(ctx.channel_id(), count).await?;

        let mut deleted = 0usize;
        for message in history.iter().filter(|m| {
            m.author.id == ctx.message.author.id && m.id != ctx.message.id
        }) {
            match api.delete_message(ctx.channel_id(), &message.id).await {
                Ok(()) => {
                    deleted += 1;
                    tokio::time::sleep(CLEAR_SPACING).await;
                }
                Err(e) => debug!(error = %e, message_id = %message.id, "Skipping undeletable message"),
            }
        }

        Ok(Reply::panel(format!("🗑️ Deleted {deleted} messages.")))
    }
}

// ============================================================================
// ar
// ============================================================================

struct ToggleAutoResponder;

const AR: CommandInfo = CommandInfo {
    name: "ar",
    usage: "ar",
    description: "Toggle auto responder",
    category: Category::Utility,
};

#[async_trait]
impl CommandHandler for ToggleAutoResponder {
    fn info(&self) -> &CommandInfo {
        &AR
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> Result<Reply, HandlerError> {
        let enabled = ctx.runtime.toggle_auto_response().await?;
        let state = if enabled { "enabled" } else { "disabled" };
        Ok(Reply::panel(format!("Auto responder {state}")))
    }
}

// ============================================================================
// status
// ============================================================================

struct SetStatus;

const STATUS: CommandInfo = CommandInfo {
    name: "status",
    usage: "status <online|idle|dnd|invisible> [text]",
    description: "Change your status, optionally with custom text",
    category: Category::Utility,
};

#[async_trait]
impl CommandHandler for SetStatus {
    fn info(&self) -> &CommandInfo {
        &STATUS
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> Result<Reply, HandlerError> {
        let Some(raw) = ctx.args.first() else {
            return Ok(Reply::panel(
                "Please provide a status: online, idle, dnd, invisible",
            ));
        };
        let Ok(status) = raw.parse::<Status>() else {
            return Ok(Reply::panel(
                "Invalid status. Use online, idle, dnd, or invisible",
            ));
        };
        let custom_text = (ctx.args.len() > 1).then(|| ctx.args[1..].join(" "));

        match ctx.runtime.set_presence(status, custom_text).await {
            Ok(()) => Ok(Reply::panel(format!("Status updated to {status}"))),
            Err(e) => Ok(Reply::panel(format!("Error changing status: {e}"))),
        }
    }
}

// ============================================================================
// prefix
// ============================================================================

struct SetPrefix;

const PREFIX: CommandInfo = CommandInfo {
    name: "prefix",
    usage: "prefix [new]",
    description: "Show or change the command prefix",
    category: Category::Utility,
};

#[async_trait]
impl CommandHandler for SetPrefix {
    fn info(&self) -> &CommandInfo {
        &PREFIX
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> Result<Reply, HandlerError> {
        let Some(prefix) = ctx.args.first() else {
            return Ok(Reply::panel(format!("Current prefix: `{}`", ctx.prefix)));
        };
        let prefix = prefix.clone();
        ctx.runtime
            .config()
            .update(|c| c.prefix = prefix.clone())
            .await?;
        Ok(Reply::panel(format!("Prefix set to `{prefix}`")))
    }
}

// ============================================================================
// encode / decode / password
// ============================================================================

fn encode(ctx: &CommandContext<'_>) -> String {
    if ctx.args.is_empty() {
        return format::panel("Please provide text to encode");
    }
    let encoded = STANDARD.encode(ctx.joined_args());
    format::panel(&format!("🔐 Encoded: {encoded}"))
}

fn decode(ctx: &CommandContext<'_>) -> String {
    if ctx.args.is_empty() {
        return format::panel("Please provide text to decode");
    }
    match STANDARD.decode(ctx.joined_args()) {
        Ok(bytes) => format::panel(&format!(
            "🔓 Decoded: {}",
            String::from_utf8_lossy(&bytes)
        )),
        Err(_) => format::panel("❌ Invalid base64 encoding"),
    }
}

fn password_length(args: &[String]) -> usize {
    args.first()
        .and_then(|a| a.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .map(|n| n.min(PASSWORD_MAX))
        .unwrap_or(PASSWORD_DEFAULT)
}

fn generate_password(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| PASSWORD_CHARSET[rng.random_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

fn password(ctx: &CommandContext<'_>) -> String {
    let length = password_length(ctx.args);
    format::panel(&format!(
        "🔑 Generated password ({length} chars):\n{}",
        generate_password(length)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{run_command, text};
    use crate::gateway::connection::fake::transport_pair;
    use crate::rest::mock::{ApiCall, MockApi};
    use crate::runtime::testing::{OWNER, message, runtime_with, test_config, test_runtime};

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clear_count_defaults_and_caps() {
        assert_eq!(clear_count(&[]), 10);
        assert_eq!(clear_count(&args(&["5"])), 5);
        assert_eq!(clear_count(&args(&["0"])), 10);
        assert_eq!(clear_count(&args(&["abc"])), 10);
        assert_eq!(clear_count(&args(&["5000"])), 100);
    }

    #[test]
    fn password_length_bounds() {
        assert_eq!(password_length(&[]), 16);
        assert_eq!(password_length(&args(&["500"])), 100);
        let generated = generate_password(32);
        assert_eq!(generated.len(), 32);
        assert!(generated.bytes().all(|b| PASSWORD_CHARSET.contains(&b)));
    }

    #[tokio::test]
    async fn encode_then_decode() {
        let t = test_runtime();
        let encoded = text(run_command(&t, "&encode hello world").await);
        assert!(encoded.contains("Encoded: aGVsbG8gd29ybGQ="));

        let decoded = text(run_command(&t, "&decode aGVsbG8gd29ybGQ=").await);
        assert!(decoded.contains("Decoded: hello world"));

        let invalid = text(run_command(&t, "&decode !!!").await);
        assert!(invalid.contains("Invalid base64"));
    }

    #[tokio::test]
    async fn say_sends_raw_text() {
        let t = test_runtime();
        assert_eq!(
            run_command(&t, "&say hi there").await,
            Reply::Text("hi there".to_string())
        );
        let empty = text(run_command(&t, "&say").await);
        assert!(empty.contains("Please provide something to say!"));
    }

    #[tokio::test]
    async fn ping_edits_its_placeholder() {
        let t = test_runtime();
        assert_eq!(run_command(&t, "&ping").await, Reply::Handled);

        let calls = t.api.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(&calls[0], ApiCall::Send { content, .. } if content.contains("Pinging...")));
        assert_eq!(calls[1], ApiCall::CurrentUser);
        match &calls[2] {
            ApiCall::Edit {
                channel_id,
                message_id,
                content,
            } => {
                assert_eq!(channel_id, "chan");
                assert_eq!(message_id, "1000");
                assert!(content.contains("Pong! Latency:"));
            }
            other => panic!("expected edit, got {other:?}"),
        }
        // The placeholder's echo is recognised as our own.
        assert!(t.runtime.outbound().take("1000"));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_deletes_only_own_messages() {
        let mut history = vec![
            message(OWNER, "mine 1"),
            message("7", "theirs"),
            message(OWNER, "mine 2"),
        ];
        history[0].id = "a".to_string();
        history[1].id = "b".to_string();
        history[2].id = "c".to_string();
        let t = runtime_with(test_config(), MockApi::with_history(history));

        let reply = text(run_command(&t, "&clear 3").await);
        assert!(reply.contains("Deleted 2 messages."));

        let deletes: Vec<_> = t
            .api
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Delete { message_id, .. } => Some(message_id),
                _ => None,
            })
            .collect();
        assert_eq!(deletes, vec!["a", "c"]);
        assert!(t.api.calls().contains(&ApiCall::List {
            channel_id: "chan".to_string(),
            limit: 3,
        }));
    }

    #[tokio::test]
    async fn ar_toggles_runtime_flag() {
        let t = test_runtime();
        let reply = text(run_command(&t, "&ar").await);
        assert!(reply.contains("Auto responder enabled"));
        assert!(t.runtime.auto_response_enabled().await);

        let reply = text(run_command(&t, "&ar").await);
        assert!(reply.contains("Auto responder disabled"));
    }

    #[tokio::test]
    async fn status_validates_and_reports_connection() {
        let t = test_runtime();
        let reply = text(run_command(&t, "&status busy").await);
        assert!(reply.contains("Invalid status"));

        let reply = text(run_command(&t, "&status idle").await);
        assert!(reply.contains("Error changing status"));

        let (transport, mut peer) = transport_pair();
        t.runtime.gateway().install(transport.writer).await;
        let reply = text(run_command(&t, "&status dnd in a meeting").await);
        assert!(reply.contains("Status updated to dnd"));

        let frame = peer.recv_json().await.unwrap();
        assert_eq!(frame["d"]["status"], "dnd");
        assert_eq!(frame["d"]["activities"][0]["state"], "in a meeting");
    }

    #[tokio::test]
    async fn prefix_change_persists() {
        let t = test_runtime();
        let reply = text(run_command(&t, "&prefix").await);
        assert!(reply.contains("Current prefix: `&`"));

        let reply = text(run_command(&t, "&prefix !").await);
        assert!(reply.contains("Prefix set to `!`"));
        assert_eq!(t.runtime.config().read().await.prefix, "!");
    }
}
