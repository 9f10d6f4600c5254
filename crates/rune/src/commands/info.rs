//! Account and process information commands.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rune_gateway_protocol::User;

use super::{
    Category, CommandContext, CommandHandler, CommandInfo, CommandRegistry, HandlerError, Reply,
    SimpleCommand,
};
use crate::format;

/// Milliseconds between the Unix epoch and the platform's id epoch (2015-01-01).
const ID_EPOCH_MS: u64 = 1_420_070_400_000;
const CDN_BASE: &str = "https://cdn.discordapp.com";

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(Arc::new(SimpleCommand {
        info: CommandInfo {
            name: "whoami",
            usage: "whoami",
            description: "Show your user info",
            category: Category::Info,
        },
        reply: whoami,
    }));
    registry.register(Arc::new(SimpleCommand {
        info: CommandInfo {
            name: "avatar",
            usage: "avatar",
            description: "Get your avatar URL",
            category: Category::Info,
        },
        reply: avatar,
    }));
    registry.register(Arc::new(ShowStats));
    registry.register(Arc::new(SimpleCommand {
        info: CommandInfo {
            name: "credits",
            usage: "credits",
            description: "Display credits",
            category: Category::Info,
        },
        reply: credits,
    }));
}

/// Creation time encoded in an id, if it is a valid id.
pub fn id_created_at(id: &str) -> Option<DateTime<Utc>> {
    let id: u64 = id.parse().ok()?;
    let millis = (id >> 22) + ID_EPOCH_MS;
    DateTime::from_timestamp_millis(i64::try_from(millis).ok()?)
}

pub fn avatar_url(user: &User) -> String {
    match &user.avatar {
        Some(hash) => format!("{CDN_BASE}/avatars/{}/{hash}.png?size=1024", user.id),
        None => {
            let index = user.id.parse::<u64>().map(|id| (id >> 22) % 6).unwrap_or(0);
            format!("{CDN_BASE}/embed/avatars/{index}.png")
        }
    }
}

fn avatar(ctx: &CommandContext<'_>) -> String {
    format::panel(&avatar_url(&ctx.message.author))
}

fn whoami(ctx: &CommandContext<'_>) -> String {
    let author = &ctx.message.author;
    let created = id_created_at(&author.id)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    format::panel(&format!(
        "**User Information:**\n\
         🪪 ID: {}\n\
         👤 Username: {}\n\
         🤖 Bot: {}\n\
         📆 Account Created: {created}",
        author.id, author.username, author.bot
    ))
}

fn credits(_ctx: &CommandContext<'_>) -> String {
    format::titled_panel(
        "CREDITS",
        &format!(
            "Created by: {}\nThanks for using RUNE!\n",
            format::accent("Eclipse")
        ),
    )
}

// ============================================================================
// stats
// ============================================================================

struct ShowStats;

const STATS: CommandInfo = CommandInfo {
    name: "stats",
    usage: "stats",
    description: "Show uptime, counters, and memory usage",
    category: Category::Info,
};

#[async_trait]
impl CommandHandler for ShowStats {
    fn info(&self) -> &CommandInfo {
        &STATS
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> Result<Reply, HandlerError> {
        let snapshot = ctx.runtime.stats().snapshot().await;
        let uptime = snapshot.uptime_parts();
        Ok(Reply::panel(format!(
            "**Statistics**\n\
             Uptime: {} days, {} hours, {} minutes\n\
             Commands handled: {}\n\
             Messages seen: {}\n\
             Memory usage: {:.2} MB",
            uptime.days,
            uptime.hours,
            uptime.minutes,
            snapshot.commands_handled,
            snapshot.messages_seen,
            snapshot.memory_mb()
        )))
    }
}
