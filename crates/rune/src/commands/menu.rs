//! Help and listing commands, generated from the registry.

use std::fmt::Write;
use std::sync::Arc;

use super::{Category, CommandContext, CommandInfo, CommandRegistry, SimpleCommand};
use crate::format;

type Render = fn(&CommandContext<'_>) -> String;

pub(super) fn register(registry: &mut CommandRegistry) {
    let menu: [(&'static str, &'static str, &'static str, Render); 5] = [
        ("help", "help [command]", "Show this help message", help),
        ("categories", "categories", "Show all command categories", categories),
        ("utilities", "utilities", "Show utility commands", utilities),
        ("fun", "fun", "Show fun commands", fun),
        ("info", "info", "Show information commands", info),
    ];
    for (name, usage, description, reply) in menu {
        registry.register(Arc::new(SimpleCommand {
            info: CommandInfo {
                name,
                usage,
                description,
                category: Category::Menu,
            },
            reply,
        }));
    }
}

fn listing(ctx: &CommandContext<'_>, category: Category) -> String {
    let mut out = String::new();
    for info in ctx.registry.in_category(category) {
        let usage = format!("{}{}", ctx.prefix, info.usage);
        let _ = writeln!(out, "{} - {}", format::command(&usage), info.description);
    }
    out
}

fn help(ctx: &CommandContext<'_>) -> String {
    if let Some(verb) = ctx.args.first() {
        let body = match ctx.registry.get(verb) {
            Some(handler) => {
                let info = handler.info();
                format!(
                    "{}\n\n{}",
                    format::command(&format!("{}{}", ctx.prefix, info.usage)),
                    info.description
                )
            }
            None => format!("No command named `{verb}`."),
        };
        return format::panel(&body);
    }

    let body = format!(
        "Commands:\n{}\nTip: Type {}help <command> for detailed help on a specific command\n",
        listing(ctx, Category::Menu),
        ctx.prefix
    );
    format::panel(&body)
}

fn categories(ctx: &CommandContext<'_>) -> String {
    let body = format!(
        "Command Categories:\n\n\
         {} - Useful tools and functions\n\
         {} - Entertainment and random commands\n\
         {} - Information and statistics\n\n\
         Use {}<category> to see commands in each category\n",
        format::heading("Utilities"),
        format::heading("Fun"),
        format::heading("Info"),
        ctx.prefix
    );
    format::panel(&body)
}

fn category_listing(ctx: &CommandContext<'_>, category: Category) -> String {
    format::panel(&format!(
        "{}\n\n{}",
        format::heading(&format!("{}:", category.title())),
        listing(ctx, category)
    ))
}

fn utilities(ctx: &CommandContext<'_>) -> String {
    category_listing(ctx, Category::Utility)
}

fn fun(ctx: &CommandContext<'_>) -> String {
    category_listing(ctx, Category::Fun)
}

fn info(ctx: &CommandContext<'_>) -> String {
    category_listing(ctx, Category::Info)
}
