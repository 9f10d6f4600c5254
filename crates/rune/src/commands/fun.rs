//! Fun commands. All of them are local; nothing here calls out to a
//! third-party service.

use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;

use super::{Category, CommandContext, CommandInfo, CommandRegistry, SimpleCommand};
use crate::format;

const EIGHT_BALL: &[&str] = &[
    "It is certain.",
    "It is decidedly so.",
    "Without a doubt.",
    "Yes, definitely.",
    "You may rely on it.",
    "As I see it, yes.",
    "Most likely.",
    "Outlook good.",
    "Yes.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Concentrate and ask again.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
];

const QUOTES: &[&str] = &[
    "Be yourself; everyone else is already taken. - Oscar Wilde",
    "You only live once, but if you do it right, once is enough. - Mae West",
    "Be the change that you wish to see in the world. - Mahatma Gandhi",
    "In three words I can sum up everything I've learned about life: it goes on. - Robert Frost",
    "If you tell the truth, you don't have to remember anything. - Mark Twain",
    "A friend is someone who knows all about you and still loves you. - Elbert Hubbard",
    "We accept the love we think we deserve. - Stephen Chbosky",
];

const FACTS: &[&str] = &[
    "A shrimp's heart is in its head.",
    "The Hawaiian alphabet has 12 letters.",
    "A group of flamingos is called a 'flamboyance'.",
    "Octopuses have three hearts and blue blood.",
    "A jiffy is an actual unit of time: 1/100th of a second.",
    "Bananas are berries, but strawberries aren't.",
    "A day on Venus is longer than a year on Venus.",
    "Honey never spoils.",
    "The shortest war in history lasted 38 minutes.",
    "The world's largest desert is Antarctica, not the Sahara.",
    "You can't hum while holding your nose closed.",
];

const MEME_TEMPLATES: &[&str] = &[
    "When you {} but then {}.",
    "Me trying to {} while {}.",
    "POV: You're about to {} and suddenly {}.",
    "Nobody:\nLiterally nobody:\nMe: {} while {}.",
    "Just another day of {} and {}.",
];

const MEME_ACTIONS: &[&str] = &[
    "touch grass",
    "debug spaghetti code",
    "drink coffee at 2AM",
    "google an error",
    "overthink everything",
    "forget your password",
    "rename final_final_v2",
    "accidentally close the terminal",
    "open 27 tabs",
];

const DEFAULT_SIDES: u32 = 6;

pub(super) fn register(registry: &mut CommandRegistry) {
    type Render = fn(&CommandContext<'_>) -> String;
    let commands: [(&'static str, &'static str, &'static str, Render); 6] = [
        ("8ball", "8ball <question>", "Ask the magic 8ball", eight_ball),
        ("roll", "roll [sides]", "Roll a die (default: 6 sides)", roll),
        ("coinflip", "coinflip", "Flip a coin", coinflip),
        ("quote", "quote", "Get a random quote", quote),
        ("fact", "fact", "Get a random fact", fact),
        ("meme", "meme", "Get a random meme phrase", meme),
    ];
    for (name, usage, description, reply) in commands {
        registry.register(Arc::new(SimpleCommand {
            info: CommandInfo {
                name,
                usage,
                description,
                category: Category::Fun,
            },
            reply,
        }));
    }
}

fn pick(items: &'static [&'static str]) -> &'static str {
    items.choose(&mut rand::rng()).copied().unwrap_or_default()
}

fn eight_ball(ctx: &CommandContext<'_>) -> String {
    if ctx.args.is_empty() {
        return format::panel("Please ask a question!");
    }
    let mut question = ctx.joined_args();
    if !question.ends_with('?') {
        question.push('?');
    }
    format::panel(&format!("{question}\n\n🎱 {}", pick(EIGHT_BALL)))
}

fn roll_sides(args: &[String]) -> u32 {
    args.first()
        .and_then(|a| a.parse::<u32>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_SIDES)
}

fn roll(ctx: &CommandContext<'_>) -> String {
    let sides = roll_sides(ctx.args);
    let result = rand::rng().random_range(1..=sides);
    format::panel(&format!("🎲 You rolled a {result} (d{sides})"))
}

fn coinflip(_ctx: &CommandContext<'_>) -> String {
    let side = if rand::rng().random_bool(0.5) {
        "Heads"
    } else {
        "Tails"
    };
    format::panel(&format!("🪙 Coin flip: {side}"))
}

fn quote(_ctx: &CommandContext<'_>) -> String {
    format::panel(&format!("📜 {}", pick(QUOTES)))
}

fn fact(_ctx: &CommandContext<'_>) -> String {
    format::panel(&format!("🧠 {}", pick(FACTS)))
}

fn meme_phrase() -> String {
    let template = pick(MEME_TEMPLATES);
    let mut phrase = String::new();
    for (i, part) in template.split("{}").enumerate() {
        if i > 0 {
            phrase.push_str(pick(MEME_ACTIONS));
        }
        phrase.push_str(part);
    }
    phrase
}

fn meme(_ctx: &CommandContext<'_>) -> String {
    format::panel(&format!("😂 {}", meme_phrase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{run_command, text};
    use crate::runtime::testing::test_runtime;

    #[test]
    fn roll_sides_defaults_to_six() {
        assert_eq!(roll_sides(&[]), 6);
        assert_eq!(roll_sides(&["20".to_string()]), 20);
        assert_eq!(roll_sides(&["0".to_string()]), 6);
        assert_eq!(roll_sides(&["-3".to_string()]), 6);
    }

    #[test]
    fn meme_phrase_fills_every_slot() {
        for _ in 0..20 {
            let phrase = meme_phrase();
            assert!(!phrase.contains("{}"));
            assert!(MEME_ACTIONS.iter().any(|a| phrase.contains(a)));
        }
    }

    #[tokio::test]
    async fn eight_ball_appends_question_mark() {
        let t = test_runtime();
        let reply = text(run_command(&t, "&8ball will it rain").await);
        assert!(reply.contains("will it rain?\n\n🎱 "));
        assert!(EIGHT_BALL.iter().any(|a| reply.contains(a)));

        let reply = text(run_command(&t, "&8ball").await);
        assert!(reply.contains("Please ask a question!"));
    }

    #[tokio::test]
    async fn roll_stays_within_sides() {
        let t = test_runtime();
        for _ in 0..20 {
            let reply = text(run_command(&t, "&roll 2").await);
            assert!(
                reply.contains("You rolled a 1 (d2)") || reply.contains("You rolled a 2 (d2)")
            );
        }
    }

    #[tokio::test]
    async fn coinflip_lands_on_a_side() {
        let t = test_runtime();
        let reply = text(run_command(&t, "&coinflip").await);
        assert!(reply.contains("Heads") || reply.contains("Tails"));
    }
}
