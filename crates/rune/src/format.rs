//! ANSI code-block panels used for every command reply.

const CYAN: &str = "\u{1b}[0;36m";
const GREEN: &str = "\u{1b}[0;32m";
const YELLOW: &str = "\u{1b}[0;33m";
const MAGENTA: &str = "\u{1b}[0;35m";
const RESET: &str = "\u{1b}[0m";

/// Panel with the default `[RUNE]` header.
pub fn panel(body: &str) -> String {
    titled_panel("RUNE", body)
}

pub fn titled_panel(title: &str, body: &str) -> String {
    format!("```ansi\n{CYAN}[{title}]{RESET}\n\n{body}```")
}

/// Command names in listings.
pub fn command(text: &str) -> String {
    format!("{GREEN}{text}{RESET}")
}

/// Section headings.
pub fn heading(text: &str) -> String {
    format!("{YELLOW}{text}{RESET}")
}

pub fn accent(text: &str) -> String {
    format!("{MAGENTA}{text}{RESET}")
}
