//! Chat-style message parsing for the `say` subcommand.
//!
//! Messages addressed to the bot (`pan:` or `pandora:`) teach a new
//! response. Three forms are recognised, tried in this order:
//!
//! ```text
//! pan: X <reply> Y     teaches "Y"
//! pan: X <is> Y        teaches "X is Y"
//! pan: X is Y          teaches "X is Y" (the whole message)
//! ```
//!
//! Anything not addressed to the bot is a lookup.

use std::sync::LazyLock;

use regex::Regex;

static ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^pan(dora)?: *").expect("valid regex"));
static IS_REPLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("( +is)? *<reply> *").expect("valid regex"));
static EXPLICIT_IS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(" *<is> *").expect("valid regex"));
static IMPLIED_IS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(" +is +").expect("valid regex"));

/// What a chat message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Learn `response` for `trigger`.
    Teach { trigger: String, response: String },
    /// Reply with a random response for the message.
    Lookup(String),
    /// Addressed to the bot, but in no form it understands.
    Unrecognised,
}

/// Classify a single chat message.
pub fn parse_message(message: &str) -> ChatCommand {
    let Some(address) = ADDRESS.find(message) else {
        return ChatCommand::Lookup(message.to_string());
    };
    let body = &message[address.end()..];

    if let Some(m) = IS_REPLY.find(body) {
        return teach(&body[..m.start()], body[m.end()..].trim());
    }
    if let Some(m) = EXPLICIT_IS.find(body) {
        let trigger = &body[..m.start()];
        let response = format!("{trigger} is {}", &body[m.end()..]);
        return teach(trigger, response.trim());
    }
    if let Some(m) = IMPLIED_IS.find(body) {
        return teach(&body[..m.start()], body.trim());
    }
    ChatCommand::Unrecognised
}

fn teach(trigger: &str, response: &str) -> ChatCommand {
    ChatCommand::Teach {
        trigger: trigger.to_string(),
        response: response.to_string(),
    }
}
