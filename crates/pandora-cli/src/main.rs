//! CLI entry point for Pandora.
//!
//! This binary provides the `pandora` command for teaching, querying and
//! maintaining the factoid store the chat bot runs on.

mod chat;
mod cli;
mod config;
mod helpers;
mod interpolate;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pandora_store::{
    FactoidService, ResponseRecord, ResponseService, Store, StoreError, SystemClock,
};
use tracing::{debug, info, warn};

use crate::chat::ChatCommand;
use crate::cli::{Cli, Commands, ResponseAction};
use crate::config::{Overrides, PandoraConfig};
use crate::helpers::{factoid_detail, factoid_line, init_tracing, response_line};
use crate::interpolate::{InterpolateError, interpolate};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let config = PandoraConfig::load(&Overrides {
        config: cli.global.config,
        db: cli.global.db,
        log_level: cli.global.log_level,
    })?;
    init_tracing(&config.log_level);
    debug!(?config, "configuration resolved");

    let store = Store::open_with(&config.db_path, config.lock_timeout, Arc::new(SystemClock))
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;

    match cli.command {
        Commands::Teach { trigger, response } => cmd_teach(&store, &trigger, &response),
        Commands::Ask { message, who } => cmd_ask(&store, &message, who.as_deref()),
        Commands::Say { message, who } => cmd_say(&store, &message, who.as_deref()),
        Commands::Show { id, trigger } => cmd_show(&store, id, trigger.as_deref()),
        Commands::List { from, count } => cmd_list(&store, from, count),
        Commands::Rename { id, trigger } => cmd_rename(&store, id, &trigger),
        Commands::Delete { id } => cmd_delete(&store, id),
        Commands::Migrate => cmd_migrate(&store),
        Commands::Responses { action } => cmd_responses(&store, action),
    }
}

// ---------------------------------------------------------------------------
// Factoids
// ---------------------------------------------------------------------------

fn cmd_teach(store: &Store, trigger: &str, response: &str) -> Result<()> {
    match store.factoids().teach(trigger, response) {
        Ok(key) => {
            println!("Okay. Remembering that \"{trigger}\" is \"{}\" (#{key}).", response.trim());
            Ok(())
        }
        Err(StoreError::AlreadyExists { key, .. }) => {
            println!("But \"{trigger}\" is already \"{key}\".");
            Ok(())
        }
        Err(e) => Err(e).context("failed to teach response"),
    }
}

fn cmd_ask(store: &Store, message: &str, who: Option<&str>) -> Result<()> {
    let reply = store
        .factoids()
        .random_response(message)
        .context("failed to look up response")?;
    match reply {
        Some(reply) => println!("{}", render_reply(&reply, who)),
        None => debug!(message, "no factoid for message"),
    }
    Ok(())
}

fn cmd_say(store: &Store, message: &str, who: Option<&str>) -> Result<()> {
    match chat::parse_message(message) {
        ChatCommand::Teach { trigger, response } => cmd_teach(store, &trigger, &response),
        ChatCommand::Lookup(message) => cmd_ask(store, &message, who),
        ChatCommand::Unrecognised => {
            println!("Try \"pan: X is Y\", \"pan: X <is> Y\" or \"pan: X <reply> Y\".");
            Ok(())
        }
    }
}

/// Expand `${who}` and `${someone}` in a stored reply. An unterminated
/// placeholder still prints what was expanded before it.
///
/// `who` falls back to `$USER`. There is no channel to pick a random
/// member from, so `someone` is always "Someone".
fn render_reply(reply: &str, who: Option<&str>) -> String {
    let who = who
        .map(str::to_string)
        .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
        .unwrap_or_else(|| "Someone".to_string());
    let lookup = |key: &str| match key {
        "who" => Some(who.clone()),
        "someone" => Some("Someone".to_string()),
        _ => None,
    };
    match interpolate(reply, lookup) {
        Ok(text) => text,
        Err(InterpolateError::Unterminated { output }) => {
            warn!(reply, "stored reply has an unterminated placeholder");
            output
        }
    }
}

fn cmd_show(store: &Store, id: Option<u64>, trigger: Option<&str>) -> Result<()> {
    let factoids = store.factoids();
    let (factoid, key) = match (id, trigger) {
        (_, Some(trigger)) => (factoids.get_by_trigger(trigger)?, trigger.to_string()),
        (Some(id), None) => (factoids.get_by_id(id)?, id.to_string()),
        (None, None) => bail!("either an id or --trigger is required"),
    };
    let Some(factoid) = factoid else {
        bail!("no factoid {key}");
    };
    print!("{}", factoid_detail(&factoid));
    Ok(())
}

fn cmd_list(store: &Store, from: u64, count: u64) -> Result<()> {
    let page = store
        .factoids()
        .range(from, count)
        .context("failed to list factoids")?;
    for factoid in &page {
        println!("{}", factoid_line(factoid));
    }
    if page.is_empty() {
        println!("(no factoids from id {from})");
    }
    Ok(())
}

fn cmd_rename(store: &Store, id: u64, trigger: &str) -> Result<()> {
    let factoids = store.factoids();
    let Some(mut factoid) = factoids.get_by_id(id)? else {
        bail!("no factoid {id}");
    };
    let old = std::mem::replace(&mut factoid.trigger, trigger.to_string());
    factoids
        .update(factoid)
        .with_context(|| format!("failed to rename factoid {id}"))?;
    println!("Renamed #{id} \"{old}\" to \"{}\".", pandora_store::clean_trigger(trigger));
    Ok(())
}

fn cmd_delete(store: &Store, id: u64) -> Result<()> {
    let factoid = store
        .factoids()
        .delete(id)
        .with_context(|| format!("failed to delete factoid {id}"))?;
    let responses = store
        .responses()
        .delete_for_factoid(id)
        .context("failed to delete standalone responses")?;
    info!(factoid_id = id, responses, "factoid deleted");
    println!(
        "Deleted #{id} \"{}\" ({} responses, {responses} standalone).",
        factoid.trigger,
        factoid.responses.len()
    );
    Ok(())
}

fn cmd_migrate(store: &Store) -> Result<()> {
    let rewritten = store
        .factoids()
        .rewrite_legacy()
        .context("legacy migration failed")?;
    println!("Rewrote {rewritten} legacy factoid(s).");
    Ok(())
}

// ---------------------------------------------------------------------------
// Standalone responses
// ---------------------------------------------------------------------------

fn cmd_responses(store: &Store, action: ResponseAction) -> Result<()> {
    let responses = store.responses();
    match action {
        ResponseAction::Add {
            factoid_id,
            response,
        } => {
            let id = responses
                .create(ResponseRecord::new(factoid_id, response))
                .context("failed to add response")?;
            println!("Added response #{id} for factoid {factoid_id}.");
        }
        ResponseAction::List {
            factoid_id,
            start,
            count,
        } => {
            for record in responses.response_range(factoid_id, start, count)? {
                println!("{}", response_line(&record));
            }
        }
        ResponseAction::Count { factoid_id } => {
            println!("{}", responses.response_count(factoid_id)?);
        }
        ResponseAction::Get { id } => match responses.get(id)? {
            Some(record) => println!("{}", response_line(&record)),
            None => bail!("no response {id}"),
        },
        ResponseAction::Delete { id } => {
            if !responses.delete(id)? {
                bail!("no response {id}");
            }
            println!("Deleted response #{id}.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_placeholders_are_expanded() {
        assert_eq!(render_reply("hi ${who}", Some("Ann")), "hi Ann");
        assert_eq!(
            render_reply("${someone} did it", Some("Ann")),
            "Someone did it"
        );
        assert_eq!(render_reply("${nobody}?", Some("Ann")), "?");
    }

    #[test]
    fn plain_reply_is_untouched() {
        assert_eq!(render_reply("hi there", None), "hi there");
    }

    #[test]
    fn unterminated_reply_prints_expanded_prefix() {
        assert_eq!(render_reply("hi ${who", Some("Ann")), "hi ");
    }
}
