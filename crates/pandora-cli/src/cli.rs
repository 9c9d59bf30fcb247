//! CLI argument definitions for Pandora.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Pandora -- a chat bot that learns factoids.
#[derive(Parser)]
#[command(
    name = "pandora",
    version,
    about = "Pandora -- teach and query the factoid store",
    long_about = "Inspect and edit the factoids and responses the Pandora chat bot has \
                  learned, or talk to it the way chat users do."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Database file (overrides config and PANDORA_DB).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Read this config file instead of the default locations.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `pandora_store=trace`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Teach a response for a trigger.
    Teach {
        trigger: String,
        response: String,
    },

    /// Print a random response for a trigger.
    Ask {
        message: String,

        /// Name substituted for `${who}` in the reply (default: $USER).
        #[arg(long)]
        who: Option<String>,
    },

    /// Handle a message the way the chat bot would.
    Say {
        message: String,

        /// Name substituted for `${who}` in the reply (default: $USER).
        #[arg(long)]
        who: Option<String>,
    },

    /// Show one factoid with all its responses.
    Show {
        /// Factoid id.
        #[arg(required_unless_present = "trigger", conflicts_with = "trigger")]
        id: Option<u64>,

        /// Look the factoid up by trigger instead.
        #[arg(long, short)]
        trigger: Option<String>,
    },

    /// List factoids in id order.
    List {
        /// First id to include.
        #[arg(long, default_value_t = 0)]
        from: u64,

        /// How many to list (at most 100).
        #[arg(long, short, default_value_t = 20)]
        count: u64,
    },

    /// Give a factoid a new trigger.
    Rename {
        id: u64,
        trigger: String,
    },

    /// Delete a factoid and its standalone responses.
    Delete {
        id: u64,
    },

    /// Rewrite every legacy record in the current format.
    Migrate,

    /// Manage standalone response records.
    Responses {
        #[command(subcommand)]
        action: ResponseAction,
    },
}

/// Actions for standalone response records.
#[derive(Subcommand)]
pub enum ResponseAction {
    /// Add a response for a factoid id.
    Add {
        factoid_id: u64,
        response: String,
    },
    /// List responses for a factoid id.
    List {
        factoid_id: u64,
        /// Number of matching records to skip.
        #[arg(long, default_value_t = 0)]
        start: u64,
        #[arg(long, short, default_value_t = 20)]
        count: u64,
    },
    /// Count responses for a factoid id.
    Count {
        factoid_id: u64,
    },
    /// Show one response record.
    Get {
        id: u64,
    },
    /// Delete one response record.
    Delete {
        id: u64,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["pandora", "list", "--db", "x.db", "--count", "5"]).unwrap();
        assert_eq!(cli.global.db, Some(PathBuf::from("x.db")));
        assert!(matches!(cli.command, Commands::List { from: 0, count: 5 }));
    }

    #[test]
    fn ask_takes_optional_who() {
        let cli = Cli::try_parse_from(["pandora", "ask", "hello", "--who", "Ann"]).unwrap();
        match cli.command {
            Commands::Ask { message, who } => {
                assert_eq!(message, "hello");
                assert_eq!(who.as_deref(), Some("Ann"));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn show_needs_id_or_trigger() {
        assert!(Cli::try_parse_from(["pandora", "show"]).is_err());
        assert!(Cli::try_parse_from(["pandora", "show", "3"]).is_ok());
        assert!(Cli::try_parse_from(["pandora", "show", "--trigger", "hello"]).is_ok());
    }
}
