//! Shared helper functions used across CLI subcommands.
//!
//! Includes tracing initialization and the plain-text renderers for
//! factoids and response records.

use pandora_store::{Factoid, ResponseRecord};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
///
/// `RUST_LOG`, when set, takes precedence. Logs go to stderr so command
/// output on stdout stays clean.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One-line summary used by `list`.
pub fn factoid_line(factoid: &Factoid) -> String {
    let lock = if factoid.protected { " [protected]" } else { "" };
    format!(
        "{:>6}  {}{}  ({} responses)",
        factoid.id,
        factoid.trigger,
        lock,
        factoid.responses.len()
    )
}

/// Multi-line detail view used by `show`.
pub fn factoid_detail(factoid: &Factoid) -> String {
    let mut out = format!(
        "#{} \"{}\"{}\n  created {}  edited {}\n",
        factoid.id,
        factoid.trigger,
        if factoid.protected { " [protected]" } else { "" },
        factoid.date_created.format(TIME_FORMAT),
        factoid.date_edited.format(TIME_FORMAT),
    );
    if factoid.responses.is_empty() {
        out.push_str("  (no responses)\n");
    }
    for (key, r) in &factoid.responses {
        out.push_str(&format!("  {key:>4}. {}\n", r.response));
    }
    out
}

pub fn response_line(record: &ResponseRecord) -> String {
    format!(
        "{:>6}  factoid {}  {}  {}",
        record.id,
        record.factoid_id,
        record.date_edited.format(TIME_FORMAT),
        record.response
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pandora_store::FactoidResponse;

    use super::*;

    fn sample() -> Factoid {
        let now = Utc.with_ymd_and_hms(2000, 1, 1, 12, 30, 0).unwrap();
        let mut f = Factoid::new("hello");
        f.id = 3;
        f.date_created = now;
        f.date_edited = now;
        f.responses.insert(1, FactoidResponse::new("hi there", now));
        f
    }

    #[test]
    fn line_shows_id_trigger_and_count() {
        assert_eq!(factoid_line(&sample()), "     3  hello  (1 responses)");
    }

    #[test]
    fn detail_lists_responses_by_key() {
        let detail = factoid_detail(&sample());
        assert!(detail.starts_with("#3 \"hello\"\n"));
        assert!(detail.contains("created 2000-01-01 12:30:00"));
        assert!(detail.contains("     1. hi there\n"));
    }

    #[test]
    fn detail_marks_empty_factoid() {
        let mut f = sample();
        f.responses.clear();
        f.protected = true;
        let detail = factoid_detail(&f);
        assert!(detail.contains("[protected]"));
        assert!(detail.contains("(no responses)"));
    }
}
