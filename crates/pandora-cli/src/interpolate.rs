//! `${key}` placeholder expansion for stored responses.
//!
//! Escapes: `\$`, `\n`, `\r`, `\t` and `\\`; any other backslash pair is
//! kept as written. `$$` is a literal `$`, and so is a `$` not followed by
//! `{`. Unknown keys expand to nothing.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolateError {
    /// A `${` was never closed. `output` holds everything expanded so far.
    #[error("unterminated placeholder")]
    Unterminated { output: String },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    Dollar,
    Escape,
    Key,
}

/// Expand every `${key}` in `text` with `lookup(key)`.
pub fn interpolate<F>(text: &str, mut lookup: F) -> Result<String, InterpolateError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut key = String::new();
    let mut state = State::Text;

    for c in text.chars() {
        state = match (state, c) {
            (State::Key, '}') => {
                if let Some(value) = lookup(&key) {
                    out.push_str(&value);
                }
                key.clear();
                State::Text
            }
            (State::Key, c) => {
                key.push(c);
                State::Key
            }
            (State::Dollar, '{') => State::Key,
            (State::Dollar, '$') => {
                out.push('$');
                State::Dollar
            }
            (State::Dollar, '\\') => {
                out.push('$');
                State::Escape
            }
            (State::Dollar, c) => {
                out.push('$');
                out.push(c);
                State::Text
            }
            (State::Escape, c) => {
                match c {
                    '$' => out.push('$'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    '\\' => out.push('\\'),
                    c => {
                        out.push('\\');
                        out.push(c);
                    }
                }
                State::Text
            }
            (State::Text, '$') => State::Dollar,
            (State::Text, '\\') => State::Escape,
            (State::Text, c) => {
                out.push(c);
                State::Text
            }
        };
    }

    match state {
        State::Dollar => out.push('$'),
        State::Key => return Err(InterpolateError::Unterminated { output: out }),
        State::Text | State::Escape => {}
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl FnMut(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn none(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(interpolate("Hi!", none).unwrap(), "Hi!");
    }

    #[test]
    fn unknown_key_expands_to_nothing() {
        assert_eq!(interpolate("${woof}", none).unwrap(), "");
        assert_eq!(interpolate("woof ${woof}", none).unwrap(), "woof ");
    }

    #[test]
    fn dollar_handling() {
        assert_eq!(interpolate("$", none).unwrap(), "$");
        assert_eq!(interpolate("$${woof}", none).unwrap(), "$");
        assert_eq!(interpolate("$\\${woof}", none).unwrap(), "$${woof}");
        assert_eq!(interpolate("costs $5", none).unwrap(), "costs $5");
    }

    #[test]
    fn escapes() {
        assert_eq!(interpolate("\\n\\r\\t\\$\\\\", none).unwrap(), "\n\r\t$\\");
        assert_eq!(interpolate("\\q", none).unwrap(), "\\q");
    }

    #[test]
    fn single_and_multiple_keys() {
        assert_eq!(
            interpolate("Hi, my name is ${name}.", vars(&[("name", "George")])).unwrap(),
            "Hi, my name is George."
        );
        let lookup = vars(&[
            ("name", "George"),
            ("place", "the restaurant"),
            ("object", "steak"),
        ]);
        assert_eq!(
            interpolate(
                "Hi, my name is ${name}. Meet me at ${place} for ${object}.",
                lookup
            )
            .unwrap(),
            "Hi, my name is George. Meet me at the restaurant for steak."
        );
    }

    #[test]
    fn unterminated_key_keeps_partial_output() {
        assert_eq!(
            interpolate("Hi, my name is ${name", vars(&[("name", "George")])),
            Err(InterpolateError::Unterminated {
                output: "Hi, my name is ".into()
            })
        );
    }

    #[test]
    fn empty_key_is_a_valid_key() {
        assert_eq!(
            interpolate("The science of ${}.", vars(&[("", "Nihil")])).unwrap(),
            "The science of Nihil."
        );
    }

    #[test]
    fn lookup_is_only_called_for_used_keys() {
        let mut calls = Vec::new();
        interpolate("${who} and ${who}", |key| {
            calls.push(key.to_string());
            Some("x".into())
        })
        .unwrap();
        assert_eq!(calls, ["who", "who"]);
    }
}
