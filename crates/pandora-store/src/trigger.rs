//! Trigger normalisation.
//!
//! Two triggers are the same factoid when their clean forms are equal. The
//! clean form is what gets stored and indexed.

use unicode_general_category::{GeneralCategory, get_general_category};

/// Normalise `trigger` for use as an index key.
///
/// The input is trimmed and lower-cased. Letters and decimal digits are
/// kept; whitespace and symbols (general categories `Sm`, `Sc`, `Sk`, `So`)
/// become separators, with each run collapsed to a single space. Everything
/// else, punctuation and combining marks included, is dropped.
///
/// ```
/// use pandora_store::clean_trigger;
///
/// assert_eq!(clean_trigger("  Hello,   World! "), "hello world");
/// assert_eq!(clean_trigger("a+b"), "a b");
/// ```
pub fn clean_trigger(trigger: &str) -> String {
    let mut out = String::with_capacity(trigger.len());

    for c in trigger.trim().chars().flat_map(char::to_lowercase) {
        match class(c) {
            Class::Keep => out.push(c),
            Class::Separator if !out.is_empty() && !out.ends_with(' ') => out.push(' '),
            Class::Separator | Class::Drop => {}
        }
    }

    let len = out.trim_end().len();
    out.truncate(len);
    out
}

enum Class {
    Keep,
    Separator,
    Drop,
}

fn class(c: char) -> Class {
    use GeneralCategory::*;

    if c.is_whitespace() {
        return Class::Separator;
    }
    match get_general_category(c) {
        UppercaseLetter | LowercaseLetter | TitlecaseLetter | ModifierLetter | OtherLetter
        | DecimalNumber => Class::Keep,
        MathSymbol | CurrencySymbol | ModifierSymbol | OtherSymbol => Class::Separator,
        _ => Class::Drop,
    }
}
