//! Affliction text parsing.
//!
//! `parse` is locale-agnostic; everything language-specific lives in a
//! `LocaleGrammar`. Adding a locale means adding a table module and a
//! `Locale` variant, not touching the parser.

mod en;
mod grammar;
pub mod markup;
mod parser;
mod zh;

pub use grammar::{GrammarError, GrammarTables, Locale, LocaleGrammar, WeaknessRule};
pub use parser::{definition_key, parse, ParseError, ParseOutcome, StructuredHints, DEFAULT_NAME};

/// Parse with the grammar of `locale`.
pub fn parse_with_locale(
    raw: &str,
    locale: Locale,
    hints: Option<&StructuredHints>,
) -> Result<ParseOutcome, ParseError> {
    let grammar = locale.grammar()?;
    parse(raw, grammar, hints)
}
