//! The `_full_text` projection: a tsvector-style index of every data value in a row.

use std::collections::BTreeMap;

/// Builds the tsvector text form of a row's values.
///
/// Tokens are maximal runs of alphanumeric characters, lower-cased, numbered from 1 across the
/// whole row. Lexemes are sorted and quoted (`'galway':5`), each listing its positions.
pub fn to_tsvector<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut lexemes: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut position = 0usize;
    for value in values {
        for token in value
            .as_ref()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            position += 1;
            lexemes.entry(token.to_lowercase()).or_default().push(position);
        }
    }

    let mut out = String::new();
    for (lexeme, positions) in &lexemes {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push('\'');
        out.push_str(&lexeme.replace('\'', "''"));
        out.push_str("':");
        let list: Vec<String> = positions.iter().map(usize::to_string).collect();
        out.push_str(&list.join(","));
    }
    out
}
