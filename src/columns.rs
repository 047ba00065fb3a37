//! Header normalization and keyword-driven column classification.
//!
//! Raw spreadsheet headers are human-authored: mixed scripts, punctuation,
//! duplicates, sometimes empty. [`normalize_header`] turns one header into a
//! stable `[a-z0-9_]` identifier via a fixed transliteration table, and
//! [`unique_headers`] resolves collisions left-to-right with numeric
//! suffixes so repeated runs on the same input yield the same output.
//!
//! Cleaning semantics are keyword-driven rather than configured per source:
//! [`classify`] maps an identifier to a [`ColumnClass`] using fixed keyword
//! tables, with service columns taking priority over everything else.

use std::collections::HashSet;

/// Substrings that mark a column as date-like.
pub const DATE_KEYWORDS: &[&str] = &["data", "date", "zapis"];

/// Substrings that mark a column as numeric.
pub const NUMERIC_KEYWORDS: &[&str] = &[
    "stoimost",
    "summa",
    "kolichestvo",
    "bonus",
    "nalichnye",
    "perevod",
    "terminal",
    "vdolg",
    "zp",
    "oplata",
    "stavka",
    "spisano",
    "god",
    "mesyats",
    "chasy",
];

/// Exact identifiers treated as boolean flags.
pub const BOOLEAN_COLUMNS: &[&str] = &["probili_na_evotore", "vnesli_v_crm", "relevant", "zamena"];

/// Metadata columns owned by the loader, never coerced and never hashed.
pub const SERVICE_COLUMNS: &[&str] = &["source_row_id", "row_hash", "id", "imported_at"];

const PLACEHOLDER_NAME: &str = "col_unnamed";
const DIGIT_PREFIX: &str = "col_";

/// Cyrillic phonetic transliteration plus punctuation folding. Characters
/// absent from the table pass through and are filtered afterwards.
const TRANSLIT: &[(char, &str)] = &[
    ('а', "a"),
    ('б', "b"),
    ('в', "v"),
    ('г', "g"),
    ('д', "d"),
    ('е', "e"),
    ('ё', "yo"),
    ('ж', "zh"),
    ('з', "z"),
    ('и', "i"),
    ('й', "y"),
    ('к', "k"),
    ('л', "l"),
    ('м', "m"),
    ('н', "n"),
    ('о', "o"),
    ('п', "p"),
    ('р', "r"),
    ('с', "s"),
    ('т', "t"),
    ('у', "u"),
    ('ф', "f"),
    ('х', "h"),
    ('ц', "ts"),
    ('ч', "ch"),
    ('ш', "sh"),
    ('щ', "sch"),
    ('ъ', ""),
    ('ы', "y"),
    ('ь', ""),
    ('э', "e"),
    ('ю', "yu"),
    ('я', "ya"),
    (' ', "_"),
    ('-', "_"),
    ('.', ""),
    (',', ""),
    ('/', "_"),
    ('(', ""),
    (')', ""),
];

fn transliterate(c: char) -> Option<&'static str> {
    TRANSLIT
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
}

/// Normalizes one raw header into a machine-safe identifier.
///
/// Worst case is the placeholder name; this never fails.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut mapped = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match transliterate(c) {
            Some(replacement) => mapped.push_str(replacement),
            None => mapped.push(c),
        }
    }

    let mut result = String::with_capacity(mapped.len());
    let mut last_underscore = false;
    for c in mapped.chars() {
        if !matches!(c, 'a'..='z' | '0'..='9' | '_') {
            continue;
        }
        if c == '_' {
            if last_underscore || result.is_empty() {
                continue;
            }
            last_underscore = true;
        } else {
            last_underscore = false;
        }
        result.push(c);
    }
    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        return PLACEHOLDER_NAME.to_string();
    }
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("{DIGIT_PREFIX}{result}");
    }
    result
}

/// Normalizes a full header row, resolving collisions with `_1`, `_2`, …
/// suffixes. Processing is strictly left-to-right, so identical input always
/// produces identical output.
pub fn unique_headers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut headers = Vec::with_capacity(raw.len());
    for header in raw {
        let base = normalize_header(header.as_ref());
        let mut candidate = base.clone();
        let mut suffix = 1usize;
        while !used.insert(candidate.clone()) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        headers.push(candidate);
    }
    headers
}

/// Cleaning semantics for one column, decided from its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnClass {
    /// Loader-owned metadata, passed through untouched.
    Service,
    /// Day-first date or timestamp.
    Date,
    /// Decimal quantity with locale quirks (NBSP separators, decimal comma).
    Numeric,
    /// Explicit boolean flag column.
    Boolean,
    /// Free text.
    Text,
}

/// Classifies a normalized column identifier.
///
/// A name can satisfy several keyword tables; priority is fixed so behavior
/// stays deterministic: service, then date, then numeric, then boolean,
/// then text.
pub fn classify(name: &str) -> ColumnClass {
    if SERVICE_COLUMNS.contains(&name) {
        return ColumnClass::Service;
    }
    if DATE_KEYWORDS.iter().any(|k| name.contains(k)) {
        return ColumnClass::Date;
    }
    if NUMERIC_KEYWORDS.iter().any(|k| name.contains(k)) {
        return ColumnClass::Numeric;
    }
    if BOOLEAN_COLUMNS.contains(&name) {
        return ColumnClass::Boolean;
    }
    ColumnClass::Text
}
