//! Header normalisation and similarity helpers

use strsim::jaro_winkler;

/// Catalogue prefixes treated as equivalent, mapped to their short form
const PREFIX_EQUIVALENTS: &[(&str, &str)] = &[
    ("planet_", "pl_"),
    ("stellar_", "st_"),
    ("star_", "st_"),
    ("system_", "sy_"),
];

/// Suffixes marking uncertainty, limit and reference companion columns
const UNCERTAINTY_SUFFIXES: &[&str] = &["err1", "err2", "err", "lim", "_unc", "reflink"];

/// Lower-case, collapse every non-alphanumeric run to `_`, trim `_`
///
/// `"Distance [pc]"` becomes `distance_pc`.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// True for companion columns (`pl_radeerr1`, `pl_radelim`, ...) that carry
/// error bars or flags rather than values
pub fn is_uncertainty_column(normalized: &str) -> bool {
    UNCERTAINTY_SUFFIXES
        .iter()
        .any(|suffix| normalized.len() > suffix.len() && normalized.ends_with(suffix))
}

/// Rewrite a leading long catalogue prefix to its short form
pub fn canonical_prefix(normalized: &str) -> String {
    for (long, short) in PREFIX_EQUIVALENTS {
        if let Some(rest) = normalized.strip_prefix(long) {
            return format!("{}{}", short, rest);
        }
    }
    normalized.to_string()
}

fn contains_token_run(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

/// Token containment score between a header and an alias
///
/// One side's `_`-separated tokens must appear as a contiguous run in the
/// other's. Scores 0.70-0.95 by character length ratio.
pub fn containment_score(header: &str, alias: &str) -> Option<f64> {
    if header == alias {
        return None;
    }
    let header_tokens: Vec<&str> = header.split('_').collect();
    let alias_tokens: Vec<&str> = alias.split('_').collect();
    if !contains_token_run(&header_tokens, &alias_tokens)
        && !contains_token_run(&alias_tokens, &header_tokens)
    {
        return None;
    }
    let shorter = header.len().min(alias.len()) as f64;
    let longer = header.len().max(alias.len()) as f64;
    Some(0.70 + 0.25 * (shorter / longer))
}

/// True when header and alias differ only by an equivalent catalogue prefix
pub fn prefix_equivalent(header: &str, alias: &str) -> bool {
    header != alias && canonical_prefix(header) == canonical_prefix(alias)
}

/// Jaro-Winkler similarity of two normalised names
pub fn similarity(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b)
}

/// Fraction of non-empty sample values that parse as finite numbers
///
/// Returns `None` when the sample holds no non-empty values.
pub fn numeric_fraction<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a crate::types::RawValue>,
{
    let mut total = 0usize;
    let mut numeric = 0usize;
    for value in values {
        if value.is_empty() {
            continue;
        }
        total += 1;
        if value.as_f64().is_some() {
            numeric += 1;
        }
    }
    (total > 0).then(|| numeric as f64 / total as f64)
}
