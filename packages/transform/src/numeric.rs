//! Numeric coercion for price, load, and flow columns.

/// Lowercased substrings that mark a column for numeric coercion.
pub const NUMERIC_KEYWORDS: &[&str] = &["lbmp", "price", "load", "flow", "limit", "cost", "mwh"];

/// Whether `column` should be coerced to numbers.
#[must_use]
pub fn is_numeric_column(column: &str) -> bool {
    let lower = column.to_lowercase();
    NUMERIC_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Parses `value` after stripping `$`, `,`, and whitespace.
#[must_use]
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}
