use std::collections::HashMap;

const MAX_COLUMN_NAME_LENGTH: usize = 60;

/// Normalize a single raw column name into the canonical form consumed by the generated
/// `CREATE TABLE` DDL: uppercased, whitespace collapsed to underscores, `#` spelled out as `NUM`,
/// every other non-alphanumeric character dropped, a leading digit prefixed with an underscore,
/// and the result truncated to [`MAX_COLUMN_NAME_LENGTH`] characters.
///
/// This function alone is not idempotent across duplicate suffixing; see
/// [`normalize_columns`] for the full, duplicate-aware pipeline. Applied twice to the same input
/// it always returns the same value, since every step it performs is itself idempotent.
pub fn normalize(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_whitespace() {
            name.push('_');
        } else if ch == '#' {
            name.push_str("NUM");
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            name.push(ch.to_ascii_uppercase());
        }
    }
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    if name.len() > MAX_COLUMN_NAME_LENGTH {
        name.truncate(MAX_COLUMN_NAME_LENGTH);
    }
    name
}

/// Normalize an ordered list of raw column names, then de-duplicate by suffixing `_N` in reverse
/// occurrence order: the last occurrence of a name keeps the bare normalized form, earlier
/// occurrences are numbered `_1`, `_2`, … counting backwards from the last.
///
/// Per spec scenario: `ID,Name,ID` normalizes and de-duplicates to `ID_1,NAME,ID`.
pub fn normalize_columns(raw: &[impl AsRef<str>]) -> Vec<String> {
    let normalized: Vec<String> = raw.iter().map(|r| normalize(r.as_ref())).collect();

    let mut occurrence_counts: HashMap<&str, usize> = HashMap::new();
    for name in &normalized {
        *occurrence_counts.entry(name.as_str()).or_insert(0) += 1;
    }

    let mut remaining: HashMap<&str, usize> = occurrence_counts.clone();
    let mut result = Vec::with_capacity(normalized.len());
    for name in &normalized {
        let total = occurrence_counts[name.as_str()];
        if total == 1 {
            result.push(name.clone());
            continue;
        }
        let left = remaining.get_mut(name.as_str()).expect("seeded above");
        *left -= 1;
        if *left == 0 {
            result.push(name.clone());
        } else {
            result.push(format!("{name}_{left}"));
        }
    }
    result
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::{normalize, normalize_columns};

    #[rstest]
    #[case("order #", "ORDER_NUM")]
    #[case("  leading/trailing  ", "LEADINGTRAILING")]
    #[case("1st_column", "_1ST_COLUMN")]
    #[case("already_OK", "ALREADY_OK")]
    #[case("na-me!", "NAME")]
    fn normalize_applies_the_rule_order(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw), expected);
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = ["order #", "1st_column", "Already OK", "weird!!chars##"];
        for input in inputs {
            let once = normalize(input);
            let twice = normalize(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalize_truncates_to_sixty_chars() {
        let long = "a".repeat(100);
        let result = normalize(&long);
        assert_eq!(result.len(), 60);
    }

    #[test]
    fn normalize_columns_dedupes_in_reverse_occurrence_order() {
        let raw = vec!["ID", "Name", "ID"];
        let result = normalize_columns(&raw);
        assert_eq!(result, vec!["ID_1", "NAME", "ID"]);
    }

    #[test]
    fn normalize_columns_leaves_unique_names_untouched() {
        let raw = vec!["ID", "Name", "Amount"];
        let result = normalize_columns(&raw);
        assert_eq!(result, vec!["ID", "NAME", "AMOUNT"]);
    }

    #[test]
    fn normalize_columns_handles_three_way_duplicates() {
        let raw = vec!["A", "A", "A"];
        let result = normalize_columns(&raw);
        assert_eq!(result, vec!["A_2", "A_1", "A"]);
    }
}
