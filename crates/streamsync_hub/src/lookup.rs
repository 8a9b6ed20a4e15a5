//! Doctype lookup for the hub's reference-doctype picker.

use crate::config::StreamConfig;

/// Lists doctypes with at least one manual rule.
///
/// Results are distinct and sorted, filtered by a case-insensitive substring
/// match on `txt`, then paged with `start` / `page_len`.
pub fn search_doctypes(
    config: &StreamConfig,
    txt: &str,
    start: usize,
    page_len: usize,
) -> Vec<String> {
    let needle = txt.to_lowercase();
    config
        .manual_doctypes()
        .into_iter()
        .filter(|doctype| doctype.to_lowercase().contains(&needle))
        .skip(start)
        .take(page_len)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StreamConfig {
        StreamConfig::from_toml_str(
            r#"
[[consumers]]
name = "east"
[[consumers.doctypes]]
ref_doctype = "Sales Invoice"
stream_type = "Manual"
[[consumers.doctypes]]
ref_doctype = "Item"
stream_type = "Manual"
[[consumers.doctypes]]
ref_doctype = "Customer"
stream_type = "Realtime"

[[consumers]]
name = "west"
[[consumers.doctypes]]
ref_doctype = "Sales Order"
stream_type = "Manual"
[[consumers.doctypes]]
ref_doctype = "Sales Invoice"
stream_type = "Manual"
"#,
        )
        .unwrap()
    }

    #[test]
    fn empty_text_lists_all_manual_doctypes() {
        assert_eq!(
            search_doctypes(&config(), "", 0, 20),
            vec!["Item", "Sales Invoice", "Sales Order"]
        );
    }

    #[test]
    fn filter_is_case_insensitive() {
        assert_eq!(
            search_doctypes(&config(), "sales", 0, 20),
            vec!["Sales Invoice", "Sales Order"]
        );
        assert!(search_doctypes(&config(), "customer", 0, 20).is_empty());
    }

    #[test]
    fn paging() {
        assert_eq!(search_doctypes(&config(), "", 1, 1), vec!["Sales Invoice"]);
        assert!(search_doctypes(&config(), "", 5, 10).is_empty());
        assert!(search_doctypes(&config(), "", 0, 0).is_empty());
    }
}
