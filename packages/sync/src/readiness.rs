//! Readiness filter: which catalog items are finished and recent enough.

use chrono::{DateTime, Utc};
use seqfetch_api_models::Item;

/// Whether `item` is complete and was completed strictly after `cutoff`.
///
/// Items with a missing or unparseable completion timestamp are never
/// ready, whatever their status.
#[must_use]
pub fn is_ready(item: &Item, cutoff: DateTime<Utc>) -> bool {
    item.is_complete() && item.completed_at().is_some_and(|done| done > cutoff)
}

/// Keeps the ready items, preserving input order.
#[must_use]
pub fn select_ready(items: Vec<Item>, cutoff: DateTime<Utc>) -> Vec<Item> {
    let total = items.len();
    let ready: Vec<Item> = items
        .into_iter()
        .filter(|item| is_ready(item, cutoff))
        .collect();

    log::info!(
        "{} of {total} item(s) completed after {}",
        ready.len(),
        cutoff.to_rfc3339()
    );

    ready
}

#[cfg(test)]
mod tests {
    use seqfetch_api_models::{ItemStatus, ProductName};

    use super::*;

    fn item(code: &str, status: ItemStatus, done_date: Option<&str>) -> Item {
        Item {
            code: code.parse().unwrap(),
            done_date: done_date.map(String::from),
            gross: 15.0,
            product_name: ProductName::PlasmidHighCopy,
            quantity: 1,
            status,
        }
    }

    fn cutoff() -> DateTime<Utc> {
        "2024-09-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn selects_complete_item_after_cutoff() {
        let items = vec![
            item(
                "AAA111",
                ItemStatus::Complete,
                Some("2024-09-02T00:00:00+00:00"),
            ),
            item("BBB222", ItemStatus::Pending, None),
        ];

        let ready = select_ready(items, cutoff());
        let codes: Vec<&str> = ready.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["AAA111"]);
    }

    #[test]
    fn excludes_items_at_or_before_cutoff() {
        let items = vec![
            item("AAA111", ItemStatus::Complete, Some("2024-09-01T00:00:00Z")),
            item("BBB222", ItemStatus::Complete, Some("2024-08-31T23:59:59Z")),
            item("CCC333", ItemStatus::Complete, Some("2024-09-01T00:00:01Z")),
        ];

        let ready = select_ready(items, cutoff());
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].code.as_str(), "CCC333");
    }

    #[test]
    fn excludes_incomplete_items_even_with_recent_date() {
        for status in [
            ItemStatus::Submitted,
            ItemStatus::Pending,
            ItemStatus::Processing,
            ItemStatus::Unknown,
        ] {
            let it = item("AAA111", status, Some("2025-01-01T00:00:00Z"));
            assert!(!is_ready(&it, cutoff()), "{status} should not be ready");
        }
    }

    #[test]
    fn missing_done_date_is_never_ready() {
        let it = item("AAA111", ItemStatus::Complete, None);
        let earliest = DateTime::<Utc>::MIN_UTC;
        assert!(!is_ready(&it, earliest));
        assert!(!is_ready(&it, cutoff()));
    }

    #[test]
    fn unparseable_done_date_is_not_ready() {
        let it = item("AAA111", ItemStatus::Complete, Some("soon"));
        assert!(!is_ready(&it, DateTime::<Utc>::MIN_UTC));
    }

    #[test]
    fn preserves_input_order() {
        let items = vec![
            item("CCC333", ItemStatus::Complete, Some("2024-10-03T00:00:00Z")),
            item("AAA111", ItemStatus::Complete, Some("2024-10-01T00:00:00Z")),
            item("BBB222", ItemStatus::Complete, Some("2024-10-02T00:00:00Z")),
        ];

        let ready = select_ready(items, cutoff());
        let codes: Vec<&str> = ready.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["CCC333", "AAA111", "BBB222"]);
    }
}
