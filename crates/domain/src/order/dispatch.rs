use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use common::{DispatchId, LineItemId};
use serde::{Deserialize, Serialize};

use super::{DispatchStatus, LineItem};

/// How long after `reported_at` a dispatch record may still be edited.
pub const EDIT_WINDOW: Duration = Duration::hours(1);

/// `reported_by` of records created by the dispatch reconciler.
pub const AUTO_DISPATCH_REPORTER: &str = "Sistema (Despacho automático)";

/// `notes` of records created by the dispatch reconciler.
pub const AUTO_DISPATCH_NOTE: &str = "Despacho registrado automáticamente por producto";

/// Units of one line sent in a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchItem {
    pub line_item_id: LineItemId,

    /// Line name at the time of the dispatch.
    #[serde(default)]
    pub name: String,

    pub quantity_sent: u32,
}

/// One shipment or hand-off attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub id: DispatchId,

    /// Creation time. Never changes.
    pub reported_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,

    pub destination: String,

    pub items: Vec<DispatchItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub reported_by: String,
}

impl DispatchRecord {
    /// Creates a record reported at `now`.
    pub fn new(
        destination: impl Into<String>,
        items: Vec<DispatchItem>,
        notes: Option<String>,
        reported_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DispatchId::new(),
            reported_at: now,
            modified_at: now,
            destination: destination.into(),
            items,
            notes,
            reported_by: reported_by.into(),
        }
    }

    /// Returns true while the record may still be edited.
    pub fn is_editable_at(&self, now: DateTime<Utc>) -> bool {
        now - self.reported_at <= EDIT_WINDOW
    }
}

/// Total units sent per line across all dispatches.
///
/// Summed as `u64`; uncapped manual dispatches can push a line past
/// `u32::MAX`.
pub fn sent_per_line(dispatches: &[DispatchRecord]) -> HashMap<LineItemId, u64> {
    let mut sent = HashMap::new();
    for item in dispatches.iter().flat_map(|d| &d.items) {
        *sent.entry(item.line_item_id).or_insert(0) += u64::from(item.quantity_sent);
    }
    sent
}

/// Derives the dispatch status of an order from scratch.
///
/// Lines are compared by identity, never by name.
pub fn derive_dispatch_status(products: &[LineItem], dispatches: &[DispatchRecord]) -> DispatchStatus {
    let sent = sent_per_line(dispatches);
    let sent_for = |line: &LineItem| sent.get(&line.id).copied().unwrap_or(0);

    if products.iter().all(|line| sent_for(line) == 0) {
        return DispatchStatus::NotSent;
    }
    if products.iter().any(|line| sent_for(line) > u64::from(line.quantity)) {
        return DispatchStatus::Problem;
    }
    if products.iter().any(|line| sent_for(line) < u64::from(line.quantity)) {
        return DispatchStatus::Partial;
    }
    DispatchStatus::Sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Money;

    fn line(name: &str, quantity: u32) -> LineItem {
        LineItem::new(name, quantity, Money::from_cents(100))
    }

    fn record(items: &[(&LineItem, u32)]) -> DispatchRecord {
        DispatchRecord::new(
            "San Marino",
            items
                .iter()
                .map(|(line, qty)| DispatchItem {
                    line_item_id: line.id,
                    name: line.name.clone(),
                    quantity_sent: *qty,
                })
                .collect(),
            None,
            "test",
            Utc::now(),
        )
    }

    #[test]
    fn nothing_sent() {
        let products = vec![line("Tarta", 2)];
        assert_eq!(derive_dispatch_status(&products, &[]), DispatchStatus::NotSent);
    }

    #[test]
    fn partial_then_sent() {
        let tarta = line("Tarta", 3);
        let pan = line("Pan", 2);
        let products = vec![tarta.clone(), pan.clone()];

        let first = record(&[(&tarta, 3)]);
        assert_eq!(
            derive_dispatch_status(&products, std::slice::from_ref(&first)),
            DispatchStatus::Partial
        );

        let second = record(&[(&pan, 2)]);
        assert_eq!(
            derive_dispatch_status(&products, &[first, second]),
            DispatchStatus::Sent
        );
    }

    #[test]
    fn overshipment_overrides_partial() {
        let tarta = line("Tarta", 3);
        let pan = line("Pan", 2);
        let products = vec![tarta.clone(), pan];

        let dispatches = vec![record(&[(&tarta, 2)]), record(&[(&tarta, 2)])];
        assert_eq!(
            derive_dispatch_status(&products, &dispatches),
            DispatchStatus::Problem
        );
    }

    #[test]
    fn line_totals_do_not_wrap() {
        let tarta = line("Tarta", 2);
        let products = vec![tarta.clone()];

        let dispatches = vec![record(&[(&tarta, u32::MAX)]), record(&[(&tarta, 1)])];
        assert_eq!(sent_per_line(&dispatches)[&tarta.id], 1 << 32);
        assert_eq!(
            derive_dispatch_status(&products, &dispatches),
            DispatchStatus::Problem
        );
    }

    #[test]
    fn lines_with_the_same_name_are_tracked_separately() {
        let first = line("Tarta", 2);
        let second = line("Tarta", 2);
        let products = vec![first.clone(), second];

        // Four units of "Tarta", all against the first line
        let dispatches = vec![record(&[(&first, 4)])];
        assert_eq!(
            derive_dispatch_status(&products, &dispatches),
            DispatchStatus::Problem
        );
    }

    #[test]
    fn edit_window_boundary() {
        let tarta = line("Tarta", 1);
        let rec = record(&[(&tarta, 1)]);

        assert!(rec.is_editable_at(rec.reported_at + Duration::minutes(59)));
        assert!(rec.is_editable_at(rec.reported_at + EDIT_WINDOW));
        assert!(!rec.is_editable_at(rec.reported_at + EDIT_WINDOW + Duration::seconds(1)));
    }
}
