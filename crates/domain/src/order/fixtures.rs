//! Builders shared by the unit tests.

use chrono::{DateTime, TimeZone, Utc};

use super::{Branch, DeliveryType, Money, NewLineItem, NewOrder, Order};

/// A pickup order at San Marino, due 2026-03-10 10:00 local time.
pub(crate) fn new_order(products: &[(&str, u32)]) -> NewOrder {
    NewOrder {
        order_date: None,
        delivery_date: Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap(),
        delivery_time: Some("10:00".to_string()),
        customer_name: "Ana Torres".to_string(),
        customer_phone: Some("0991234567".to_string()),
        sales_channel: None,
        products: products
            .iter()
            .map(|(name, quantity)| NewLineItem {
                name: name.to_string(),
                quantity: *quantity,
                price: Money::from_cents(1000),
                accounting_product_id: None,
            })
            .collect(),
        delivery_type: DeliveryType::Pickup,
        branch: Some(Branch::SanMarino),
        google_maps_link: None,
        delivery_address: None,
        total_value: None,
        delivery_value: None,
        payment_method: None,
        responsible: None,
        comments: None,
        production_notes: None,
        invoice_needed: false,
        invoice_data: None,
    }
}

/// A placed order due at `delivery_date`.
pub(crate) fn order_due(delivery_date: DateTime<Utc>, products: &[(&str, u32)]) -> Order {
    let mut new = new_order(products);
    new.delivery_date = delivery_date;
    Order::place(new, Utc::now()).unwrap()
}
