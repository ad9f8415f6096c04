// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sample order used by `bondrucker preview`.

use bondrucker_core::types::{
    FeeLine, Fulfillment, FulfillmentMethod, ItemOption, Order, OrderItem, TaxLine,
};
use chrono::Utc;

fn item(name: &str, quantity: u32, unit_price: f64, options: &[(&str, &str)]) -> OrderItem {
    OrderItem {
        name: name.into(),
        quantity,
        unit_price,
        line_total: unit_price * f64::from(quantity),
        options: options
            .iter()
            .map(|(key, value)| ItemOption {
                key: (*key).into(),
                value: (*value).into(),
            })
            .collect(),
    }
}

pub fn sample_order() -> Order {
    let items = vec![
        item("Beef Pho", 2, 13.5, &[("Size", "Large"), ("Extra", "Rare beef")]),
        item("宫保鸡丁 Kung Pao Chicken", 1, 15.9, &[]),
        item("Vietnamese Iced Coffee with Condensed Milk", 3, 5.0, &[("Ice", "Less")]),
    ];
    let subtotal: f64 = items.iter().map(|i| i.line_total).sum();
    let delivery = 4.0;
    let tax = (subtotal + delivery) * 0.1;

    Order {
        id: 1042,
        number: "1042".into(),
        created_at: Utc::now(),
        status: "processing".into(),
        customer_name: "Ada Lovelace".into(),
        contact_info: "0400 123 456".into(),
        billing_address: "12 Analytical Way, Marylebone".into(),
        shipping_address: String::new(),
        payment_method: "Card".into(),
        notes: "Ring the bell twice. No coriander in the pho please.".into(),
        items,
        fee_lines: vec![FeeLine {
            name: "Delivery".into(),
            total: delivery,
        }],
        tax_lines: vec![TaxLine {
            label: "GST".into(),
            rate_percent: 10.0,
            total: tax,
        }],
        subtotal,
        total_tax: tax,
        discount_total: 0.0,
        total: subtotal + delivery + tax,
        fulfillment: Some(Fulfillment {
            method: FulfillmentMethod::Delivery,
            date: None,
            time: Some("18:30".into()),
        }),
        is_printed: false,
    }
}
