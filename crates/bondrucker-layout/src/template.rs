// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Order receipt and printer test page, expressed as formatter sections.

use bondrucker_core::types::{FulfillmentMethod, Order, PrinterConfig, StoreInfo};
use chrono::{DateTime, Local};
use tracing::debug;

use crate::formatter::{Alignment, ContentFormatter, ItemRow, Section, Style};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Builds receipt content for one store.
#[derive(Debug, Clone)]
pub struct OrderTemplate {
    store: StoreInfo,
}

impl OrderTemplate {
    pub fn new(store: StoreInfo) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &StoreInfo {
        &self.store
    }

    /// Markup for `order` on `config`'s paper, stamped with the current time.
    pub fn render_order(&self, order: &Order, config: &PrinterConfig) -> String {
        let sections = self.order_sections(order, config, Local::now());
        debug!(order_id = order.id, sections = sections.len(), "order receipt built");
        ContentFormatter::new(config.paper_width).render(&sections)
    }

    /// Markup for the printer test page.
    pub fn render_test_page(&self, config: &PrinterConfig) -> String {
        ContentFormatter::new(config.paper_width).render(&self.test_page_sections(config, Local::now()))
    }

    /// Price with the store's currency symbol and two decimals.
    pub fn price(&self, amount: f64) -> String {
        if amount < 0.0 {
            format!("-{}{:.2}", self.store.currency_symbol, -amount)
        } else {
            format!("{}{:.2}", self.store.currency_symbol, amount)
        }
    }

    pub fn order_sections(
        &self,
        order: &Order,
        config: &PrinterConfig,
        printed_at: DateTime<Local>,
    ) -> Vec<Section> {
        let mut s = Vec::new();

        // -- header ---------------------------------------------------------
        if config.print_store_info {
            s.push(Section::StoreHeader {
                name: self.store.name.clone(),
                address: self.store.address.clone(),
                phone: self.store.phone.clone(),
            });
        } else {
            s.push(Section::Title(self.store.name.clone()));
        }
        s.push(Section::Divider);

        s.push(Section::label_value("Order", format!("#{}", order.number)));
        s.push(Section::label_value(
            "Date",
            order.created_at.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
        ));
        s.push(Section::label_value("Printed", printed_at.format(TIMESTAMP_FORMAT).to_string()));

        if let Some(fulfillment) = &order.fulfillment {
            let label = match fulfillment.method {
                FulfillmentMethod::Delivery => "Delivery",
                FulfillmentMethod::Pickup => "Pickup",
            };
            let when = [fulfillment.date.as_deref(), fulfillment.time.as_deref()]
                .into_iter()
                .flatten()
                .filter(|part| !part.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            let value = if when.is_empty() { "ASAP".to_string() } else { when };
            s.push(Section::label_value(label, value));
        }

        // -- customer -------------------------------------------------------
        let address = if order.shipping_address.trim().is_empty() {
            &order.billing_address
        } else {
            &order.shipping_address
        };
        let has_customer = !order.customer_name.trim().is_empty()
            || !order.contact_info.trim().is_empty()
            || !address.trim().is_empty();
        if config.print_customer_info && has_customer {
            s.push(Section::Divider);
            s.push(Section::heading("Customer"));
            for (label, value) in [
                ("Name", &order.customer_name),
                ("Contact", &order.contact_info),
                ("Address", address),
            ] {
                if !value.trim().is_empty() {
                    s.push(Section::label_value(label, value.clone()));
                }
            }
        }

        // -- items ----------------------------------------------------------
        s.push(Section::Divider);
        s.push(Section::ItemHeader {
            quantity: "Qty".into(),
            name: "Item".into(),
            price: "Price".into(),
        });
        for item in &order.items {
            s.push(Section::Item(ItemRow {
                quantity: item.quantity,
                name: item.name.clone(),
                price: self.price(item.line_total),
                options: if config.print_item_details {
                    item.options.clone()
                } else {
                    Vec::new()
                },
            }));
        }

        // -- totals ---------------------------------------------------------
        s.push(Section::Divider);
        s.push(Section::left_right("Subtotal:", self.price(order.subtotal)));
        for fee in &order.fee_lines {
            s.push(Section::left_right(format!("{}:", fee.name), self.price(fee.total)));
        }
        if order.discount_total > 0.0 {
            s.push(Section::left_right("Discount:", self.price(-order.discount_total)));
        }
        if order.tax_lines.is_empty() {
            if order.total_tax > 0.0 {
                s.push(Section::left_right("Tax:", self.price(order.total_tax)));
            }
        } else {
            for tax in &order.tax_lines {
                s.push(Section::left_right(
                    format!("{} ({}%):", tax.label, tax.rate_percent),
                    self.price(tax.total),
                ));
            }
        }
        s.push(Section::left_right(
            "<b>Total:</b>",
            format!("<b>{}</b>", self.price(order.total)),
        ));
        if !order.payment_method.trim().is_empty() {
            s.push(Section::label_value("Payment", order.payment_method.clone()));
        }

        // -- notes / footer -------------------------------------------------
        if config.print_order_notes && !order.notes.trim().is_empty() {
            s.push(Section::Divider);
            s.push(Section::heading("Notes"));
            s.push(Section::text(order.notes.clone(), Alignment::Left));
        }

        if config.print_footer {
            s.push(Section::Footer("Thank you for your order!".into()));
        } else {
            s.push(Section::Feed(3));
        }
        s
    }

    pub fn test_page_sections(&self, config: &PrinterConfig, printed_at: DateTime<Local>) -> Vec<Section> {
        let centered_bold = |text: &str| Section::Text {
            text: text.into(),
            alignment: Alignment::Center,
            style: Style::BOLD,
        };

        vec![
            Section::Title(self.store.name.clone()),
            centered_bold("Printer Test Page"),
            Section::Divider,
            Section::label_value("Printer", config.display_name()),
            Section::label_value("Address", config.address.clone()),
            Section::label_value("Paper", format!("{}mm", config.paper_width.millimetres())),
            Section::label_value("Time", printed_at.format(TIMESTAMP_FORMAT).to_string()),
            Section::Divider,
            Section::text("Normal text", Alignment::Left),
            Section::heading("Bold text"),
            Section::Divider,
            Section::text("Left aligned", Alignment::Left),
            Section::text("Centered", Alignment::Center),
            Section::text("Right aligned", Alignment::Right),
            Section::Divider,
            Section::text("中文测试 CJK width test", Alignment::Left),
            Section::text("0123456789", Alignment::Left),
            Section::ItemHeader {
                quantity: "Qty".into(),
                name: "Item".into(),
                price: "Price".into(),
            },
            Section::Item(ItemRow {
                quantity: 2,
                name: "Sample item with a long name that wraps".into(),
                price: self.price(9.5),
                options: Vec::new(),
            }),
            Section::Footer("Test complete\nPrinter is working".into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondrucker_core::types::{Fulfillment, ItemOption, OrderItem, PaperWidth, TaxLine};
    use chrono::Utc;

    fn order() -> Order {
        Order {
            id: 1042,
            number: "1042".into(),
            created_at: Utc::now(),
            status: "processing".into(),
            customer_name: "Ada Lovelace".into(),
            contact_info: "555-0199".into(),
            billing_address: "12 Analytical Way".into(),
            shipping_address: String::new(),
            payment_method: "Card".into(),
            notes: "No onions please".into(),
            items: vec![OrderItem {
                name: "Beef Pho".into(),
                quantity: 2,
                unit_price: 11.5,
                line_total: 23.0,
                options: vec![ItemOption {
                    key: "Size".into(),
                    value: "Large".into(),
                }],
            }],
            fee_lines: Vec::new(),
            tax_lines: vec![TaxLine {
                label: "GST".into(),
                rate_percent: 10.0,
                total: 2.3,
            }],
            subtotal: 23.0,
            total_tax: 2.3,
            discount_total: 0.0,
            total: 25.3,
            fulfillment: Some(Fulfillment {
                method: FulfillmentMethod::Pickup,
                date: Some("2026-03-01".into()),
                time: Some("18:30".into()),
            }),
            is_printed: false,
        }
    }

    fn template() -> OrderTemplate {
        OrderTemplate::new(StoreInfo {
            name: "Pho Corner".into(),
            address: "9 Market Lane".into(),
            phone: "555-0100".into(),
            currency_symbol: "$".into(),
        })
    }

    #[test]
    fn receipt_contains_core_fields() {
        let cfg = PrinterConfig::bluetooth("Front", "AA:BB:CC:DD:EE:FF", PaperWidth::Mm80);
        let markup = template().render_order(&order(), &cfg);
        assert!(markup.contains("Pho Corner"));
        assert!(markup.contains("<b>Order:</b> #1042"));
        assert!(markup.contains("Beef Pho"));
        assert!(markup.contains("- Size: Large"));
        assert!(markup.contains("$25.30"));
        assert!(markup.contains("GST (10%):"));
        assert!(markup.contains("<b>Pickup:</b> 2026-03-01 18:30"));
        assert!(markup.contains("Thank you for your order!"));
    }

    #[test]
    fn toggles_hide_optional_blocks() {
        let mut cfg = PrinterConfig::bluetooth("Front", "AA:BB:CC:DD:EE:FF", PaperWidth::Mm57);
        cfg.print_store_info = false;
        cfg.print_customer_info = false;
        cfg.print_item_details = false;
        cfg.print_order_notes = false;
        cfg.print_footer = false;

        let markup = template().render_order(&order(), &cfg);
        assert!(markup.contains("Pho Corner"));
        assert!(!markup.contains("9 Market Lane"));
        assert!(!markup.contains("Ada Lovelace"));
        assert!(!markup.contains("Size: Large"));
        assert!(!markup.contains("No onions"));
        assert!(!markup.contains("Thank you"));
    }

    #[test]
    fn every_receipt_line_fits_the_paper() {
        for paper in [PaperWidth::Mm57, PaperWidth::Mm80] {
            let cfg = PrinterConfig::bluetooth("Front", "AA:BB:CC:DD:EE:FF", paper);
            let t = template();
            let fmt = ContentFormatter::new(paper);
            for line in fmt.format(&t.order_sections(&order(), &cfg, Local::now())) {
                assert!(line.columns() <= fmt.budget(), "{:?}", line.text);
            }
            for line in fmt.format(&t.test_page_sections(&cfg, Local::now())) {
                assert!(line.columns() <= fmt.budget(), "{:?}", line.text);
            }
        }
    }

    #[test]
    fn discount_is_rendered_negative() {
        let mut o = order();
        o.discount_total = 5.0;
        let cfg = PrinterConfig::bluetooth("Front", "AA:BB:CC:DD:EE:FF", PaperWidth::Mm80);
        assert!(template().render_order(&o, &cfg).contains("-$5.00"));
    }

    #[test]
    fn test_page_names_printer_and_paper() {
        let cfg = PrinterConfig::bluetooth("Kitchen", "00:11:22:33:44:55", PaperWidth::Mm57);
        let markup = template().render_test_page(&cfg);
        assert!(markup.contains("<b>Printer:</b> Kitchen"));
        assert!(markup.contains("<b>Paper:</b> 57mm"));
        assert!(markup.contains("Printer is working"));
    }
}
