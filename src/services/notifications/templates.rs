//! Askama views over the HTML email templates in `templates/email/`.
use askama::Template;

use crate::{
    constants::sessions::OTP_TIMEOUT,
    db::models::{
        apporder::{AppOrder, PaymentMode, PaymentStatus, ShippingAddress},
        appuser::AppUser,
    },
    services::payments::{format_rupees, QR_CONTENT_ID},
};

#[derive(Template)]
#[template(path = "email/otp.html")]
pub struct OtpEmail<'a> {
    pub code: &'a str,
    pub minutes: u32,
}

impl<'a> OtpEmail<'a> {
    pub const fn new(code: &'a str) -> Self {
        Self {
            code,
            minutes: OTP_TIMEOUT / 60,
        }
    }
}

pub struct OrderLine {
    pub description: String,
    pub size: String,
    pub quantity: i32,
    pub line_total: String,
}

pub struct UpiSection<'a> {
    pub vpa: &'a str,
    pub content_id: &'static str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
pub struct OrderConfirmationEmail<'a> {
    pub customer_name: &'a str,
    pub order_id: String,
    pub payment_mode: &'static str,
    pub payment_status: &'static str,
    pub lines: Vec<OrderLine>,
    pub total: String,
    pub upi: Option<UpiSection<'a>>,
    pub address: &'a ShippingAddress,
}

#[derive(Template)]
#[template(path = "email/upi_pending.html")]
pub struct UpiPendingEmail<'a> {
    pub customer_name: &'a str,
    pub order_id: String,
    pub total: String,
}

/// Name to greet the customer with: the shipping name, then the account
/// name, then the account email.
pub fn customer_name<'a>(order: &'a AppOrder, user: &'a AppUser) -> &'a str {
    [
        order.shipping_address().full_name.as_str(),
        user.name.as_str(),
        user.email().unwrap_or_default(),
    ]
    .into_iter()
    .map(str::trim)
    .find(|name| !name.is_empty())
    .unwrap_or("Customer")
}

const fn payment_mode_label(mode: PaymentMode) -> &'static str {
    match mode {
        PaymentMode::Cod => "COD",
        PaymentMode::Upi => "UPI",
    }
}

const fn payment_status_label(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "PENDING",
        PaymentStatus::Paid => "PAID",
    }
}

impl<'a> OrderConfirmationEmail<'a> {
    /// `upi_vpa` adds the QR section; the QR itself is attached inline.
    pub fn new(order: &'a AppOrder, customer_name: &'a str, upi_vpa: Option<&'a str>) -> Self {
        let lines = order
            .items()
            .iter()
            .map(|item| OrderLine {
                description: if item.title.trim().is_empty() {
                    item.brand.clone()
                } else {
                    format!("{} {}", item.brand, item.title)
                },
                size: item.size.clone(),
                quantity: item.quantity,
                line_total: format_rupees(item.price.saturating_mul(i64::from(item.quantity))),
            })
            .collect();
        Self {
            customer_name,
            order_id: order.id().to_string(),
            payment_mode: payment_mode_label(order.payment_mode()),
            payment_status: payment_status_label(order.payment_status()),
            lines,
            total: format_rupees(order.total_amount()),
            upi: upi_vpa.map(|vpa| UpiSection {
                vpa,
                content_id: QR_CONTENT_ID,
            }),
            address: order.shipping_address(),
        }
    }
}

impl<'a> UpiPendingEmail<'a> {
    pub fn new(order: &AppOrder, customer_name: &'a str) -> Self {
        Self {
            customer_name,
            order_id: order.id().to_string(),
            total: format_rupees(order.total_amount()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(full_name: &str) -> ShippingAddress {
        ShippingAddress {
            full_name: full_name.to_owned(),
            address: String::from("12 MG Road"),
            city: String::from("Pune"),
            state: String::from("Maharashtra"),
            pincode: String::from("411001"),
            phone: String::from("9876543210"),
        }
    }

    fn confirmation<'a>(
        address: &'a ShippingAddress,
        upi: Option<UpiSection<'a>>,
    ) -> OrderConfirmationEmail<'a> {
        OrderConfirmationEmail {
            customer_name: &address.full_name,
            order_id: String::from("6f1c1e0e-0000-4000-8000-000000000000"),
            payment_mode: if upi.is_some() { "UPI" } else { "COD" },
            payment_status: "PENDING",
            lines: vec![OrderLine {
                description: String::from("MRF ZLX"),
                size: String::from("185/65R15"),
                quantity: 2,
                line_total: format_rupees(900_000),
            }],
            total: format_rupees(900_000),
            upi,
            address,
        }
    }

    #[test]
    fn otp_email_shows_code_and_validity() {
        let html = OtpEmail::new("482913").render().expect("renders");
        assert!(html.contains("482913"));
        assert!(html.contains("valid for 5 minutes"));
    }

    #[test]
    fn order_confirmation_lists_items_and_totals() {
        let address = address("Ravi Kumar");
        let html = confirmation(&address, None).render().expect("renders");
        assert!(html.contains("Hello <b>Ravi Kumar</b>"));
        assert!(html.contains("MRF ZLX"));
        assert!(html.contains("Size: 185/65R15"));
        assert!(html.contains("9000.00"));
        assert!(html.contains("Pune, Maharashtra - 411001"));
        assert!(!html.contains("cid:"));
    }

    #[test]
    fn upi_confirmation_references_inline_qr() {
        let address = address("Ravi Kumar");
        let upi = UpiSection {
            vpa: "tyrefusion@upi",
            content_id: QR_CONTENT_ID,
        };
        let html = confirmation(&address, Some(upi)).render().expect("renders");
        assert!(html.contains("src=\"cid:upi_qr_code\""));
        assert!(html.contains("tyrefusion@upi"));
    }

    #[test]
    fn user_supplied_text_is_escaped() {
        let address = address("<script>alert(1)</script>");
        let html = confirmation(&address, None).render().expect("renders");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&#60;script&#62;") || html.contains("&lt;script&gt;"));
    }

    #[test]
    fn upi_pending_mentions_order_and_total() {
        let html = UpiPendingEmail {
            customer_name: "Asha",
            order_id: String::from("abc"),
            total: format_rupees(1_234_550),
        }
        .render()
        .expect("renders");
        assert!(html.contains("<b>abc</b>"));
        assert!(html.contains("12345.50"));
    }
}
