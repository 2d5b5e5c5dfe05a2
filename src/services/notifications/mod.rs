//! Transactional email: rendering the templates and handing them to a
//! `Mailer`.
pub mod mailer;
pub mod templates;

use askama::Template;

use crate::{
    db::models::{
        apporder::{AppOrder, PaymentMode},
        appuser::AppUser,
    },
    services::payments::{self, QR_CONTENT_ID},
};

pub use mailer::{InlineImage, Mailer, OutgoingEmail};
use templates::{customer_name, OrderConfirmationEmail, OtpEmail, UpiPendingEmail};

/// Payee details used to attach the UPI QR code to order emails.
#[derive(Clone, Copy, Debug)]
pub struct UpiPayee<'a> {
    pub vpa: &'a str,
    pub name: &'a str,
}

/// Render and send a login code. Awaited, since the user cannot proceed
/// without it.
pub async fn send_otp_email(
    mailer: &Mailer,
    to: &str,
    code: &str,
) -> Result<(), errors::NotificationError> {
    let email = OutgoingEmail {
        to: to.to_owned(),
        subject: String::from("Your TyreFusion login code"),
        html: OtpEmail::new(code).render()?,
        inline_images: Vec::new(),
    };
    mailer.send(&email).await?;
    Ok(())
}

/// Build the order confirmation. UPI orders carry the payment QR inline when
/// a payee is configured. `None` when the customer has no email address.
pub fn order_confirmation(
    order: &AppOrder,
    user: &AppUser,
    upi_payee: Option<UpiPayee<'_>>,
) -> Result<Option<OutgoingEmail>, errors::NotificationError> {
    let Some(to) = user.email() else {
        return Ok(None);
    };
    let name = customer_name(order, user);
    let payee = upi_payee.filter(|_| order.payment_mode() == PaymentMode::Upi);
    let mut inline_images = Vec::new();
    if let Some(payee) = payee {
        let (_, png) = payments::upi_payment_for_order(
            payee.vpa,
            payee.name,
            order.total_amount(),
            &order.id().to_string(),
        )?;
        inline_images.push(InlineImage {
            content_id: QR_CONTENT_ID.to_owned(),
            filename: String::from("upi-qr.png"),
            png,
        });
    }
    let html = OrderConfirmationEmail::new(order, name, payee.map(|payee| payee.vpa)).render()?;
    Ok(Some(OutgoingEmail {
        to: to.to_owned(),
        subject: String::from("TyreFusion Order Confirmation"),
        html,
        inline_images,
    }))
}

/// Build the "payment pending" notice sent when a UPI order is placed.
pub fn upi_pending(
    order: &AppOrder,
    user: &AppUser,
) -> Result<Option<OutgoingEmail>, errors::NotificationError> {
    let Some(to) = user.email() else {
        return Ok(None);
    };
    let html = UpiPendingEmail::new(order, customer_name(order, user)).render()?;
    Ok(Some(OutgoingEmail {
        to: to.to_owned(),
        subject: String::from("TyreFusion - UPI Payment Pending"),
        html,
        inline_images: Vec::new(),
    }))
}

/// Send in the background. Failures are logged and otherwise dropped.
pub fn spawn_send(mailer: Mailer, email: OutgoingEmail) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&email).await {
            tracing::error!(to = %email.to, subject = %email.subject, error = %e, "Failed to send email");
        }
    });
}

pub mod errors {
    use thiserror::Error;

    use super::mailer::errors::EmailError;
    use crate::services::payments::errors::QrRenderError;

    #[derive(Debug, Error)]
    pub enum NotificationError {
        #[error("Failed to render email template: {0}")]
        Render(#[from] askama::Error),
        #[error(transparent)]
        QrCode(#[from] QrRenderError),
        #[error(transparent)]
        Delivery(#[from] EmailError),
    }
}
