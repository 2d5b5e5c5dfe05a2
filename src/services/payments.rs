//! UPI payment strings and their QR codes.
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use serde::Serialize;

/// Content ID the QR image is attached under in emails.
pub const QR_CONTENT_ID: &str = "upi_qr_code";

/// Everything a client needs to collect a UPI payment.
#[derive(Serialize, Clone, Debug)]
pub struct UpiPaymentInfo {
    pub uri: String,
    pub vpa: String,
    pub payee_name: String,
    /// Amount in paise.
    pub amount: i64,
    /// PNG of the QR code, base64 encoded.
    pub qr_png_base64: String,
}

/// Render paise as rupees with two decimals, e.g. `450000` -> `4500.00`.
pub fn format_rupees(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs = paise.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Build a `upi://pay` URI. Every component is percent-encoded.
pub fn upi_uri(vpa: &str, payee_name: &str, amount_paise: i64, note: &str) -> String {
    format!(
        "upi://pay?pa={}&pn={}&am={}&cu=INR&tn={}",
        urlencoding::encode(vpa),
        urlencoding::encode(payee_name),
        format_rupees(amount_paise),
        urlencoding::encode(note)
    )
}

/// Render `data` as a QR code PNG.
pub fn qr_png(data: &str) -> Result<Vec<u8>, errors::QrRenderError> {
    let code = QrCode::new(data.as_bytes())?;
    let image = code.render::<Luma<u8>>().min_dimensions(256, 256).build();
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Build the payment info for an order, rendering the QR once. The raw PNG
/// is returned too so it can be attached to email.
pub fn upi_payment_for_order(
    vpa: &str,
    payee_name: &str,
    amount_paise: i64,
    order_reference: &str,
) -> Result<(UpiPaymentInfo, Vec<u8>), errors::QrRenderError> {
    let uri = upi_uri(
        vpa,
        payee_name,
        amount_paise,
        &format!("TyreFusion order {order_reference}"),
    );
    let png = qr_png(&uri)?;
    Ok((
        UpiPaymentInfo {
            qr_png_base64: STANDARD.encode(&png),
            uri,
            vpa: vpa.to_owned(),
            payee_name: payee_name.to_owned(),
            amount: amount_paise,
        },
        png,
    ))
}

pub mod errors {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum QrRenderError {
        #[error(transparent)]
        Encode(#[from] qrcode::types::QrError),
        #[error(transparent)]
        Image(#[from] image::ImageError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rupees_keep_two_decimals() {
        assert_eq!(format_rupees(450_000), "4500.00");
        assert_eq!(format_rupees(5), "0.05");
        assert_eq!(format_rupees(123_456), "1234.56");
        assert_eq!(format_rupees(0), "0.00");
    }

    #[test]
    fn uri_is_percent_encoded() {
        assert_eq!(
            upi_uri("tyre.fusion@okicici", "TyreFusion Pvt Ltd", 899_900, "Order #AB12"),
            "upi://pay?pa=tyre.fusion%40okicici&pn=TyreFusion%20Pvt%20Ltd&am=8999.00&cu=INR&tn=Order%20%23AB12"
        );
    }

    #[test]
    fn qr_is_a_png() {
        let png = qr_png("upi://pay?pa=a@b&pn=x&am=1.00&cu=INR").expect("renders");
        assert!(png.starts_with(&[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a]));
    }

    #[test]
    fn payment_info_embeds_the_same_png() {
        let (info, png) =
            upi_payment_for_order("shop@upi", "TyreFusion", 1_050, "1a2b3c4d").expect("renders");
        assert_eq!(info.amount, 1_050);
        assert!(info.uri.contains("am=10.50"));
        assert!(info.uri.contains("tn=TyreFusion%20order%201a2b3c4d"));
        assert_eq!(STANDARD.decode(&info.qr_png_base64).expect("valid base64"), png);
    }
}
