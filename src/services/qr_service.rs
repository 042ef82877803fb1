use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use qrcode::render::svg;
use qrcode::QrCode;

use crate::errors::{AppError, Result};

/// MIME type of the payload produced by [`encode_ticket_qr`].
pub const QR_MIME_TYPE: &str = "image/svg+xml";

/// Encodes the ticket id as a QR code and returns the SVG image, base64-encoded.
pub fn encode_ticket_qr(ticket_id: &str) -> Result<String> {
    let code = QrCode::new(ticket_id.as_bytes())
        .map_err(|e| AppError::internal(format!("QR generation failed: {}", e)))?;

    let image = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(base64.encode(image))
}

pub fn data_uri(payload: &str) -> String {
    format!("data:{};base64,{}", QR_MIME_TYPE, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_svg_payload() {
        let payload = encode_ticket_qr("TKT0123456789ABCDEF").unwrap();
        let svg = String::from_utf8(base64.decode(payload).unwrap()).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn same_ticket_yields_same_payload() {
        assert_eq!(
            encode_ticket_qr("TKT1").unwrap(),
            encode_ticket_qr("TKT1").unwrap()
        );
    }
}
