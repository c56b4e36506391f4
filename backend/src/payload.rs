//! Decoding of data-URL style upload payloads (`<prefix>,<base64 payload>`)

use base64::{engine::general_purpose::STANDARD, Engine as _};
use mime::Mime;
use thiserror::Error;

/// Errors raised while decoding an upload payload
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PayloadError {
    /// The payload has no `,` between prefix and data
    #[error("payload is missing the ',' separator between prefix and data")]
    MissingSeparator,

    /// The data after the separator is not valid standard base64
    #[error("payload data is not valid base64: {0}")]
    InvalidBase64(String),
}

/// A decoded upload payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    /// Raw file bytes
    pub bytes: Vec<u8>,
    /// Media type declared by a `data:<media-type>;base64` prefix, if parseable
    pub media_type: Option<Mime>,
}

/// Splits `data` at the first comma and base64-decodes the remainder.
///
/// The prefix is free-form; when it looks like `data:<media-type>[;params]`
/// the media type is extracted as well.
///
/// # Errors
///
/// Returns `PayloadError::MissingSeparator` if `data` has no comma and
/// `PayloadError::InvalidBase64` if the tail does not decode.
pub fn decode_data_url(data: &str) -> Result<DecodedPayload, PayloadError> {
    let (prefix, encoded) = data.split_once(',').ok_or(PayloadError::MissingSeparator)?;

    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| PayloadError::InvalidBase64(e.to_string()))?;

    Ok(DecodedPayload {
        bytes,
        media_type: media_type_of(prefix),
    })
}

fn media_type_of(prefix: &str) -> Option<Mime> {
    let declared = prefix.strip_prefix("data:")?;
    let declared = declared.strip_suffix(";base64").unwrap_or(declared);
    if declared.is_empty() {
        return None;
    }
    declared.parse().ok()
}
