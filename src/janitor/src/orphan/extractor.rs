//! Derive asset ids from delivery URLs.
//!
//! A delivery URL has the shape
//! `https://res.cloudinary.com/{cloud}/image/upload/v{version}/{folder}/{name}.{ext}`.
//! The public id is everything after the segment following `upload`, with
//! the extension removed from the final segment. Segments are
//! percent-decoded, so `summer%20sale.jpg` names the asset `summer sale`.

use common::AssetId;
use percent_encoding::percent_decode_str;

/// Path segment marking the start of the delivery path.
pub const UPLOAD_SEGMENT: &str = "upload";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no `upload` segment in `{0}`")]
    MissingUploadSegment(String),

    #[error("no public id after the version segment in `{0}`")]
    MissingPublicId(String),
}

/// Extract the public id from a delivery URL.
///
/// Query string and fragment are ignored. Nested folders are kept, only the
/// text after the last `.` of the final segment is dropped.
pub fn extract_asset_id(reference: &str) -> Result<AssetId, ExtractError> {
    let path = reference.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').collect();

    let boundary = segments
        .iter()
        .position(|segment| *segment == UPLOAD_SEGMENT)
        .ok_or_else(|| ExtractError::MissingUploadSegment(reference.to_string()))?;

    let mut decoded: Vec<String> = segments
        .get(boundary + 2..)
        .unwrap_or_default()
        .iter()
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .collect();

    if let Some(name) = decoded.last_mut() {
        if let Some(dot) = name.rfind('.').filter(|dot| *dot > 0) {
            name.truncate(dot);
        }
    }

    if decoded.last().is_none_or(String::is_empty) {
        return Err(ExtractError::MissingPublicId(reference.to_string()));
    }

    Ok(AssetId::new(decoded.join("/")))
}
