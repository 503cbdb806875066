//! Loading champion images from disk

use crate::error::ClientResult;
use roster_common::{ImagePayload, RosterError, MAX_IMAGE_BYTES};
use std::path::Path;

/// Read an image file and encode it as a data URI
///
/// Files over the size ceiling are rejected before they are read. The MIME
/// type comes from the file's signature, not its extension.
pub fn image_data_uri_from_file(path: impl AsRef<Path>) -> ClientResult<String> {
    let path = path.as_ref();
    let size = std::fs::metadata(path)?.len();
    if size > MAX_IMAGE_BYTES as u64 {
        return Err(RosterError::Validation(format!(
            "{} is {} bytes, images may be at most {} bytes",
            path.display(),
            size,
            MAX_IMAGE_BYTES
        ))
        .into());
    }

    let bytes = std::fs::read(path)?;
    let sniffed = ImagePayload::sniffed(bytes);
    let payload = ImagePayload::from_bytes(sniffed.mime().to_string(), sniffed.into_bytes())?;
    log::debug!(
        "Loaded {} as {} ({} bytes)",
        path.display(),
        payload.mime(),
        payload.bytes().len()
    );
    Ok(payload.to_data_uri())
}
