//! Multipart body building.

use reqwest::multipart::{Form, Part};
use shelfscan_application::ports::{FormPart, TransportError};

/// Builds a multipart form from `parts`, preserving their order.
///
/// # Errors
///
/// Returns `TransportError::InvalidRequest` if a file's content type is
/// not a valid MIME type.
pub fn build_form(parts: &[FormPart]) -> Result<Form, TransportError> {
    let mut form = Form::new();

    for part in parts {
        match part {
            FormPart::Text { name, value } => {
                form = form.text(name.clone(), value.clone());
            }
            FormPart::File { name, upload } => {
                let file = Part::bytes(upload.bytes().to_vec())
                    .file_name(upload.file_name().to_string())
                    .mime_str(upload.content_type())
                    .map_err(|e| {
                        TransportError::InvalidRequest(format!(
                            "Invalid MIME type {} for {}: {e}",
                            upload.content_type(),
                            upload.file_name()
                        ))
                    })?;
                form = form.part(name.clone(), file);
            }
        }
    }

    Ok(form)
}
