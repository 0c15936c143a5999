//! API handlers module

pub mod authors;
pub mod citations;
pub mod files;
pub mod health;
pub mod import;
pub mod papers;
pub mod related;
pub mod search;
pub mod tags;
pub mod venues;

use axum::extract::Multipart;
use paperdesk_common::errors::{AppError, Result};

/// Pull the `file` part (name + bytes) out of a multipart body
pub(crate) async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidFormat {
            message: format!("malformed multipart body: {}", e),
        })?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidFormat {
                    message: format!("failed to read upload: {}", e),
                })?
                .to_vec();
            return Ok((file_name, bytes));
        }
    }

    Err(AppError::MissingField {
        field: "file".to_string(),
    })
}
