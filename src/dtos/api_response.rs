use serde::Serialize;

/// Shared JSON envelope: `{ status, message, data }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            status: "success".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>, data: Option<T>) -> Self {
        ApiResponse {
            status: "error".to_string(),
            message: message.into(),
            data,
        }
    }
}
