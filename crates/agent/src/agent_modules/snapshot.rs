use serde::Serialize;
use tracing::error;

/// JSON body for a sample. Encoding failures are logged and produce an empty payload.
pub fn to_json_payload<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialize snapshot.");
        Vec::new()
    })
}
