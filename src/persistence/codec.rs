//! Envelope encoding for persisted components.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DeptClassError, Result};

/// Version of the on-disk envelope layout.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    format_version: u32,
    component: String,
    saved_at: DateTime<Utc>,
    payload: T,
}

/// Wrap `payload` in an envelope tagged with `component` and encode it.
pub fn encode_component<T: Serialize>(component: &str, payload: &T) -> Result<Vec<u8>> {
    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        component: component.to_string(),
        saved_at: Utc::now(),
        payload,
    };

    bincode::serde::encode_to_vec(&envelope, bincode::config::standard()).map_err(|e| {
        DeptClassError::persistence(format!("failed to encode {component}: {e}"))
    })
}

/// Decode an envelope, checking its version and component tag.
pub fn decode_component<T: DeserializeOwned>(component: &str, bytes: &[u8]) -> Result<T> {
    let (envelope, _): (Envelope<T>, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard()).map_err(|e| {
            DeptClassError::persistence(format!("failed to decode {component}: {e}"))
        })?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(DeptClassError::persistence(format!(
            "{component}: unsupported format version {} (expected {FORMAT_VERSION})",
            envelope.format_version
        )));
    }
    if envelope.component != component {
        return Err(DeptClassError::persistence(format!(
            "resource holds '{}', expected '{component}'",
            envelope.component
        )));
    }

    log::debug!(
        "decoded {component} saved at {}",
        envelope.saved_at.to_rfc3339()
    );
    Ok(envelope.payload)
}
