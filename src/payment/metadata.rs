//! Versioned order-reconstruction metadata attached to the hosted checkout
//! session.
//!
//! The provider stores metadata as a flat string map with a per-value size
//! ceiling, and returns it verbatim on the completion notification. It is
//! the only channel through which the order finalizer can rebuild the
//! order. The payload is a single versioned JSON document chunked across
//! numbered keys, so delimiter characters in user-entered data (addresses
//! containing `|` or `,`) can never corrupt reconstruction.

use crate::properties::PropertySet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Current metadata schema version.
pub const METADATA_VERSION: u32 = 1;

/// Key holding the number of payload chunks.
const PARTS_KEY: &str = "order_parts";
/// Prefix of the numbered chunk keys (`order_0`, `order_1`, ...).
const PART_KEY_PREFIX: &str = "order_";

/// Provider-imposed per-value ceiling is 500 characters; stay under it.
pub const MAX_PART_LEN: usize = 450;
/// Ceiling on chunk count; bounds the maximum encodable cart size.
pub const MAX_PARTS: usize = 16;

/// One order line inside the metadata payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "PropertySet::is_empty")]
    pub properties: PropertySet,
}

/// Shipping and contact details captured at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub city: String,
    pub country: String,
    pub postal_code: String,
}

/// The full order-reconstruction payload, version-tagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderMetadata {
    pub version: u32,
    pub lines: Vec<MetadataLine>,
    pub customer: CustomerDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("order metadata too large: {bytes} bytes exceeds {max}")]
    TooLarge { bytes: usize, max: usize },
    #[error("order metadata missing part count")]
    MissingPartCount,
    #[error("order metadata missing part {0}")]
    MissingPart(usize),
    #[error("unsupported order metadata version {0}")]
    UnsupportedVersion(u32),
    #[error("malformed order metadata: {0}")]
    Malformed(String),
}

/// Encodes the payload into the provider's flat string map, chunked under
/// the per-value ceiling. Oversize carts fail here, synchronously, before
/// any session is created.
pub fn encode(metadata: &OrderMetadata) -> Result<BTreeMap<String, String>, MetadataError> {
    let json =
        serde_json::to_string(metadata).map_err(|e| MetadataError::Malformed(e.to_string()))?;

    if json.len() > MAX_PART_LEN * MAX_PARTS {
        return Err(MetadataError::TooLarge {
            bytes: json.len(),
            max: MAX_PART_LEN * MAX_PARTS,
        });
    }

    let mut map = BTreeMap::new();
    let mut part = String::new();
    let mut index = 0usize;
    for ch in json.chars() {
        if part.len() + ch.len_utf8() > MAX_PART_LEN {
            map.insert(format!("{}{}", PART_KEY_PREFIX, index), part);
            part = String::new();
            index += 1;
        }
        part.push(ch);
    }
    map.insert(format!("{}{}", PART_KEY_PREFIX, index), part);
    map.insert(PARTS_KEY.to_string(), (index + 1).to_string());

    Ok(map)
}

/// Decodes the payload from the metadata map the provider returned.
pub fn decode(map: &HashMap<String, String>) -> Result<OrderMetadata, MetadataError> {
    let parts: usize = map
        .get(PARTS_KEY)
        .ok_or(MetadataError::MissingPartCount)?
        .parse()
        .map_err(|_| MetadataError::MissingPartCount)?;

    let mut json = String::new();
    for index in 0..parts {
        let part = map
            .get(&format!("{}{}", PART_KEY_PREFIX, index))
            .ok_or(MetadataError::MissingPart(index))?;
        json.push_str(part);
    }

    let metadata: OrderMetadata =
        serde_json::from_str(&json).map_err(|e| MetadataError::Malformed(e.to_string()))?;

    if metadata.version != METADATA_VERSION {
        return Err(MetadataError::UnsupportedVersion(metadata.version));
    }

    Ok(metadata)
}
