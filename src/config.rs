//! Bus configuration parameters
//!
//! Addressing and framing limits shared by the registry (which rejects
//! endpoints that cannot be addressed or do not fit a frame) and the bus
//! adapter (which packs node and endpoint ids into arbitration ids).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest payload any supported bus can carry in one frame (CAN FD).
pub const MAX_PAYLOAD_CAPACITY: usize = 64;

/// Classic CAN data field length.
pub const CLASSIC_CAN_PAYLOAD: usize = 8;

/// Core bus configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    // --- Addressing ---
    /// This device's node address on the bus
    pub node_id: u8,
    /// 29-bit extended arbitration ids instead of 11-bit standard ids
    pub extended_ids: bool,
    /// Low arbitration-id bits that carry the endpoint id
    pub endpoint_bits: u8,

    // --- Framing ---
    /// Maximum data bytes in a single frame
    pub max_payload: usize,

    // --- Registration ---
    /// First id handed out by auto-assigning registration
    pub first_endpoint_id: u16,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            // Addressing
            node_id: 1,
            extended_ids: false,
            endpoint_bits: 6, // 64 endpoints, 32 nodes on an 11-bit id

            // Framing
            max_payload: CLASSIC_CAN_PAYLOAD,

            // Registration
            first_endpoint_id: 1,
        }
    }
}

impl BusConfig {
    /// Width of the arbitration id in bits.
    pub const fn id_bits(&self) -> u8 {
        if self.extended_ids { 29 } else { 11 }
    }

    /// Number of addressable endpoint ids.
    pub const fn endpoint_capacity(&self) -> u64 {
        self.max_endpoint_id() as u64 + 1
    }

    /// Largest endpoint id that fits the endpoint field. Saturates for
    /// field widths a validated config never has.
    pub const fn max_endpoint_id(&self) -> u32 {
        match 1u32.checked_shl(self.endpoint_bits as u32) {
            Some(capacity) => capacity - 1,
            None => u32::MAX,
        }
    }

    /// Check every field against the others. Call before building a table.
    pub fn validate(&self) -> Result<()> {
        if self.max_payload == 0 || self.max_payload > MAX_PAYLOAD_CAPACITY {
            return Err(Error::Config("max_payload must be 1..=64"));
        }
        if self.endpoint_bits == 0 || self.endpoint_bits >= self.id_bits() {
            return Err(Error::Config("endpoint_bits leaves no room for node_id"));
        }
        if self.endpoint_bits > 16 {
            return Err(Error::Config("endpoint_bits wider than an endpoint id"));
        }
        let node_bits = u32::from(self.id_bits() - self.endpoint_bits);
        if node_bits < 8 && u32::from(self.node_id) >= (1 << node_bits) {
            return Err(Error::Config("node_id does not fit the arbitration id"));
        }
        if u32::from(self.first_endpoint_id) > self.max_endpoint_id() {
            return Err(Error::Config("first_endpoint_id outside endpoint id space"));
        }
        Ok(())
    }

    /// Serialize for persistent storage (postcard).
    pub fn encode(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("encode failed"))
    }

    /// Restore from storage and validate. Corrupt blobs are rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| Error::Config("corrupted"))?;
        config.validate()?;
        Ok(config)
    }
}
