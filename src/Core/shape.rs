use sha2::{Digest, Sha256};

use crate::Wire::WireFormat;

/// Describes the payload type registered with the transport.
///
/// Keyed instances are not supported, so `keyed` is always false for shapes
/// built by this crate; it still takes part in the fingerprint so a keyed
/// peer type never matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeDescriptor {
    pub type_name: String,
    pub format: WireFormat,
    pub keyed: bool,
}

impl ShapeDescriptor {
    pub fn for_format(format: WireFormat) -> Self {
        Self {
            type_name: format.type_name().to_string(),
            format,
            keyed: false,
        }
    }

    /// SHA-256 over name, layout and key flag. Two shapes match on the wire
    /// only if their fingerprints are equal.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.type_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.format.to_string().as_bytes());
        hasher.update([self.keyed as u8]);
        hasher.finalize().into()
    }
}
