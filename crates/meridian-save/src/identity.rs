// SPDX-License-Identifier: Apache-2.0
//! Identity chunk: TLV binding a save to its instance, run, and content.

use meridian_core::{fnv1a64, SessionIdentity, TlvReader, TlvWriter};

/// Identity TLV schema version.
pub const IDENTITY_SCHEMA_VERSION: u32 = 1;

const TAG_SCHEMA_VERSION: u32 = 1;
const TAG_INSTANCE_ID: u32 = 2;
const TAG_RUN_ID: u32 = 3;
const TAG_MANIFEST_HASH: u32 = 4;
const TAG_CONTENT_HASH: u32 = 5;

/// Parsed identity chunk contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityBlock {
    /// Instance label the save belongs to.
    pub instance_label: String,
    /// Run counter within the instance.
    pub run_id: u64,
    /// Manifest hash bytes in effect when the run started.
    pub manifest_hash: Vec<u8>,
    /// FNV-1a64 of the header's content TLV payload.
    pub content_hash: u64,
}

impl IdentityBlock {
    /// Converts into the kernel's identity type.
    #[must_use]
    pub fn into_session_identity(self) -> SessionIdentity {
        SessionIdentity {
            instance_label: self.instance_label,
            run_id: self.run_id,
            manifest_hash: self.manifest_hash,
        }
    }
}

/// Builds the identity chunk payload.
#[must_use]
pub fn build_identity_tlv(identity: &SessionIdentity, content_tlv: &[u8]) -> Vec<u8> {
    let mut writer = TlvWriter::new();
    writer.add_u32(TAG_SCHEMA_VERSION, IDENTITY_SCHEMA_VERSION);
    writer.add_string(TAG_INSTANCE_ID, &identity.instance_label);
    writer.add_u64(TAG_RUN_ID, identity.run_id);
    writer.add_bytes(TAG_MANIFEST_HASH, &identity.manifest_hash);
    writer.add_u64(TAG_CONTENT_HASH, fnv1a64(content_tlv));
    writer.into_bytes()
}

/// Parses an identity chunk payload. `None` on truncation, missing content
/// hash, or schema mismatch.
#[must_use]
pub fn parse_identity_tlv(payload: &[u8]) -> Option<IdentityBlock> {
    let mut reader = TlvReader::new(payload);
    let mut schema_version = 0u32;
    let mut instance_label = String::new();
    let mut run_id = 0u64;
    let mut manifest_hash = Vec::new();
    let mut content_hash = None;

    while let Ok(Some(record)) = reader.next_record() {
        match record.tag {
            TAG_SCHEMA_VERSION => schema_version = record.as_u32().ok()?,
            TAG_INSTANCE_ID => {
                instance_label = String::from_utf8(record.payload.to_vec()).ok()?;
            }
            TAG_RUN_ID => run_id = record.as_u64().ok()?,
            TAG_MANIFEST_HASH => manifest_hash = record.payload.to_vec(),
            TAG_CONTENT_HASH => content_hash = Some(record.as_u64().ok()?),
            _ => {}
        }
    }
    if schema_version != IDENTITY_SCHEMA_VERSION {
        return None;
    }
    Some(IdentityBlock {
        instance_label,
        run_id,
        manifest_hash,
        content_hash: content_hash?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips() {
        let identity = SessionIdentity::new("colony-7", 4, b"manifest-bytes");
        let payload = build_identity_tlv(&identity, b"content");
        let parsed = parse_identity_tlv(&payload).unwrap();
        assert_eq!(parsed.instance_label, "colony-7");
        assert_eq!(parsed.run_id, 4);
        assert_eq!(parsed.content_hash, fnv1a64(b"content"));
        assert_eq!(parsed.into_session_identity(), identity);
    }

    #[test]
    fn missing_content_hash_is_rejected() {
        let mut writer = TlvWriter::new();
        writer.add_u32(TAG_SCHEMA_VERSION, IDENTITY_SCHEMA_VERSION);
        writer.add_string(TAG_INSTANCE_ID, "x");
        assert!(parse_identity_tlv(writer.bytes()).is_none());
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let identity = SessionIdentity::new("x", 1, b"");
        let mut payload = build_identity_tlv(&identity, b"");
        // Corrupt the schema version value (first record payload).
        payload[8] = 9;
        assert!(parse_identity_tlv(&payload).is_none());
    }
}
