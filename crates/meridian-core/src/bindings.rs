// SPDX-License-Identifier: Apache-2.0
//! Media and weather provider bindings per body.
//!
//! Bindings are opaque to the kernel: they carry provider identities and
//! parameter blobs that outer layers interpret. They persist as TLV inside
//! their save chunks and fold into the world hash, so their storage order
//! is canonical (sorted by body id).

use thiserror::Error;

use crate::station::BodyId;
use crate::tlv::TlvWriter;

/// Binding TLV schema version (shared by both chunk payloads).
pub const BINDINGS_SCHEMA_VERSION: u32 = 1;

/// Media binding record container tag.
pub const MEDIA_TAG_BINDING: u32 = 0x0100;
/// Media binding body-id tag.
pub const MEDIA_TAG_BODY_ID: u32 = 0x0101;
/// Media binding kind tag.
pub const MEDIA_TAG_KIND: u32 = 0x0102;
/// Media binding provider-id tag.
pub const MEDIA_TAG_PROVIDER_ID: u32 = 0x0103;
/// Media binding params tag.
pub const MEDIA_TAG_PARAMS: u32 = 0x0104;

/// Weather binding record container tag.
pub const WEATHER_TAG_BINDING: u32 = 0x0200;
/// Weather binding body-id tag.
pub const WEATHER_TAG_BODY_ID: u32 = 0x0201;
/// Weather binding provider-id tag.
pub const WEATHER_TAG_PROVIDER_ID: u32 = 0x0202;
/// Weather binding params tag.
pub const WEATHER_TAG_PARAMS: u32 = 0x0203;

/// Schema-version tag inside both chunk payloads.
pub const BINDINGS_TAG_SCHEMA_VERSION: u32 = 0x01;

/// Errors surfaced by the binding sets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    /// Zero body id or empty provider.
    #[error("invalid argument")]
    InvalidArgument,
    /// A binding for this body already exists.
    #[error("duplicate binding")]
    DuplicateId,
}

/// A media provider bound to a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBinding {
    /// Body bound, nonzero.
    pub body_id: BodyId,
    /// Media kind discriminant.
    pub kind: u32,
    /// Provider identity bytes.
    pub provider_id: Vec<u8>,
    /// Provider parameter blob.
    pub params: Vec<u8>,
}

/// A weather provider bound to a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherBinding {
    /// Body bound, nonzero.
    pub body_id: BodyId,
    /// Provider identity bytes.
    pub provider_id: Vec<u8>,
    /// Provider parameter blob.
    pub params: Vec<u8>,
}

/// Body-sorted binding sets.
#[derive(Debug, Default)]
pub struct BindingSets {
    media: Vec<MediaBinding>,
    weather: Vec<WeatherBinding>,
}

impl BindingSets {
    /// Creates empty sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a media provider to a body.
    pub fn bind_media(&mut self, binding: MediaBinding) -> Result<(), BindingError> {
        if binding.body_id == 0 || binding.provider_id.is_empty() {
            return Err(BindingError::InvalidArgument);
        }
        match self.media.binary_search_by_key(&binding.body_id, |b| b.body_id) {
            Ok(_) => Err(BindingError::DuplicateId),
            Err(idx) => {
                self.media.insert(idx, binding);
                Ok(())
            }
        }
    }

    /// Binds a weather provider to a body.
    pub fn bind_weather(&mut self, binding: WeatherBinding) -> Result<(), BindingError> {
        if binding.body_id == 0 || binding.provider_id.is_empty() {
            return Err(BindingError::InvalidArgument);
        }
        match self
            .weather
            .binary_search_by_key(&binding.body_id, |b| b.body_id)
        {
            Ok(_) => Err(BindingError::DuplicateId),
            Err(idx) => {
                self.weather.insert(idx, binding);
                Ok(())
            }
        }
    }

    /// Media bindings in ascending body order.
    #[must_use]
    pub fn media(&self) -> &[MediaBinding] {
        &self.media
    }

    /// Weather bindings in ascending body order.
    #[must_use]
    pub fn weather(&self) -> &[WeatherBinding] {
        &self.weather
    }

    /// Resets both sets (save-load entry point).
    pub fn reset(&mut self) {
        self.media.clear();
        self.weather.clear();
    }

    /// Canonical MEDI chunk payload.
    #[must_use]
    pub fn encode_media_blob(&self) -> Vec<u8> {
        let mut writer = TlvWriter::new();
        writer.add_u32(BINDINGS_TAG_SCHEMA_VERSION, BINDINGS_SCHEMA_VERSION);
        for binding in &self.media {
            let mut entry = TlvWriter::new();
            entry.add_u64(MEDIA_TAG_BODY_ID, binding.body_id);
            entry.add_u32(MEDIA_TAG_KIND, binding.kind);
            entry.add_bytes(MEDIA_TAG_PROVIDER_ID, &binding.provider_id);
            entry.add_bytes(MEDIA_TAG_PARAMS, &binding.params);
            writer.add_bytes(MEDIA_TAG_BINDING, entry.bytes());
        }
        writer.into_bytes()
    }

    /// Canonical WEAT chunk payload.
    #[must_use]
    pub fn encode_weather_blob(&self) -> Vec<u8> {
        let mut writer = TlvWriter::new();
        writer.add_u32(BINDINGS_TAG_SCHEMA_VERSION, BINDINGS_SCHEMA_VERSION);
        for binding in &self.weather {
            let mut entry = TlvWriter::new();
            entry.add_u64(WEATHER_TAG_BODY_ID, binding.body_id);
            entry.add_bytes(WEATHER_TAG_PROVIDER_ID, &binding.provider_id);
            entry.add_bytes(WEATHER_TAG_PARAMS, &binding.params);
            writer.add_bytes(WEATHER_TAG_BINDING, entry.bytes());
        }
        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_sort_by_body_and_reject_duplicates() {
        let mut sets = BindingSets::new();
        sets.bind_media(MediaBinding {
            body_id: 9,
            kind: 1,
            provider_id: b"p9".to_vec(),
            params: Vec::new(),
        })
        .unwrap();
        sets.bind_media(MediaBinding {
            body_id: 3,
            kind: 1,
            provider_id: b"p3".to_vec(),
            params: Vec::new(),
        })
        .unwrap();
        assert_eq!(
            sets.bind_media(MediaBinding {
                body_id: 9,
                kind: 2,
                provider_id: b"x".to_vec(),
                params: Vec::new(),
            })
            .unwrap_err(),
            BindingError::DuplicateId
        );
        let bodies: Vec<u64> = sets.media().iter().map(|b| b.body_id).collect();
        assert_eq!(bodies, vec![3, 9]);
    }

    #[test]
    fn empty_provider_rejected() {
        let mut sets = BindingSets::new();
        assert_eq!(
            sets.bind_weather(WeatherBinding {
                body_id: 1,
                provider_id: Vec::new(),
                params: Vec::new(),
            })
            .unwrap_err(),
            BindingError::InvalidArgument
        );
    }
}
