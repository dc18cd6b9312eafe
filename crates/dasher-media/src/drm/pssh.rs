//! Protection System Specific Header (`pssh`) box writer.

use bytes::{BufMut, BytesMut};
use uuid::Uuid;

use super::keys::KeyId;

/// A `pssh` box ready to be embedded in a manifest or init segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsshBox {
    pub system_id: Uuid,
    /// Listed key ids. Non-empty selects box version 1.
    pub key_ids: Vec<KeyId>,
    pub data: Vec<u8>,
}

impl PsshBox {
    /// Version 0 box carrying opaque system data.
    pub fn new(system_id: Uuid, data: Vec<u8>) -> Self {
        Self {
            system_id,
            key_ids: Vec::new(),
            data,
        }
    }

    /// Version 1 box listing key ids.
    pub fn with_key_ids(system_id: Uuid, key_ids: Vec<KeyId>, data: Vec<u8>) -> Self {
        Self {
            system_id,
            key_ids,
            data,
        }
    }

    pub fn version(&self) -> u8 {
        if self.key_ids.is_empty() {
            0
        } else {
            1
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(32 + self.key_ids.len() * 16 + self.data.len());

        buf.put_u32(0); // placeholder
        buf.put_slice(b"pssh");
        buf.put_u8(self.version());
        buf.put_slice(&[0, 0, 0]); // flags
        buf.put_slice(self.system_id.as_bytes());
        if self.version() == 1 {
            buf.put_u32(self.key_ids.len() as u32);
            for kid in &self.key_ids {
                buf.put_slice(kid.as_bytes());
            }
        }
        buf.put_u32(self.data.len() as u32);
        buf.put_slice(&self.data);

        let size = buf.len() as u32;
        buf[0..4].copy_from_slice(&size.to_be_bytes());
        buf.to_vec()
    }

    /// Base64 of the whole box, as carried by `cenc:pssh`.
    pub fn to_base64(&self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD.encode(self.to_bytes())
    }
}
