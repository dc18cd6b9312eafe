//! DRM key material and per-system signalling.
//!
//! A [`DrmDescriptor`] is built once from configuration. The
//! [`DrmDescriptorBuilder`] derives from it everything the packaging stages
//! need: the muxer's encryption spec and one ContentProtection fragment per
//! enabled [`DrmSystem`].

mod builder;
mod keys;
mod playready;
mod pssh;
mod system;

pub use builder::{DrmDescriptorBuilder, Signalling};
pub use keys::{ContentKey, Iv, KeyId, GENERATE};
pub use playready::{key_checksum, playready_object, wrm_header};
pub use pssh::PsshBox;
pub use system::{widevine_cenc_header, DrmSystem, CENC_SCHEME, COMMON_SYSTEM_ID, NAMESPACES};

/// Key material and per-system settings for one packaging run.
#[derive(Debug, Clone)]
pub struct DrmDescriptor {
    pub kid: KeyId,
    pub key: ContentKey,
    pub iv: Iv,
    pub playready_laurl: Option<String>,
    pub clearkey_laurl: Option<String>,
    /// Enabled systems, in insertion order.
    pub systems: Vec<DrmSystem>,
    /// Keep the generic MPEG-CENC descriptor in the DRM manifest.
    pub cenc: bool,
}

impl DrmDescriptor {
    /// Descriptor with every system enabled and no license URLs.
    pub fn new(kid: KeyId, key: ContentKey, iv: Iv) -> Self {
        Self {
            kid,
            key,
            iv,
            playready_laurl: None,
            clearkey_laurl: None,
            systems: DrmSystem::ALL.to_vec(),
            cenc: false,
        }
    }

    pub fn is_enabled(&self, system: DrmSystem) -> bool {
        self.systems.contains(&system)
    }
}
