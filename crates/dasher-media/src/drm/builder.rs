//! Encryption spec and ContentProtection fragment generation.

use super::{DrmDescriptor, DrmSystem};
use crate::error::Result;
use crate::mpd::{element, Element};

/// A ContentProtection fragment for one DRM system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signalling {
    pub system: DrmSystem,
    pub element: Element,
}

impl Signalling {
    /// The fragment as XML text.
    pub fn to_xml(&self) -> Result<String> {
        self.element.to_xml()
    }
}

/// Derives muxer input and manifest signalling from a [`DrmDescriptor`].
///
/// Every operation is pure: calling them in any order, any number of times,
/// yields the same output for the same descriptor.
pub struct DrmDescriptorBuilder<'a> {
    descriptor: &'a DrmDescriptor,
}

impl<'a> DrmDescriptorBuilder<'a> {
    pub fn new(descriptor: &'a DrmDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &DrmDescriptor {
        self.descriptor
    }

    /// Signalling for `system`, or `None` when it is disabled.
    pub fn build_signalling(&self, system: DrmSystem) -> Option<Signalling> {
        if !self.descriptor.is_enabled(system) {
            return None;
        }
        Some(Signalling {
            system,
            element: system.build_signalling(self.descriptor),
        })
    }

    pub fn build_playready_signalling(&self) -> Option<Signalling> {
        self.build_signalling(DrmSystem::PlayReady)
    }

    pub fn build_widevine_signalling(&self) -> Option<Signalling> {
        self.build_signalling(DrmSystem::Widevine)
    }

    pub fn build_marlin_signalling(&self) -> Option<Signalling> {
        self.build_signalling(DrmSystem::Marlin)
    }

    pub fn build_clearkey_signalling(&self) -> Option<Signalling> {
        self.build_signalling(DrmSystem::ClearKey)
    }

    /// Fragments for the main DRM manifest: PlayReady, Widevine, Marlin.
    pub fn protection_signalling(&self) -> Vec<Signalling> {
        [DrmSystem::PlayReady, DrmSystem::Widevine, DrmSystem::Marlin]
            .into_iter()
            .filter_map(|system| self.build_signalling(system))
            .collect()
    }

    /// GPAC `GPACDRM` document for the muxer's encryption pass.
    ///
    /// One `CrypTrack` is written per track id; every track shares the key.
    pub fn build_encryption_spec(&self, track_ids: &[u32]) -> Result<String> {
        let desc = self.descriptor;
        let mut root = Element::new("GPACDRM").with_attr("type", "CENC AES-CTR");

        for system in [DrmSystem::PlayReady, DrmSystem::Widevine, DrmSystem::ClearKey] {
            if !desc.is_enabled(system) {
                continue;
            }
            let Some(pssh) = system.pssh(desc) else {
                continue;
            };

            let mut info = Element::new("DRMInfo")
                .with_attr("type", "pssh")
                .with_attr("version", pssh.version().to_string())
                .with_child(bs_id128(pssh.system_id.as_bytes()));
            if pssh.version() == 1 {
                info = info.with_child(bs_u32(pssh.key_ids.len() as u32));
                for kid in &pssh.key_ids {
                    info = info.with_child(bs_id128(kid.as_bytes()));
                }
            }
            info = info.with_child(bs_u32(pssh.data.len() as u32));
            if !pssh.data.is_empty() {
                use base64::{engine::general_purpose::STANDARD, Engine};
                info = info.with_child(Element::new("BS").with_attr("data64", STANDARD.encode(&pssh.data)));
            }
            root = root.with_child(info);
        }

        for track_id in track_ids {
            let track = Element::new("CrypTrack")
                .with_attr("trackID", track_id.to_string())
                .with_attr("IsEncrypted", "1")
                .with_attr("IV_size", desc.iv.len().to_string())
                .with_attr("first_IV", format!("0x{}", desc.iv.to_hex()))
                .with_attr("saiSavedBox", "senc")
                .with_child(
                    Element::new("key")
                        .with_attr("KID", format!("0x{}", desc.kid.to_hex()))
                        .with_attr("value", format!("0x{}", desc.key.to_hex())),
                );
            root = root.with_child(track);
        }

        element::serialize(&root, true)
    }
}

fn bs_id128(bytes: &[u8]) -> Element {
    Element::new("BS").with_attr("ID128", hex::encode(bytes))
}

fn bs_u32(value: u32) -> Element {
    Element::new("BS")
        .with_attr("bits", "32")
        .with_attr("value", value.to_string())
}
