//! DRM systems and their ContentProtection signalling.

use std::fmt;
use std::str::FromStr;

use uuid::{uuid, Uuid};

use super::keys::KeyId;
use super::playready;
use super::pssh::PsshBox;
use super::DrmDescriptor;
use crate::error::{Error, Result};
use crate::mpd::Element;

/// Scheme of the generic MPEG common-encryption descriptor.
pub const CENC_SCHEME: &str = "urn:mpeg:dash:mp4protection:2011";

/// W3C common PSSH system id used by ClearKey players.
pub const COMMON_SYSTEM_ID: Uuid = uuid!("1077efec-c0b2-4d02-ace3-3c1e52e2fb4b");

/// XML namespaces used inside ContentProtection elements.
pub const NAMESPACES: &[(&str, &str)] = &[
    ("xmlns:cenc", "urn:mpeg:cenc:2013"),
    ("xmlns:mspr", "urn:microsoft:playready"),
    ("xmlns:mas", "urn:marlin:mas:1-0:services:schemas:mpd"),
    ("xmlns:dashif", "https://dashif.org/CPS"),
    ("xmlns:clearkey", "http://dashif.org/guidelines/clearKey"),
];

/// A DRM system that can be signalled in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrmSystem {
    PlayReady,
    Widevine,
    Marlin,
    ClearKey,
}

impl DrmSystem {
    /// Every system, in manifest insertion order.
    pub const ALL: [DrmSystem; 4] = [Self::PlayReady, Self::Widevine, Self::Marlin, Self::ClearKey];

    /// Configuration name (`drm.<name>`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayReady => "playready",
            Self::Widevine => "widevine",
            Self::Marlin => "marlin",
            Self::ClearKey => "clearkey",
        }
    }

    pub fn system_id(&self) -> Uuid {
        match self {
            Self::PlayReady => uuid!("9a04f079-9840-4286-ab92-e65be0885f95"),
            Self::Widevine => uuid!("edef8ba9-79d6-4ace-a3c8-27dcd51d21ed"),
            Self::Marlin => uuid!("5e629af5-38da-4063-8977-97ffbd9902d4"),
            Self::ClearKey => uuid!("e2719d58-a985-b3c9-781a-b030af78d30e"),
        }
    }

    /// `schemeIdUri` of the ContentProtection element.
    pub fn scheme_id_uri(&self) -> String {
        match self {
            // Marlin is signalled upper-case.
            Self::Marlin => format!("urn:uuid:{}", self.system_id().hyphenated().to_string().to_uppercase()),
            _ => format!("urn:uuid:{}", self.system_id().hyphenated()),
        }
    }

    /// System ids whose presence in a scheme marks this system.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids = vec![self.system_id().hyphenated().to_string()];
        if *self == Self::ClearKey {
            ids.push(COMMON_SYSTEM_ID.hyphenated().to_string());
        }
        ids
    }

    /// PSSH box for this system, if it uses one.
    pub fn pssh(&self, descriptor: &DrmDescriptor) -> Option<PsshBox> {
        let kid = &descriptor.kid;
        match self {
            Self::PlayReady => {
                let header = playready::wrm_header(kid, &descriptor.key, descriptor.playready_laurl.as_deref());
                Some(PsshBox::new(self.system_id(), playready::playready_object(&header)))
            }
            Self::Widevine => Some(PsshBox::new(self.system_id(), widevine_cenc_header(kid))),
            Self::ClearKey => Some(PsshBox::with_key_ids(COMMON_SYSTEM_ID, vec![*kid], Vec::new())),
            Self::Marlin => None,
        }
    }

    /// Build the ContentProtection element for this system.
    pub fn build_signalling(&self, descriptor: &DrmDescriptor) -> Element {
        let kid = &descriptor.kid;
        let element = Element::new("ContentProtection").with_attr("schemeIdUri", self.scheme_id_uri());

        match self {
            Self::PlayReady => {
                let header = playready::wrm_header(kid, &descriptor.key, descriptor.playready_laurl.as_deref());
                let pro = playready::playready_object(&header);
                let pssh = PsshBox::new(self.system_id(), pro.clone());
                element
                    .with_attr("value", "MSPR 2.0")
                    .with_attr("cenc:default_KID", kid.to_uuid_string())
                    .with_child(Element::new("cenc:pssh").with_text(pssh.to_base64()))
                    .with_child(Element::new("mspr:pro").with_text(base64_encode(&pro)))
            }
            Self::Widevine => {
                let pssh = PsshBox::new(self.system_id(), widevine_cenc_header(kid));
                element
                    .with_attr("value", "Widevine")
                    .with_child(Element::new("cenc:pssh").with_text(pssh.to_base64()))
            }
            Self::Marlin => element.with_child(
                Element::new("mas:MarlinContentIds").with_child(
                    Element::new("mas:MarlinContentId").with_text(format!("urn:marlin:kid:{}", kid.to_hex())),
                ),
            ),
            Self::ClearKey => {
                let pssh = PsshBox::with_key_ids(COMMON_SYSTEM_ID, vec![*kid], Vec::new());
                let mut element = element
                    .with_attr("value", "ClearKey1.0")
                    .with_attr("cenc:default_KID", kid.to_uuid_string())
                    .with_child(Element::new("cenc:pssh").with_text(pssh.to_base64()));
                if let Some(url) = descriptor.clearkey_laurl.as_deref().filter(|u| !u.is_empty()) {
                    element = element
                        .with_child(
                            Element::new("dashif:laurl").with_text(url),
                        )
                        .with_child(
                            Element::new("clearkey:Laurl")
                                .with_attr("Lic_type", "EME-1.0")
                                .with_text(url),
                        );
                }
                element
            }
        }
    }
}

impl fmt::Display for DrmSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DrmSystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|sys| sys.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_key(format!("unknown DRM system '{}'", s)))
    }
}

/// Protobuf `WidevineCencHeader { algorithm: AESCTR, key_id }`.
pub fn widevine_cenc_header(kid: &KeyId) -> Vec<u8> {
    let mut data = Vec::with_capacity(20);
    data.extend_from_slice(&[0x08, 0x01]); // field 1 varint: AESCTR
    data.extend_from_slice(&[0x12, 0x10]); // field 2 bytes, 16 long
    data.extend_from_slice(kid.as_bytes());
    data
}

fn base64_encode(data: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};
    STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_uris() {
        assert_eq!(
            DrmSystem::PlayReady.scheme_id_uri(),
            "urn:uuid:9a04f079-9840-4286-ab92-e65be0885f95"
        );
        assert_eq!(
            DrmSystem::Marlin.scheme_id_uri(),
            "urn:uuid:5E629AF5-38DA-4063-8977-97FFBD9902D4"
        );
        assert_eq!(
            DrmSystem::ClearKey.scheme_id_uri(),
            "urn:uuid:e2719d58-a985-b3c9-781a-b030af78d30e"
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!("PlayReady".parse::<DrmSystem>().unwrap(), DrmSystem::PlayReady);
        assert_eq!("clearkey".parse::<DrmSystem>().unwrap(), DrmSystem::ClearKey);
        assert!("fairplay".parse::<DrmSystem>().is_err());
    }

    #[test]
    fn test_widevine_header() {
        let kid = KeyId::from_bytes([0xAB; 16]);
        let data = widevine_cenc_header(&kid);
        assert_eq!(data.len(), 20);
        assert_eq!(&data[..4], &[0x08, 0x01, 0x12, 0x10]);
        assert_eq!(&data[4..], &[0xAB; 16]);
    }
}
