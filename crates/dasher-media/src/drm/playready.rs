//! PlayReady header (WRMHEADER) and PlayReady Object generation.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::keys::{ContentKey, KeyId};

/// PlayReady Object record type holding a rights management header.
const RECORD_RIGHTS_MANAGEMENT: u16 = 1;

/// Key checksum: first 8 bytes of AES-128-ECB(key, kid in GUID order).
pub fn key_checksum(kid: &KeyId, key: &ContentKey) -> [u8; 8] {
    let cipher = Aes128::new(GenericArray::from_slice(key.as_bytes()));
    let mut block = GenericArray::clone_from_slice(&kid.to_guid_bytes());
    cipher.encrypt_block(&mut block);

    let mut checksum = [0u8; 8];
    checksum.copy_from_slice(&block[..8]);
    checksum
}

/// WRMHEADER version 4.0.0.0 for a single AES-CTR key.
pub fn wrm_header(kid: &KeyId, key: &ContentKey, la_url: Option<&str>) -> String {
    let mut xml = String::from(
        "<WRMHEADER xmlns=\"http://schemas.microsoft.com/DRM/2007/03/PlayReadyHeader\" version=\"4.0.0.0\">",
    );
    xml.push_str("<DATA><PROTECTINFO><KEYLEN>16</KEYLEN><ALGID>AESCTR</ALGID></PROTECTINFO>");
    xml.push_str("<KID>");
    xml.push_str(&BASE64.encode(kid.to_guid_bytes()));
    xml.push_str("</KID><CHECKSUM>");
    xml.push_str(&BASE64.encode(key_checksum(kid, key)));
    xml.push_str("</CHECKSUM>");
    if let Some(url) = la_url.filter(|u| !u.is_empty()) {
        xml.push_str("<LA_URL>");
        xml.push_str(&quick_xml::escape::escape(url));
        xml.push_str("</LA_URL>");
    }
    xml.push_str("</DATA></WRMHEADER>");
    xml
}

/// PlayReady Object: little-endian length, record count and one UTF-16LE
/// rights management header record.
pub fn playready_object(header: &str) -> Vec<u8> {
    let record: Vec<u8> = header.encode_utf16().flat_map(|c| c.to_le_bytes()).collect();
    let total = 4 + 2 + 2 + 2 + record.len();

    let mut pro = Vec::with_capacity(total);
    pro.extend_from_slice(&(total as u32).to_le_bytes());
    pro.extend_from_slice(&1u16.to_le_bytes());
    pro.extend_from_slice(&RECORD_RIGHTS_MANAGEMENT.to_le_bytes());
    pro.extend_from_slice(&(record.len() as u16).to_le_bytes());
    pro.extend_from_slice(&record);
    pro
}
