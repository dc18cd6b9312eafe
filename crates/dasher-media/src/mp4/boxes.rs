//! Box type codes and header parsing.

use std::str::FromStr;

use crate::error::{Error, Result};

/// Four-character box type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxType(pub [u8; 4]);

impl BoxType {
    pub const FTYP: Self = Self(*b"ftyp");
    pub const STYP: Self = Self(*b"styp");
    pub const MOOV: Self = Self(*b"moov");
    pub const MVHD: Self = Self(*b"mvhd");
    pub const TRAK: Self = Self(*b"trak");
    pub const TKHD: Self = Self(*b"tkhd");
    pub const EDTS: Self = Self(*b"edts");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MDHD: Self = Self(*b"mdhd");
    pub const HDLR: Self = Self(*b"hdlr");
    pub const MINF: Self = Self(*b"minf");
    pub const DINF: Self = Self(*b"dinf");
    pub const STBL: Self = Self(*b"stbl");
    pub const STSD: Self = Self(*b"stsd");
    pub const MVEX: Self = Self(*b"mvex");
    pub const MOOF: Self = Self(*b"moof");
    pub const TRAF: Self = Self(*b"traf");
    pub const MFRA: Self = Self(*b"mfra");
    pub const UDTA: Self = Self(*b"udta");
    pub const SINF: Self = Self(*b"sinf");
    pub const SCHI: Self = Self(*b"schi");
    pub const PSSH: Self = Self(*b"pssh");
    pub const SENC: Self = Self(*b"senc");
    pub const MDAT: Self = Self(*b"mdat");
    pub const FREE: Self = Self(*b"free");

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// Check if boxes of this type hold child boxes rather than raw payload.
    pub fn is_container(&self) -> bool {
        matches!(
            *self,
            Self::MOOV
                | Self::TRAK
                | Self::EDTS
                | Self::MDIA
                | Self::MINF
                | Self::DINF
                | Self::STBL
                | Self::MVEX
                | Self::MOOF
                | Self::TRAF
                | Self::MFRA
                | Self::UDTA
                | Self::SINF
                | Self::SCHI
        )
    }
}

impl std::fmt::Display for BoxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BoxType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| Error::invalid_path(s, "box type must be four bytes"))?;
        if !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(Error::invalid_path(s, "box type must be printable ASCII"));
        }
        Ok(Self(bytes))
    }
}

/// How a box encodes its size on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeField {
    /// 32-bit size in the first header word.
    Compact,
    /// `size == 1` followed by a 64-bit size after the type.
    Extended,
    /// `size == 0`: the box runs to the end of the file.
    ToEnd,
}

/// Parsed box header.
#[derive(Debug, Clone, Copy)]
pub struct BoxHeader {
    pub box_type: BoxType,
    /// Offset of the first header byte.
    pub offset: u64,
    /// Total size including the header.
    pub size: u64,
    /// 8 or 16.
    pub header_size: u8,
    pub size_field: SizeField,
}

impl BoxHeader {
    /// Parse the header at `offset`, bounded by `end` (exclusive).
    pub fn parse(data: &[u8], offset: u64, end: u64) -> Result<Self> {
        let available = end.saturating_sub(offset);
        if available < 8 {
            return Err(Error::Truncated {
                box_type: "????".into(),
                offset,
                need: 8,
                have: available,
            });
        }

        let pos = offset as usize;
        let compact = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
        let box_type = BoxType([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]);

        let (size, header_size, size_field) = match compact {
            0 => (available, 8u8, SizeField::ToEnd),
            1 => {
                if available < 16 {
                    return Err(Error::Truncated {
                        box_type: box_type.to_string(),
                        offset,
                        need: 16,
                        have: available,
                    });
                }
                let mut ext = [0u8; 8];
                ext.copy_from_slice(&data[pos + 8..pos + 16]);
                (u64::from_be_bytes(ext), 16u8, SizeField::Extended)
            }
            n => (n as u64, 8u8, SizeField::Compact),
        };

        if size < header_size as u64 {
            return Err(Error::invalid_box(format!(
                "{} at offset {} declares size {} below its {}-byte header",
                box_type, offset, size, header_size
            )));
        }
        if size > available {
            return Err(Error::Truncated {
                box_type: box_type.to_string(),
                offset,
                need: size,
                have: available,
            });
        }

        Ok(Self {
            box_type,
            offset,
            size,
            header_size,
            size_field,
        })
    }

    /// Offset one past the last byte of this box.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Offset of the first payload byte.
    pub fn payload_offset(&self) -> u64 {
        self.offset + self.header_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact_header() {
        let data = [0, 0, 0, 16, b'f', b'r', b'e', b'e', 0, 0, 0, 0, 0, 0, 0, 0];
        let header = BoxHeader::parse(&data, 0, 16).unwrap();
        assert_eq!(header.box_type, BoxType::FREE);
        assert_eq!(header.size, 16);
        assert_eq!(header.header_size, 8);
        assert_eq!(header.size_field, SizeField::Compact);
    }

    #[test]
    fn test_parse_extended_header() {
        let mut data = vec![0, 0, 0, 1];
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&20u64.to_be_bytes());
        data.extend_from_slice(&[0xAA; 4]);
        let header = BoxHeader::parse(&data, 0, data.len() as u64).unwrap();
        assert_eq!(header.size, 20);
        assert_eq!(header.header_size, 16);
        assert_eq!(header.payload_offset(), 16);
    }

    #[test]
    fn test_parse_size_zero_runs_to_end() {
        let mut data = vec![0, 0, 0, 0];
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&[1, 2, 3]);
        let header = BoxHeader::parse(&data, 0, data.len() as u64).unwrap();
        assert_eq!(header.size, 11);
        assert_eq!(header.size_field, SizeField::ToEnd);
    }

    #[test]
    fn test_truncated_header() {
        let data = [0, 0, 0, 32, b'm', b'o', b'o', b'v'];
        let err = BoxHeader::parse(&data, 0, 8).unwrap_err();
        assert!(matches!(err, Error::Truncated { need: 32, have: 8, .. }));

        let err = BoxHeader::parse(&data[..5], 0, 5).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_size_below_header() {
        let data = [0, 0, 0, 4, b'f', b'r', b'e', b'e'];
        let err = BoxHeader::parse(&data, 0, 8).unwrap_err();
        assert!(matches!(err, Error::InvalidBox(_)));
    }

    #[test]
    fn test_box_type_from_str() {
        assert_eq!("pssh".parse::<BoxType>().unwrap(), BoxType::PSSH);
        assert_eq!("url ".parse::<BoxType>().unwrap(), BoxType(*b"url "));
        assert!("toolong".parse::<BoxType>().is_err());
        assert!(BoxType::TRAK.is_container());
        assert!(!BoxType::SENC.is_container());
    }
}
