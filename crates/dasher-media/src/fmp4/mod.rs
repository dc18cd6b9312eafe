//! Fragmented MP4 writers for timed-text (`stpp`) tracks.
//!
//! - Init segment: ftyp + moov with a `subt` handler and an `stpp` sample entry
//! - Media segment: styp + moof + mdat carrying one TTML document

mod fragment;

pub use fragment::SubtitleFragmentBuilder;

use bytes::{BufMut, BytesMut};

/// Namespace written into the `stpp` sample entry.
pub const TTML_NAMESPACE: &str = "http://www.w3.org/ns/ttml";

/// Start a box whose size is patched by [`end_box`].
pub(crate) fn begin_box(buf: &mut BytesMut, kind: &[u8; 4]) -> usize {
    let start = buf.len();
    buf.put_u32(0); // placeholder
    buf.put_slice(kind);
    start
}

/// Patch the size of a box opened with [`begin_box`].
pub(crate) fn end_box(buf: &mut BytesMut, start: usize) {
    let size = (buf.len() - start) as u32;
    buf[start..start + 4].copy_from_slice(&size.to_be_bytes());
}

/// Pack an ISO-639-2/T code into the 15-bit mdhd language field.
fn pack_language(lang: &str) -> u16 {
    let code: Vec<u8> = lang.bytes().take(3).collect();
    if code.len() != 3 || !code.iter().all(|c| c.is_ascii_lowercase()) {
        return 0x55C4; // und
    }
    code.iter()
        .fold(0u16, |acc, &c| (acc << 5) | ((c - 0x60) as u16 & 0x1F))
}

/// Builder for a subtitle track init segment.
pub struct SubtitleInitBuilder {
    track_id: u32,
    timescale: u32,
    language: String,
}

impl SubtitleInitBuilder {
    pub fn new(timescale: u32) -> Self {
        Self {
            track_id: 1,
            timescale,
            language: "und".into(),
        }
    }

    pub fn track_id(mut self, track_id: u32) -> Self {
        self.track_id = track_id;
        self
    }

    /// Three-letter language code. Anything else is written as `und`.
    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.language = lang.into();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(512);
        self.write_ftyp(&mut buf);
        self.write_moov(&mut buf);
        buf.to_vec()
    }

    fn write_ftyp(&self, buf: &mut BytesMut) {
        let start = begin_box(buf, b"ftyp");
        buf.put_slice(b"iso6"); // major brand
        buf.put_u32(0); // minor version
        for brand in [b"iso6", b"dash", b"cmfc"] {
            buf.put_slice(brand);
        }
        end_box(buf, start);
    }

    fn write_moov(&self, buf: &mut BytesMut) {
        let moov = begin_box(buf, b"moov");

        // mvhd
        buf.put_u32(108);
        buf.put_slice(b"mvhd");
        buf.put_u32(0); // version/flags
        buf.put_u32(0); // creation time
        buf.put_u32(0); // modification time
        buf.put_u32(self.timescale);
        buf.put_u32(0); // duration
        buf.put_u32(0x00010000); // rate
        buf.put_u16(0x0100); // volume
        buf.put_slice(&[0; 10]); // reserved
        self.write_matrix(buf);
        buf.put_slice(&[0; 24]); // pre_defined
        buf.put_u32(self.track_id + 1); // next track id

        self.write_trak(buf);

        // mvex/trex
        let mvex = begin_box(buf, b"mvex");
        buf.put_u32(32);
        buf.put_slice(b"trex");
        buf.put_u32(0); // version/flags
        buf.put_u32(self.track_id);
        buf.put_u32(1); // default sample description index
        buf.put_u32(0); // default sample duration
        buf.put_u32(0); // default sample size
        buf.put_u32(0); // default sample flags
        end_box(buf, mvex);

        end_box(buf, moov);
    }

    fn write_matrix(&self, buf: &mut BytesMut) {
        for v in [0x00010000u32, 0, 0, 0, 0x00010000, 0, 0, 0, 0x40000000] {
            buf.put_u32(v);
        }
    }

    fn write_trak(&self, buf: &mut BytesMut) {
        let trak = begin_box(buf, b"trak");

        // tkhd
        buf.put_u32(92);
        buf.put_slice(b"tkhd");
        buf.put_u8(0); // version 0
        buf.put_slice(&[0, 0, 7]); // flags: enabled, in_movie, in_preview
        buf.put_u32(0); // creation time
        buf.put_u32(0); // modification time
        buf.put_u32(self.track_id);
        buf.put_u32(0); // reserved
        buf.put_u32(0); // duration
        buf.put_u64(0); // reserved
        buf.put_u16(0); // layer
        buf.put_u16(0); // alternate group
        buf.put_u16(0); // volume
        buf.put_u16(0); // reserved
        self.write_matrix(buf);
        buf.put_u32(0); // width
        buf.put_u32(0); // height

        let mdia = begin_box(buf, b"mdia");

        // mdhd
        buf.put_u32(32);
        buf.put_slice(b"mdhd");
        buf.put_u32(0); // version/flags
        buf.put_u32(0); // creation time
        buf.put_u32(0); // modification time
        buf.put_u32(self.timescale);
        buf.put_u32(0); // duration
        buf.put_u16(pack_language(&self.language));
        buf.put_u16(0); // pre_defined

        // hdlr
        let name = b"SubtitleHandler";
        buf.put_u32(32 + name.len() as u32 + 1);
        buf.put_slice(b"hdlr");
        buf.put_u32(0); // version/flags
        buf.put_u32(0); // pre_defined
        buf.put_slice(b"subt");
        buf.put_u32(0); // reserved
        buf.put_u32(0);
        buf.put_u32(0);
        buf.put_slice(name);
        buf.put_u8(0);

        let minf = begin_box(buf, b"minf");

        // sthd
        buf.put_u32(12);
        buf.put_slice(b"sthd");
        buf.put_u32(0); // version/flags

        // dinf/dref/url
        buf.put_u32(36);
        buf.put_slice(b"dinf");
        buf.put_u32(28);
        buf.put_slice(b"dref");
        buf.put_u32(0); // version/flags
        buf.put_u32(1); // entry count
        buf.put_u32(12);
        buf.put_slice(b"url ");
        buf.put_u32(1); // flags: self-contained

        self.write_stbl(buf);

        end_box(buf, minf);
        end_box(buf, mdia);
        end_box(buf, trak);
    }

    fn write_stbl(&self, buf: &mut BytesMut) {
        let stbl = begin_box(buf, b"stbl");

        let stsd = begin_box(buf, b"stsd");
        buf.put_u32(0); // version/flags
        buf.put_u32(1); // entry count

        let stpp = begin_box(buf, b"stpp");
        buf.put_slice(&[0; 6]); // reserved
        buf.put_u16(1); // data reference index
        buf.put_slice(TTML_NAMESPACE.as_bytes());
        buf.put_u8(0);
        buf.put_u8(0); // schema_location
        buf.put_u8(0); // auxiliary_mime_types
        end_box(buf, stpp);
        end_box(buf, stsd);

        // Empty sample tables (required for fMP4)
        for kind in [b"stts", b"stsc", b"stco"] {
            buf.put_u32(16);
            buf.put_slice(kind);
            buf.put_u32(0); // version/flags
            buf.put_u32(0); // entry count
        }
        buf.put_u32(20);
        buf.put_slice(b"stsz");
        buf.put_u32(0); // version/flags
        buf.put_u32(0); // sample size
        buf.put_u32(0); // sample count

        end_box(buf, stbl);
    }
}
