//! Media segment builder for timed-text fragments.

use bytes::{BufMut, BytesMut};

use super::{begin_box, end_box};

/// Builds `styp + moof + mdat` holding one timed-text sample.
pub struct SubtitleFragmentBuilder {
    sequence_number: u32,
    track_id: u32,
    base_media_decode_time: u64,
    duration: u32,
}

impl SubtitleFragmentBuilder {
    pub fn new(sequence_number: u32, track_id: u32) -> Self {
        Self {
            sequence_number,
            track_id,
            base_media_decode_time: 0,
            duration: 0,
        }
    }

    /// Set base media decode time (track timescale units).
    pub fn base_media_decode_time(mut self, time: u64) -> Self {
        self.base_media_decode_time = time;
        self
    }

    /// Set the sample duration (track timescale units).
    pub fn duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Serialize the segment with `sample` as the mdat payload.
    pub fn build(self, sample: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(128 + sample.len());

        let styp = begin_box(&mut buf, b"styp");
        buf.put_slice(b"msdh"); // major brand
        buf.put_u32(0); // minor version
        buf.put_slice(b"msdh");
        buf.put_slice(b"msix");
        end_box(&mut buf, styp);

        self.write_moof(&mut buf, sample.len() as u32);

        buf.put_u32(8 + sample.len() as u32);
        buf.put_slice(b"mdat");
        buf.put_slice(sample);

        buf.to_vec()
    }

    fn write_moof(&self, buf: &mut BytesMut, sample_size: u32) {
        let moof = begin_box(buf, b"moof");

        // mfhd
        buf.put_u32(16);
        buf.put_slice(b"mfhd");
        buf.put_u32(0); // version/flags
        buf.put_u32(self.sequence_number);

        let traf = begin_box(buf, b"traf");

        // tfhd: default-base-is-moof
        buf.put_u32(16);
        buf.put_slice(b"tfhd");
        buf.put_u32(0x020000);
        buf.put_u32(self.track_id);

        // tfdt, version 1 for 64-bit decode time
        buf.put_u32(20);
        buf.put_slice(b"tfdt");
        buf.put_u32(0x01000000);
        buf.put_u64(self.base_media_decode_time);

        // trun: data-offset, sample-duration, sample-size; one sample
        buf.put_u32(28);
        buf.put_slice(b"trun");
        buf.put_u32(0x000301);
        buf.put_u32(1);
        let data_offset_pos = buf.len();
        buf.put_u32(0); // placeholder
        buf.put_u32(self.duration);
        buf.put_u32(sample_size);

        end_box(buf, traf);
        end_box(buf, moof);

        // Relative to the moof start; the payload follows the 8-byte mdat header.
        let data_offset = (buf.len() - moof + 8) as u32;
        buf[data_offset_pos..data_offset_pos + 4].copy_from_slice(&data_offset.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::{BoxTree, BoxType};

    #[test]
    fn test_fragment_layout() {
        let sample = b"<tt xmlns=\"http://www.w3.org/ns/ttml\"/>";
        let data = SubtitleFragmentBuilder::new(3, 1)
            .base_media_decode_time(12_000)
            .duration(6_000)
            .build(sample);

        let tree = BoxTree::parse(&data).unwrap();
        tree.check_sizes().unwrap();
        let kinds: Vec<BoxType> = tree.roots().iter().map(|&id| tree.node(id).box_type()).collect();
        assert_eq!(kinds, vec![BoxType::STYP, BoxType::MOOF, BoxType::MDAT]);

        let moof = tree.node(tree.roots()[1]);
        let mdat = tree.roots()[2];
        assert_eq!(tree.payload(&data, mdat), sample);

        // data_offset points at the mdat payload
        let trun_offset = data.windows(4).position(|w| w == b"trun").unwrap() - 4;
        let raw = &data[trun_offset + 16..trun_offset + 20];
        let data_offset = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as u64;
        assert_eq!(moof.offset() + data_offset, tree.node(mdat).header.payload_offset());
    }
}
