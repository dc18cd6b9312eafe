//! MPD manifest editing.
//!
//! [`ManifestDocument`] keeps the whole manifest as an ordered element tree
//! so that anything it does not understand survives a load/save cycle.

pub(crate) mod element;
mod document;
mod fix;
mod protection;

pub use document::{ManifestDocument, SegmentTiming};
pub use element::{Element, Node};
pub use protection::APPLY_TO;

use std::fmt;

/// Content type of an AdaptationSet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Video,
    Audio,
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "text" | "application" => Some(Self::Text),
            _ => None,
        }
    }

    fn from_codecs(codecs: &str) -> Option<Self> {
        let prefix = codecs.split('.').next().unwrap_or_default();
        match prefix {
            "avc1" | "avc3" | "hvc1" | "hev1" => Some(Self::Video),
            "mp4a" | "ec-3" | "ac-3" => Some(Self::Audio),
            "stpp" | "wvtt" => Some(Self::Text),
            _ => None,
        }
    }

    /// Work out an AdaptationSet's content type from its own attributes,
    /// falling back to its first Representation.
    pub fn of_adaptation_set(set: &Element) -> Option<Self> {
        if let Some(ct) = set.attr("contentType").and_then(Self::from_token) {
            return Some(ct);
        }
        let first_rep = set.child("Representation");
        let mime = set
            .attr("mimeType")
            .or_else(|| first_rep.and_then(|r| r.attr("mimeType")));
        if let Some(ct) = mime.and_then(|m| m.split('/').next()).and_then(Self::from_token) {
            return Some(ct);
        }
        set.attr("codecs")
            .or_else(|| first_rep.and_then(|r| r.attr("codecs")))
            .and_then(Self::from_codecs)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of an AdaptationSet child in schema order.
fn child_rank(local_name: &str) -> Option<u8> {
    Some(match local_name {
        "FramePacking" => 0,
        "AudioChannelConfiguration" => 1,
        "ContentProtection" => 2,
        "EssentialProperty" => 3,
        "SupplementalProperty" => 4,
        "InbandEventStream" => 5,
        "Accessibility" => 6,
        "Role" => 7,
        "Rating" => 8,
        "Viewpoint" => 9,
        "ContentComponent" => 10,
        "BaseURL" => 11,
        "SegmentBase" => 12,
        "SegmentList" => 13,
        "SegmentTemplate" => 14,
        "Representation" => 15,
        _ => return None,
    })
}

/// Insert `child` into `parent` after every sibling that precedes it in
/// schema order.
pub(crate) fn insert_ordered(parent: &mut Element, child: Element) {
    let rank = child_rank(child.local_name());
    let mut pos = 0;
    for (i, node) in parent.children.iter().enumerate() {
        if let Node::Element(existing) = node {
            if let (Some(existing_rank), Some(rank)) = (child_rank(existing.local_name()), rank) {
                if existing_rank <= rank {
                    pos = i + 1;
                }
            }
        }
    }
    if rank.is_none() {
        pos = parent.children.len();
    }
    parent.children.insert(pos, Node::Element(child));
}
