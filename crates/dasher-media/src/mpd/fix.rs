//! Corrections applied to a freshly packaged manifest.

use dasher_common::VideoCodec;
use tracing::debug;

use super::document::ManifestDocument;
use super::element::Element;
use super::{insert_ordered, ContentType};

/// HbbTV live profile.
pub const HBBTV_PROFILE: &str = "urn:hbbtv:dash:profile:isoff-live:2012";

/// MPEG-DASH ISO BMFF live profile.
pub const MPEG_LIVE_PROFILE: &str = "urn:mpeg:dash:profile:isoff-live:2011";

const ROLE_SCHEME: &str = "urn:mpeg:dash:role:2011";
const DEFAULT_AUDIO_CODECS: &str = "mp4a.40.2";

fn default_video_codecs(codec: VideoCodec) -> &'static str {
    match codec {
        VideoCodec::H264 => "avc1.640028",
        VideoCodec::H265 => "hvc1.1.6.L120.90",
    }
}

/// Rewrite in-band parameter set sample entry names to their out-of-band
/// equivalents (`avc3` to `avc1`, `hev1` to `hvc1`).
fn normalize_codecs(value: &str, codec: VideoCodec) -> String {
    let (from, to) = match codec {
        VideoCodec::H264 => ("avc3", "avc1"),
        VideoCodec::H265 => ("hev1", "hvc1"),
    };
    value
        .split(',')
        .map(|c| {
            let c = c.trim();
            match c.strip_prefix(from) {
                Some(rest) if rest.is_empty() || rest.starts_with('.') => format!("{}{}", to, rest),
                _ => c.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Counts attribute edits so the caller can log what changed.
struct Edits(usize);

impl Edits {
    fn set(&mut self, el: &mut Element, key: &str, value: &str) {
        if el.attr(key) != Some(value) {
            el.set_attr(key, value);
            self.0 += 1;
        }
    }

    fn remove(&mut self, el: &mut Element, key: &str) {
        if el.remove_attr(key).is_some() {
            self.0 += 1;
        }
    }
}

impl ManifestDocument {
    /// Correct codecs, mimeType and SegmentTemplate defects left by the
    /// packager and add HbbTV signalling. Idempotent. Returns the number of
    /// edits made.
    pub fn fix_content(&mut self, codec: VideoCodec) -> usize {
        let mut edits = Edits(0);

        fix_profiles(self.root_mut(), &mut edits);

        for set in self.adaptation_sets_mut() {
            let Some(content_type) = ContentType::of_adaptation_set(set) else {
                continue;
            };
            edits.set(set, "contentType", content_type.as_str());

            if content_type == ContentType::Text {
                continue;
            }

            fix_mime_type(set, content_type, &mut edits);
            fix_codecs(set, content_type, codec, &mut edits);
            edits.set(set, "segmentAlignment", "true");
            edits.set(set, "startWithSAP", "1");

            if set.child("Role").is_none() {
                insert_ordered(
                    set,
                    Element::new("Role")
                        .with_attr("schemeIdUri", ROLE_SCHEME)
                        .with_attr("value", "main"),
                );
                edits.0 += 1;
            }

            fix_segment_templates(set, &mut edits);
        }

        debug!("fix_content({}) made {} edits", codec, edits.0);
        edits.0
    }
}

fn fix_profiles(root: &mut Element, edits: &mut Edits) {
    let mut profiles: Vec<String> = root
        .attr("profiles")
        .map(|p| p.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    if !profiles.iter().any(|p| p == HBBTV_PROFILE) {
        profiles.insert(0, HBBTV_PROFILE.to_string());
    }
    if !profiles.iter().any(|p| p == MPEG_LIVE_PROFILE) {
        profiles.push(MPEG_LIVE_PROFILE.to_string());
    }
    edits.set(root, "profiles", &profiles.join(","));
}

fn fix_mime_type(set: &mut Element, content_type: ContentType, edits: &mut Edits) {
    let mime = format!("{}/mp4", content_type);
    edits.set(set, "mimeType", &mime);
    for rep in set.children_named_mut("Representation") {
        edits.remove(rep, "mimeType");
    }
}

fn fix_codecs(set: &mut Element, content_type: ContentType, codec: VideoCodec, edits: &mut Edits) {
    let normalize = |value: &str| match content_type {
        ContentType::Video => normalize_codecs(value, codec),
        _ => value.to_string(),
    };

    if let Some(value) = set.attr("codecs").map(normalize) {
        edits.set(set, "codecs", &value);
    }
    let set_level = set.attr("codecs").is_some();

    let sibling = set
        .children_named("Representation")
        .find_map(|rep| rep.attr("codecs"))
        .map(normalize);
    let fallback = sibling.unwrap_or_else(|| match content_type {
        ContentType::Video => default_video_codecs(codec).to_string(),
        _ => DEFAULT_AUDIO_CODECS.to_string(),
    });

    for rep in set.children_named_mut("Representation") {
        let fixed = rep.attr("codecs").map(normalize);
        match fixed {
            Some(value) => edits.set(rep, "codecs", &value),
            None if !set_level => edits.set(rep, "codecs", &fallback),
            None => {}
        }
    }
}

const TIMING_ATTRIBUTES: [&str; 3] = ["timescale", "duration", "startNumber"];

fn fix_segment_templates(set: &mut Element, edits: &mut Edits) {
    let canonical = set.child("SegmentTemplate").cloned().or_else(|| {
        set.children_named("Representation")
            .find_map(|rep| rep.child("SegmentTemplate"))
            .cloned()
    });
    let Some(canonical) = canonical else {
        return;
    };

    for rep in set.children_named_mut("Representation") {
        if let Some(template) = rep.child_mut("SegmentTemplate") {
            for key in TIMING_ATTRIBUTES {
                if let Some(value) = canonical.attr(key) {
                    edits.set(template, key, value);
                }
            }
        }
    }

    if set.child("SegmentTemplate").is_some() {
        return;
    }

    let templates: Vec<Option<&Element>> = set
        .children_named("Representation")
        .map(|rep| rep.child("SegmentTemplate"))
        .collect();
    let hoistable = !templates.is_empty()
        && templates.iter().all(|t| *t == Some(&canonical))
        && ["media", "initialization"].iter().all(|key| {
            canonical
                .attr(key)
                .map_or(true, |v| v.contains("$RepresentationID$"))
        });
    if !hoistable {
        return;
    }

    for rep in set.children_named_mut("Representation") {
        rep.retain_elements(|el| el.local_name() != "SegmentTemplate");
    }
    insert_ordered(set, canonical);
    edits.0 += 1;
}
