//! ContentProtection insertion and removal.

use tracing::debug;

use super::document::ManifestDocument;
use super::element::Element;
use super::{insert_ordered, ContentType, Node};
use crate::drm::{DrmSystem, CENC_SCHEME};
use crate::error::{Error, Result};

/// Fragment attribute restricting which content types receive it.
///
/// A whitespace-separated list of `video`, `audio` and `text`. Absent means
/// video and audio. The attribute is stripped before insertion.
pub const APPLY_TO: &str = "applyTo";

fn applicable_types(fragment: &Element) -> Vec<ContentType> {
    match fragment.attr(APPLY_TO) {
        None => vec![ContentType::Video, ContentType::Audio],
        Some(list) => list
            .split_whitespace()
            .filter_map(|token| match token.to_ascii_lowercase().as_str() {
                "video" => Some(ContentType::Video),
                "audio" => Some(ContentType::Audio),
                "text" => Some(ContentType::Text),
                _ => None,
            })
            .collect(),
    }
}

/// Lowercased strings a scheme must contain to match `keyword`.
fn scheme_needles(keyword: &str) -> Vec<String> {
    let keyword = keyword.trim().to_ascii_lowercase();
    let mut needles = vec![keyword.clone()];
    if let Ok(system) = keyword.parse::<DrmSystem>() {
        needles.extend(system.identifiers());
    } else if keyword == "cenc" {
        needles.push(CENC_SCHEME.to_string());
    }
    needles
}

fn scheme_of(el: &Element) -> String {
    el.attr("schemeIdUri").unwrap_or_default().to_ascii_lowercase()
}

fn is_content_protection(el: &Element) -> bool {
    el.local_name() == "ContentProtection"
}

impl ManifestDocument {
    /// Parse a ContentProtection fragment and insert it. See
    /// [`ManifestDocument::add_content_protection_element`].
    pub fn add_content_protection(&mut self, fragment: &str) -> Result<usize> {
        let element = Element::parse_fragment(fragment)?;
        if !is_content_protection(&element) {
            return Err(Error::xml(format!(
                "fragment root is <{}>, expected <ContentProtection>",
                element.name
            )));
        }
        if element.attr("schemeIdUri").is_none() {
            return Err(Error::xml("ContentProtection fragment has no schemeIdUri"));
        }
        Ok(self.add_content_protection_element(element))
    }

    /// Insert `fragment` under every applicable AdaptationSet, replacing an
    /// existing element with the same scheme. Returns the number of sets
    /// touched.
    pub fn add_content_protection_element(&mut self, mut fragment: Element) -> usize {
        let targets = applicable_types(&fragment);
        fragment.remove_attr(APPLY_TO);
        let scheme = scheme_of(&fragment);

        let mut touched = 0;
        for set in self.adaptation_sets_mut() {
            let Some(content_type) = ContentType::of_adaptation_set(set) else {
                continue;
            };
            if !targets.contains(&content_type) {
                continue;
            }

            let existing = set.children.iter().position(|n| {
                matches!(n, Node::Element(e) if is_content_protection(e) && scheme_of(e) == scheme)
            });
            match existing {
                Some(pos) => set.children[pos] = Node::Element(fragment.clone()),
                None => insert_ordered(set, fragment.clone()),
            }
            touched += 1;
        }
        debug!("ContentProtection {} added to {} AdaptationSets", scheme, touched);
        touched
    }

    /// Remove every ContentProtection whose scheme matches `keyword`.
    ///
    /// The keyword is matched case-insensitively against `schemeIdUri`; DRM
    /// system names (`playready`, `widevine`, `marlin`, `clearkey`) and
    /// `cenc` also match their system ids. Returns the number removed.
    pub fn remove_content_protection(&mut self, keyword: &str) -> usize {
        let needles = scheme_needles(keyword);
        let mut removed = 0;
        for set in self.adaptation_sets_mut() {
            removed += set.retain_elements(|el| {
                !(is_content_protection(el)
                    && needles.iter().any(|needle| scheme_of(el).contains(needle.as_str())))
            });
            for rep in set.children_named_mut("Representation") {
                removed += rep.retain_elements(|el| {
                    !(is_content_protection(el)
                        && needles.iter().any(|needle| scheme_of(el).contains(needle.as_str())))
                });
            }
        }
        debug!("Removed {} ContentProtection elements matching '{}'", removed, keyword);
        removed
    }

    /// Schemes of the ContentProtection children of each AdaptationSet.
    pub fn content_protection_schemes(&self) -> Vec<Vec<String>> {
        self.adaptation_sets()
            .into_iter()
            .map(|set| {
                set.children_named("ContentProtection")
                    .filter_map(|cp| cp.attr("schemeIdUri").map(str::to_string))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MPD: &str = r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011">
  <Period>
    <AdaptationSet contentType="video" mimeType="video/mp4">
      <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="cenc"/>
      <Role schemeIdUri="urn:mpeg:dash:role:2011" value="main"/>
      <Representation id="v1" bandwidth="512000"/>
    </AdaptationSet>
    <AdaptationSet contentType="audio" mimeType="audio/mp4">
      <Representation id="a1" bandwidth="128000"/>
    </AdaptationSet>
  </Period>
</MPD>"#;

    #[test]
    fn test_apply_to_video_only() {
        let mut doc = ManifestDocument::parse(MPD).unwrap();
        let n = doc
            .add_content_protection(r#"<ContentProtection applyTo="video" schemeIdUri="urn:uuid:abc"/>"#)
            .unwrap();
        assert_eq!(n, 1);
        let schemes = doc.content_protection_schemes();
        assert_eq!(schemes[0], vec!["urn:mpeg:dash:mp4protection:2011", "urn:uuid:abc"]);
        assert!(schemes[1].is_empty());
        assert!(!doc.to_xml().unwrap().contains("applyTo"));
    }

    #[test]
    fn test_same_scheme_replaced() {
        let mut doc = ManifestDocument::parse(MPD).unwrap();
        doc.add_content_protection(r#"<ContentProtection schemeIdUri="urn:uuid:abc" value="one"/>"#)
            .unwrap();
        doc.add_content_protection(r#"<ContentProtection schemeIdUri="URN:UUID:ABC" value="two"/>"#)
            .unwrap();
        let xml = doc.to_xml().unwrap();
        assert_eq!(xml.matches("value=\"two\"").count(), 2);
        assert!(!xml.contains("value=\"one\""));
    }

    #[test]
    fn test_inserted_before_role() {
        let mut doc = ManifestDocument::parse(MPD).unwrap();
        doc.add_content_protection(r#"<ContentProtection schemeIdUri="urn:uuid:abc"/>"#)
            .unwrap();
        let video = doc.adaptation_sets()[0];
        let names: Vec<&str> = video.elements().map(|e| e.local_name()).collect();
        assert_eq!(
            names,
            vec!["ContentProtection", "ContentProtection", "Role", "Representation"]
        );
    }

    #[test]
    fn test_remove_by_alias() {
        let mut doc = ManifestDocument::parse(MPD).unwrap();
        assert_eq!(doc.remove_content_protection("cenc"), 1);
        assert_eq!(doc.remove_content_protection("cenc"), 0);
        assert!(doc.content_protection_schemes().iter().all(|s| s.is_empty()));
    }

    #[test]
    fn test_bad_fragments() {
        let mut doc = ManifestDocument::parse(MPD).unwrap();
        assert!(doc.add_content_protection("<Role/>").is_err());
        assert!(doc.add_content_protection("<ContentProtection/>").is_err());
        assert!(doc.add_content_protection("<ContentProtection").is_err());
    }
}
