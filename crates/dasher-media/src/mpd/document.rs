//! The manifest document and its structural navigation.

use std::path::Path;

use tracing::debug;

use super::element::{self, Element};
use super::ContentType;
use crate::drm::NAMESPACES;
use crate::error::{Error, Result};
use crate::fsutil::write_atomic;

/// Segment cadence taken from a SegmentTemplate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentTiming {
    pub timescale: u64,
    /// Segment duration in timescale units.
    pub duration: u64,
    pub start_number: u64,
}

impl SegmentTiming {
    pub fn duration_secs(&self) -> f64 {
        self.duration as f64 / self.timescale as f64
    }

    fn from_template(template: &Element) -> Option<Self> {
        let duration = template.attr("duration")?.parse().ok()?;
        let timescale = template
            .attr("timescale")
            .and_then(|t| t.parse().ok())
            .unwrap_or(1);
        let start_number = template
            .attr("startNumber")
            .and_then(|n| n.parse().ok())
            .unwrap_or(1);
        if duration == 0 || timescale == 0 {
            return None;
        }
        Some(Self {
            timescale,
            duration,
            start_number,
        })
    }
}

/// An MPD manifest held as an ordered element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    root: Element,
    declaration: bool,
}

impl ManifestDocument {
    /// Parse manifest text. The root element must be `MPD`.
    pub fn parse(xml: &str) -> Result<Self> {
        let (root, declaration) = element::parse(xml)?;
        if root.local_name() != "MPD" {
            return Err(Error::xml(format!("root element is <{}>, expected <MPD>", root.name)));
        }
        Ok(Self { root, declaration })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn to_xml(&self) -> Result<String> {
        element::serialize(&self.root, self.declaration)
    }

    /// Serialize and atomically replace `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let xml = self.to_xml()?;
        write_atomic(path, xml.as_bytes())?;
        debug!("Saved manifest {}", path.display());
        Ok(())
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn periods(&self) -> impl Iterator<Item = &Element> {
        self.root.children_named("Period")
    }

    /// Every AdaptationSet of every Period, in document order.
    pub fn adaptation_sets(&self) -> Vec<&Element> {
        self.periods()
            .flat_map(|p| p.children_named("AdaptationSet"))
            .collect()
    }

    pub fn adaptation_sets_mut(&mut self) -> Vec<&mut Element> {
        self.root
            .children_named_mut("Period")
            .flat_map(|p| p.children_named_mut("AdaptationSet"))
            .collect()
    }

    /// Ids of every Representation.
    pub fn representation_ids(&self) -> Vec<String> {
        self.adaptation_sets()
            .into_iter()
            .flat_map(|set| set.children_named("Representation"))
            .filter_map(|rep| rep.attr("id").map(str::to_string))
            .collect()
    }

    /// Declare the namespace prefixes used by DRM signalling. Returns how
    /// many declarations were added.
    pub fn add_namespaces(&mut self) -> usize {
        let mut added = 0;
        for (prefix, uri) in NAMESPACES {
            if self.root.attr(prefix).is_none() {
                self.root.set_attr(prefix, *uri);
                added += 1;
            }
        }
        added
    }

    /// Replace `from` with `to` in every SegmentTemplate `initialization`.
    pub fn rewrite_initialization(&mut self, from: &str, to: &str) -> usize {
        let mut count = 0;
        visit_mut(&mut self.root, &mut |el| {
            if el.local_name() != "SegmentTemplate" {
                return;
            }
            if let Some(init) = el.attr("initialization").filter(|i| i.contains(from)) {
                let rewritten = init.replace(from, to);
                el.set_attr("initialization", rewritten);
                count += 1;
            }
        });
        count
    }

    /// Segment cadence of the first video (else audio) AdaptationSet.
    pub fn segment_timing(&self) -> Option<SegmentTiming> {
        let sets = self.adaptation_sets();
        [ContentType::Video, ContentType::Audio]
            .into_iter()
            .flat_map(|wanted| {
                sets.iter()
                    .filter(move |set| ContentType::of_adaptation_set(set) == Some(wanted))
            })
            .find_map(|set| {
                set.child("SegmentTemplate")
                    .or_else(|| {
                        set.children_named("Representation")
                            .find_map(|rep| rep.child("SegmentTemplate"))
                    })
                    .and_then(SegmentTiming::from_template)
            })
    }

    /// Append an AdaptationSet to the first Period.
    pub fn add_adaptation_set(&mut self, set: Element) -> Result<()> {
        let period = self
            .root
            .child_mut("Period")
            .ok_or_else(|| Error::xml("manifest has no Period"))?;
        period.children.push(super::Node::Element(set));
        Ok(())
    }

    /// Drop every AdaptationSet holding a Representation with `id`.
    pub fn remove_adaptation_sets_with_representation(&mut self, id: &str) -> usize {
        let mut removed = 0;
        for period in self.root.children_named_mut("Period") {
            removed += period.retain_elements(|el| {
                el.local_name() != "AdaptationSet"
                    || !el
                        .children_named("Representation")
                        .any(|rep| rep.attr("id") == Some(id))
            });
        }
        removed
    }
}

/// Depth-first visit of every element.
pub(crate) fn visit_mut(el: &mut Element, f: &mut impl FnMut(&mut Element)) {
    f(el);
    for child in el.elements_mut() {
        visit_mut(child, f);
    }
}
