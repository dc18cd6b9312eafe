//! TTML (EBU-TT-D style) timed-text documents.

use std::path::Path;

use crate::error::{Error, Result};
use crate::mpd::element::{self, Element, Whitespace};

const DEFAULT_FRAME_RATE: f64 = 30.0;
const DEFAULT_TICK_RATE: f64 = 1.0;

/// Timing parameters declared on the `tt` root.
#[derive(Debug, Clone, Copy)]
struct TimeBase {
    frame_rate: f64,
    tick_rate: f64,
}

impl TimeBase {
    fn of(root: &Element) -> Self {
        let attr = |local: &str| {
            root.attributes
                .iter()
                .find(|(k, _)| k.rsplit(':').next() == Some(local))
                .and_then(|(_, v)| v.parse::<f64>().ok())
                .filter(|v| *v > 0.0)
        };
        Self {
            frame_rate: attr("frameRate").unwrap_or(DEFAULT_FRAME_RATE),
            tick_rate: attr("tickRate").unwrap_or(DEFAULT_TICK_RATE),
        }
    }

    /// Parse a clock-time (`hh:mm:ss.fff`, `hh:mm:ss:ff`) or offset-time
    /// (`12.5s`, `500ms`, `90f`, `1000t`) into seconds.
    fn parse(&self, value: &str) -> Option<f64> {
        let value = value.trim();
        if value.contains(':') {
            let parts: Vec<&str> = value.split(':').collect();
            let (h, m, s) = (parts.first()?, parts.get(1)?, parts.get(2)?);
            let mut secs = h.parse::<f64>().ok()? * 3600.0 + m.parse::<f64>().ok()? * 60.0 + s.parse::<f64>().ok()?;
            if let Some(frames) = parts.get(3) {
                secs += frames.parse::<f64>().ok()? / self.frame_rate;
            }
            return Some(secs);
        }

        let split = value.find(|c: char| c.is_ascii_alphabetic())?;
        let (number, metric) = value.split_at(split);
        let n: f64 = number.parse().ok()?;
        Some(match metric {
            "h" => n * 3600.0,
            "m" => n * 60.0,
            "s" => n,
            "ms" => n / 1000.0,
            "f" => n / self.frame_rate,
            "t" => n / self.tick_rate,
            _ => return None,
        })
    }

    fn cue_window(&self, p: &Element) -> Option<(f64, f64)> {
        let begin = self.parse(p.attr("begin")?)?;
        let end = match p.attr("end") {
            Some(end) => self.parse(end)?,
            None => begin + self.parse(p.attr("dur")?)?,
        };
        Some((begin, end))
    }
}

/// A timed cue (one `<p>`), in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cue {
    pub begin: f64,
    pub end: f64,
}

/// A parsed subtitle document.
#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    root: Element,
    time_base: TimeBase,
    cues: Vec<Cue>,
}

impl SubtitleDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let (root, _) = element::parse_with(xml, Whitespace::Preserve)?;
        if root.local_name() != "tt" {
            return Err(Error::invalid_subtitle(format!("root element is <{}>, expected <tt>", root.name)));
        }
        let time_base = TimeBase::of(&root);
        let mut cues = Vec::new();
        collect_cues(&root, &time_base, &mut cues)?;
        cues.sort_by(|a, b| a.begin.total_cmp(&b.begin));
        Ok(Self { root, time_base, cues })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| match e {
            Error::InvalidSubtitle(msg) => Error::invalid_subtitle(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Cues in begin order.
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Latest cue end, in seconds.
    pub fn end_time(&self) -> f64 {
        self.cues.iter().map(|c| c.end).fold(0.0, f64::max)
    }

    /// The document restricted to cues overlapping `[start, end)`.
    pub fn window(&self, start: f64, end: f64) -> Result<String> {
        let mut root = self.root.clone();
        retain_window(&mut root, &self.time_base, start, end);
        element::serialize_with(&root, true, Whitespace::Preserve)
    }
}

fn collect_cues(el: &Element, time_base: &TimeBase, cues: &mut Vec<Cue>) -> Result<()> {
    for child in el.elements() {
        if child.local_name() == "p" {
            let (begin, end) = time_base
                .cue_window(child)
                .ok_or_else(|| Error::invalid_subtitle("cue without parseable begin/end"))?;
            if end < begin {
                return Err(Error::invalid_subtitle(format!("cue ends at {} before it begins at {}", end, begin)));
            }
            cues.push(Cue { begin, end });
        } else {
            collect_cues(child, time_base, cues)?;
        }
    }
    Ok(())
}

fn retain_window(el: &mut Element, time_base: &TimeBase, start: f64, end: f64) {
    el.retain_elements(|child| {
        if child.local_name() != "p" {
            return true;
        }
        match time_base.cue_window(child) {
            Some((b, e)) => b < end && e > start,
            None => false,
        }
    });
    for child in el.elements_mut() {
        if child.local_name() != "p" {
            retain_window(child, time_base, start, end);
        }
    }
}
