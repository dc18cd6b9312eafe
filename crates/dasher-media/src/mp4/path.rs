//! Box path addressing (`moov/trak[1]/senc`, `moov/pssh[*]`).

use std::fmt;
use std::str::FromStr;

use super::boxes::BoxType;
use crate::error::{Error, Result};

/// Which same-type siblings a path segment selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// No selector: the first matching sibling.
    First,
    /// `[n]`: the n-th matching sibling, counting from 0.
    Index(usize),
    /// `[*]`: every matching sibling.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub box_type: BoxType,
    pub selector: Selector,
}

impl PathSegment {
    /// Pick the selected entries out of the same-type siblings.
    pub(crate) fn select<T: Copy>(&self, siblings: &[T]) -> Vec<T> {
        match self.selector {
            Selector::First => siblings.first().copied().into_iter().collect(),
            Selector::Index(n) => siblings.get(n).copied().into_iter().collect(),
            Selector::All => siblings.to_vec(),
        }
    }
}

/// A `/`-separated sequence of box types with optional selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxPath {
    segments: Vec<PathSegment>,
}

impl BoxPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl FromStr for BoxPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for part in s.split('/').filter(|p| !p.is_empty()) {
            let (name, selector) = match part.find('[') {
                None => (part, Selector::First),
                Some(open) => {
                    let inner = part[open + 1..]
                        .strip_suffix(']')
                        .ok_or_else(|| Error::invalid_path(s, "unterminated selector"))?;
                    let selector = match inner {
                        "*" => Selector::All,
                        n => Selector::Index(
                            n.parse()
                                .map_err(|_| Error::invalid_path(s, format!("bad selector [{}]", n)))?,
                        ),
                    };
                    (&part[..open], selector)
                }
            };
            let box_type = name
                .parse::<BoxType>()
                .map_err(|_| Error::invalid_path(s, format!("'{}' is not a box type", name)))?;
            segments.push(PathSegment { box_type, selector });
        }

        if segments.is_empty() {
            return Err(Error::invalid_path(s, "empty path"));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for BoxPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", seg.box_type)?;
            match seg.selector {
                Selector::First => {}
                Selector::Index(n) => write!(f, "[{}]", n)?,
                Selector::All => f.write_str("[*]")?,
            }
        }
        Ok(())
    }
}
