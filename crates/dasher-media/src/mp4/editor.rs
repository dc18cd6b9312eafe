//! Locating and removing boxes by path.

use std::path::Path;

use tracing::{debug, warn};

use super::boxes::SizeField;
use super::path::BoxPath;
use super::tree::{BoxTree, NodeId};
use crate::error::{Error, Result};
use crate::fsutil::write_atomic;

/// A located box plus the chain of containers above it (outermost first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxMatch {
    pub node: NodeId,
    pub ancestors: Vec<NodeId>,
}

/// Find every box addressed by `path`, in file order.
pub fn locate(tree: &BoxTree, path: &BoxPath) -> Vec<BoxMatch> {
    let mut frontier: Vec<BoxMatch> = Vec::new();

    for (depth, segment) in path.segments().iter().enumerate() {
        let mut next = Vec::new();
        if depth == 0 {
            let same_type: Vec<NodeId> = tree
                .roots()
                .iter()
                .copied()
                .filter(|&id| tree.node(id).box_type() == segment.box_type)
                .collect();
            for node in segment.select(&same_type) {
                next.push(BoxMatch {
                    node,
                    ancestors: Vec::new(),
                });
            }
        } else {
            for parent in &frontier {
                let same_type: Vec<NodeId> = tree
                    .children(parent.node)
                    .iter()
                    .copied()
                    .filter(|&id| tree.node(id).box_type() == segment.box_type)
                    .collect();
                for node in segment.select(&same_type) {
                    let mut ancestors = parent.ancestors.clone();
                    ancestors.push(parent.node);
                    next.push(BoxMatch { node, ancestors });
                }
            }
        }
        frontier = next;
        if frontier.is_empty() {
            break;
        }
    }

    frontier
}

/// Remove every box addressed by `path`.
///
/// Returns the edited bytes and the number of boxes removed. When nothing
/// matches the input is returned unchanged with a count of 0.
pub fn remove(data: &[u8], path: &BoxPath) -> Result<(Vec<u8>, usize)> {
    let tree = BoxTree::parse(data)?;
    let mut matches = locate(&tree, path);
    if matches.is_empty() {
        return Ok((data.to_vec(), 0));
    }

    // Last box first so earlier offsets stay valid.
    matches.sort_by_key(|m| std::cmp::Reverse(tree.node(m.node).offset()));

    let mut out = data.to_vec();
    for m in &matches {
        let node = tree.node(m.node);
        let start = node.offset() as usize;
        let end = start + node.size() as usize;
        out.drain(start..end);

        for &ancestor in m.ancestors.iter().rev() {
            shrink_size_field(&mut out, &tree, ancestor, node.size())?;
        }
        debug!("Removed {} ({} bytes) at offset {}", node.box_type(), node.size(), start);
    }

    Ok((out, matches.len()))
}

fn shrink_size_field(buf: &mut [u8], tree: &BoxTree, id: NodeId, by: u64) -> Result<()> {
    let header = &tree.node(id).header;
    let pos = header.offset as usize;
    match header.size_field {
        SizeField::Compact => {
            let current = u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]);
            let updated = (current as u64)
                .checked_sub(by)
                .filter(|&s| s >= header.header_size as u64)
                .ok_or_else(|| Error::invalid_box(format!("{} size underflow", header.box_type)))?;
            buf[pos..pos + 4].copy_from_slice(&(updated as u32).to_be_bytes());
        }
        SizeField::Extended => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf[pos + 8..pos + 16]);
            let updated = u64::from_be_bytes(raw)
                .checked_sub(by)
                .filter(|&s| s >= header.header_size as u64)
                .ok_or_else(|| Error::invalid_box(format!("{} size underflow", header.box_type)))?;
            buf[pos + 8..pos + 16].copy_from_slice(&updated.to_be_bytes());
        }
        // Implicit size follows the file length.
        SizeField::ToEnd => {}
    }
    Ok(())
}

/// Remove boxes from a file, writing the result to `output`.
///
/// `output` may equal `input` for an in-place edit; either way the
/// destination is replaced atomically. A missing input is treated as "no
/// match" and returns 0 without touching `output`.
pub fn remove_from_file(input: &Path, output: &Path, path: &BoxPath) -> Result<usize> {
    let data = match std::fs::read(input) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Box edit skipped, {} does not exist", input.display());
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let (edited, removed) = remove(&data, path)?;
    if removed == 0 && input == output {
        debug!("No {} boxes in {}", path, input.display());
        return Ok(0);
    }

    write_atomic(output, &edited)?;
    debug!(
        "Removed {} {} boxes: {} -> {}",
        removed,
        path,
        input.display(),
        output.display()
    );
    Ok(removed)
}
