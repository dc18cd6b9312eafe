//! Arena-backed box tree.
//!
//! Nodes live in one `Vec` and refer to their children by index. There are
//! no parent links; callers that need ancestors collect them while walking
//! down (see [`super::locate`]).

use super::boxes::{BoxHeader, BoxType, SizeField};
use crate::error::{Error, Result};

/// Index of a node in a [`BoxTree`].
pub type NodeId = usize;

/// Deepest container nesting accepted before the input is rejected.
const MAX_DEPTH: usize = 32;

/// QuickTime writers close `udta` with a 32-bit zero.
const UDTA_TERMINATOR: [u8; 4] = [0; 4];

/// One box in the tree.
#[derive(Debug, Clone)]
pub struct BoxNode {
    pub header: BoxHeader,
    /// Child boxes, in file order. Always empty for leaf types.
    pub children: Vec<NodeId>,
    /// Bytes after the last child that are not a box.
    pub trailer: u64,
}

impl BoxNode {
    pub fn box_type(&self) -> BoxType {
        self.header.box_type
    }

    pub fn offset(&self) -> u64 {
        self.header.offset
    }

    pub fn size(&self) -> u64 {
        self.header.size
    }
}

/// Parsed box tree over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct BoxTree {
    nodes: Vec<BoxNode>,
    roots: Vec<NodeId>,
}

impl BoxTree {
    /// Parse every top-level box and descend into known containers.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut tree = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        };
        let (roots, _) = tree.parse_level(data, 0, data.len() as u64, 0, None)?;
        tree.roots = roots;
        Ok(tree)
    }

    /// Parse the boxes in `[start, end)`. Returns their ids and the length
    /// of an accepted trailer.
    fn parse_level(
        &mut self,
        data: &[u8],
        start: u64,
        end: u64,
        depth: usize,
        parent: Option<BoxType>,
    ) -> Result<(Vec<NodeId>, u64)> {
        if depth > MAX_DEPTH {
            return Err(Error::invalid_box(format!(
                "container nesting deeper than {} at offset {}",
                MAX_DEPTH, start
            )));
        }

        let mut ids = Vec::new();
        let mut pos = start;
        while pos < end {
            if parent == Some(BoxType::UDTA) && data[pos as usize..end as usize] == UDTA_TERMINATOR {
                return Ok((ids, end - pos));
            }
            let header = BoxHeader::parse(data, pos, end)?;
            if header.size_field == SizeField::ToEnd && depth > 0 {
                return Err(Error::invalid_box(format!(
                    "nested {} at offset {} uses size 0",
                    header.box_type, pos
                )));
            }

            let id = self.nodes.len();
            self.nodes.push(BoxNode {
                header,
                children: Vec::new(),
                trailer: 0,
            });

            if header.box_type.is_container() {
                let (children, trailer) = self.parse_level(
                    data,
                    header.payload_offset(),
                    header.end(),
                    depth + 1,
                    Some(header.box_type),
                )?;
                self.nodes[id].children = children;
                self.nodes[id].trailer = trailer;
            }

            ids.push(id);
            pos = header.end();
        }
        Ok((ids, 0))
    }

    pub fn node(&self, id: NodeId) -> &BoxNode {
        &self.nodes[id]
    }

    /// Top-level boxes in file order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Total number of parsed boxes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Payload bytes of a box (everything after its header).
    pub fn payload<'a>(&self, data: &'a [u8], id: NodeId) -> &'a [u8] {
        let header = &self.nodes[id].header;
        &data[header.payload_offset() as usize..header.end() as usize]
    }

    /// First direct child of `id` with the given type.
    pub fn find_child(&self, id: NodeId, box_type: BoxType) -> Option<NodeId> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].box_type() == box_type)
    }

    /// Verify every container's size equals its header plus its children.
    pub fn check_sizes(&self) -> Result<()> {
        for node in &self.nodes {
            if !node.box_type().is_container() {
                continue;
            }
            let children: u64 = node.children.iter().map(|&c| self.nodes[c].size()).sum();
            let expected = node.header.header_size as u64 + children + node.trailer;
            if node.size() != expected {
                return Err(Error::invalid_box(format!(
                    "{} at offset {} has size {} but header and children add up to {}",
                    node.box_type(),
                    node.offset(),
                    node.size(),
                    expected
                )));
            }
        }
        Ok(())
    }
}
