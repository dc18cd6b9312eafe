//! ISO-BMFF box tree editing.
//!
//! The editor parses a file into an arena tree, addresses boxes with a
//! [`BoxPath`] and splices matched boxes out while patching every ancestor's
//! size field.
//!
//! ```
//! use dasher_media::mp4::{remove, BoxPath};
//!
//! // An ftyp box alone: nothing to strip.
//! let data = [0, 0, 0, 12, b'f', b't', b'y', b'p', b'i', b's', b'o', b'6'];
//! let path: BoxPath = "moov/pssh[*]".parse().unwrap();
//! let (out, removed) = remove(&data, &path).unwrap();
//! assert_eq!(removed, 0);
//! assert_eq!(out, data);
//! ```

mod boxes;
mod editor;
mod path;
mod tree;

pub use boxes::{BoxHeader, BoxType, SizeField};
pub use editor::{locate, remove, remove_from_file, BoxMatch};
pub use path::{BoxPath, PathSegment, Selector};
pub use tree::{BoxNode, BoxTree, NodeId};
