pub mod tree;
pub mod workspace;

pub use tree::{Extents, Forest, Node, NodeId, NodeKind};
pub use workspace::{TilingTree, Workspace};
