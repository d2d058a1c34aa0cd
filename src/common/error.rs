use std::fmt;

use thiserror::Error;

use crate::model::tree::NodeId;
use crate::sys::window::{DesktopId, WindowId};

/// Something a workspace operation can refer to by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Window(WindowId),
    Desktop(DesktopId),
    Node(NodeId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Window(wid) => write!(f, "window {}", wid.get()),
            Entity::Desktop(desktop) => write!(f, "desktop {}", desktop.get()),
            Entity::Node(node) => write!(f, "node {node:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TilingError {
    /// A Flex bound or container size cannot be honoured. The allocator state
    /// is unchanged; retrying with other parameters is safe.
    #[error("unsatisfiable constraints: {0}")]
    UnsatisfiableConstraints(String),
    /// The operation does not apply right now (no neighbour in that
    /// direction, nothing under the drop point, layout not computed).
    #[error("tiling operation not possible: {0}")]
    TilingOperationFailed(String),
    #[error("{0} is already registered")]
    DuplicateRegistration(Entity),
    #[error("{0} is not registered")]
    NotRegistered(Entity),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Internal bookkeeping went out of tolerance. Indicates a bug.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T, E = TilingError> = std::result::Result<T, E>;
