pub mod common;
pub mod layout_engine;
pub mod model;
pub mod sys;

pub use common::config::{Config, LayoutSettings};
pub use common::error::{Entity, Result, TilingError};
pub use model::{NodeId, Workspace};
