pub mod flex;
pub(crate) mod graph;
pub mod partition;
pub mod resize;
pub mod systems;
pub mod tiling;
pub mod utils;

pub use flex::{Flex, FlexItem};
pub use graph::{Direction, Orientation};
pub use partition::Partition;
pub use resize::{ResizeDirection, WeightDirection};
pub use systems::{Arrangement, ArrangementKind, GridArrangement, RatioArrangement};
pub use tiling::DropTarget;
