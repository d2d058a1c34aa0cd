//! Types shared with the windowing collaborator: what it reports about windows
//! and desktops, and the rectangles handed back to it.

pub mod geometry;
pub mod window;
