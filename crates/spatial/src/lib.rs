#![forbid(unsafe_code)]

pub mod grid;
pub mod kdtree;
pub mod neighbors;

pub use grid::{batch_grid_subsample, grid_subsample};
pub use kdtree::KdTree;
pub use neighbors::{batch_neighbors, NeighborMatrix};
