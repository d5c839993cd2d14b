#![forbid(unsafe_code)]

pub mod augment;
pub mod builder;
pub mod features;
pub mod pipeline;

pub use augment::{Augmenter, RegionTransform};
pub use builder::{point_weights, stack_batch_inds, Hierarchy, Layer, MultiResolutionNeighborBuilder};
pub use features::{color_mask, compose, Features};
pub use pipeline::{InputPipeline, ModelInputs};
