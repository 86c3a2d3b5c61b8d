//! Render targets and the staging that hands completed blocks to a diagram renderer.

pub mod node;
pub mod staging;

pub use node::{NodeId, RenderNode, RenderRegion, RenderTarget};
pub use staging::{
    InlineExecutor, RenderExecutor, RenderJob, RenderStaging, StageState, ThreadExecutor,
    PLACEHOLDER,
};
