//! Renderer plugins for `dagrun-core` execution events.

pub mod executor;
pub mod factory;

pub use executor::{JsonlRendererPlugin, ProgressRendererPlugin, TextRendererPlugin};
pub use factory::build_renderer;
