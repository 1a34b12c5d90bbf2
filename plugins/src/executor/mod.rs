pub mod renderers;

pub use renderers::{JsonlRendererPlugin, ProgressRendererPlugin, TextRendererPlugin};
