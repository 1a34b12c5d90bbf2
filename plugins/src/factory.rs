use std::sync::Arc;

use dagrun_core::api::{OutputConfig, OutputRendererPlugin};

use crate::executor::{JsonlRendererPlugin, ProgressRendererPlugin, TextRendererPlugin};

/// Renderer for `cfg.format`, or `None` to leave lifecycle events to `tracing`.
pub fn build_renderer(cfg: &OutputConfig) -> Option<Arc<dyn OutputRendererPlugin>> {
    match cfg.format.trim().to_ascii_lowercase().as_str() {
        "text" => Some(Arc::new(TextRendererPlugin::new(cfg.ascii_only))),
        "jsonl" => Some(Arc::new(JsonlRendererPlugin::new(false))),
        "progress" => Some(Arc::new(ProgressRendererPlugin::new(cfg.ascii_only))),
        "none" | "" => None,
        other => {
            tracing::warn!(format = %other, "unknown output format; falling back to tracing");
            None
        }
    }
}
