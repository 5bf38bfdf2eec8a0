//! Streaming PDF generation
//!
//! - `layout`: fixed page geometry (A4, two records per page)
//! - `writer`: incremental object-level PDF emitter
//! - `render`: the warm/render pipeline driving the QR cache and progress

pub mod layout;
pub mod render;
pub mod writer;

pub use render::{render_document, warm_cache, ChannelWriter, RenderJob, WARM_BATCH_SIZE};
