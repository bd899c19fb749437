//! nf-offline: Offline rendering pipeline for NoiseForge
//!
//! Renders arbitrary-duration mixes from immutable engine snapshots:
//!
//! - `render` - Direct and chunked bulk-FFT synthesis with mode selection
//! - `worker` - Chunk worker pool with retries and cooperative cancel
//! - `post` - Fades, peak normalization, clip sequencing
//! - `export` - Clip-plan orchestration over the renderer
//! - `wav` / `cheader` - Byte-buffer serialization (no filesystem writes)
//! - `progress` - Phase/percentage reporting with advisory cancellation

pub mod cheader;
pub mod export;
pub mod post;
pub mod progress;
pub mod render;
pub mod wav;

mod worker;

pub use cheader::{emit_c_header, include_guard};
pub use export::{ExportResult, Exporter};
pub use post::{apply_fades, fade_envelope, normalize_peak, post_process, sequence_clips};
pub use progress::{ProgressFn, RenderPhase, RenderProgress};
pub use render::{
    ChunkBlend, OfflineRenderer, RenderMode, RenderOptions, CHUNK_SECONDS_PARALLEL,
    CHUNK_SECONDS_SEQUENTIAL,
};
pub use wav::{encode_wav, sample_to_i16};
