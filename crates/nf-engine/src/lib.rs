//! nf-engine: Real-time engine for NoiseForge
//!
//! Binds the DSP kernels into the track/chain/mix data model:
//!
//! - `chain` - Ordered spectral filter chains with composite-mask publication
//! - `track` - Noise source + chain + gain/mute, split across threads
//! - `bus` - Fixed-order summing mix bus with pre-master analyzer tap
//! - `engine` - Audio-processor / controller pair and wiring
//! - `command` - Control→audio commands and the host config channel
//! - `event` - Closed event enum over a multi-consumer channel
//!
//! ## Threading
//!
//! The [`engine::AudioProcessor`] runs on the audio-priority thread and
//! never allocates, locks, or performs I/O after construction. The
//! [`engine::EngineController`] owns all configuration mutation on the
//! control thread; the two communicate over SPSC rings and atomically
//! published masks only.

pub mod bus;
pub mod chain;
pub mod command;
pub mod engine;
pub mod event;
pub mod track;

pub use chain::{FilterChain, FilterInstance};
pub use command::{ConfigRequest, ConfigResponse, FftInfo, PerformanceInfo};
pub use engine::{AnalyzerTap, AudioProcessor, EngineController, NoiseEngine};
pub use event::{Diagnostic, EngineEvent, EventBus};
pub use track::{TrackCtl, TrackDsp};
