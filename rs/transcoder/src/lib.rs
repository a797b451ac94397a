//! # transcoder: the synchronization core of a hardware video transcoder
//!
//! Decoding, rendering and encoding run in lockstep, one frame at a time:
//!
//! - [VideoDecoder] releases a frame into a surface and announces it through a [FrameProducer].
//! - [FrameBridge] waits for that announcement and draws the frame with a [RenderStrategy].
//! - [VideoEncoder] encodes whatever was drawn.
//!
//! A job is one end-to-end transcode.
//! [RetryExecutor] runs a job, asking an [OptionFactory] for fresh options before each attempt
//! and retrying recoverable failures.
//! [JobScheduler] runs one job at a time on its own thread and cancels it on request, waking a
//! blocked frame wait if asked to interrupt.
//!
//! The output geometry is decided by a [Resizer], and a [Validator] may skip the job entirely
//! when the output would match the input.
//!
//! Every job ends with exactly one [Listener] callback: completed, failed or cancelled.

mod bridge;
mod cancel;
mod codec;
mod error;
mod listener;
mod option;
mod pipeline;
mod render;
mod resize;
mod retry;
mod scheduler;
mod size;
mod validator;

pub use bridge::*;
pub use cancel::*;
pub use codec::*;
pub use error::*;
pub use listener::*;
pub use option::*;
pub use pipeline::*;
pub use render::*;
pub use resize::*;
pub use retry::*;
pub use scheduler::*;
pub use size::*;
pub use validator::*;
