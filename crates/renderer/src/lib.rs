//! Renderer crate for the backdrop shader background.
//!
//! The crate turns the registry's WebGL-1 style fragment shaders into running
//! GPU programs and keeps them fed with time, resolution, pointer and scroll
//! derived presentation values. The overall flow is:
//!
//! ```text
//!   scroll / pointer events
//!          │
//!          ▼
//!   BackdropScene ──▶ ScrollController ──▶ PresentationAnimator
//!          │                                      │ Presentation
//!          ▼                                      ▼
//!   ShaderCanvas ──▶ RenderSession ──▶ RenderLoop ◀── FrameQueue (host)
//!                         │
//!                         └─▶ CompiledProgram ──▶ GraphicsContext (wgpu / fake)
//! ```
//!
//! Every canvas owns at most one session, every session one compiled program
//! and one loop. The host drains a [`scheduler::FrameQueue`] once per
//! displayed frame; that is the only clock the loops see. GPU access goes
//! through the [`gpu::GraphicsContext`] seam so the whole lifecycle is
//! testable without a device.

pub mod canvas;
pub mod compile;
pub mod driver;
pub mod error;
pub mod export;
pub mod gpu;
pub mod scene;
pub mod scroll;
pub mod selector;
pub mod session;
pub mod timeline;
pub mod types;
mod window;

pub use canvas::{CanvasProps, CanvasStatus, PointerTracker, ShaderCanvas};
pub use compile::{compile, CompiledProgram, UniformSlots, QUAD_VERTICES};
pub use driver::{RenderLoop, Tick};
pub use error::{CompileError, CompileStage, RenderError};
pub use export::{export_thumbnails, ExportOptions};
pub use scene::BackdropScene;
pub use scroll::{scroll_progress, section_index, ScrollController, ScrollMetrics, ScrollModel, ScrollState};
pub use selector::{SelectionChange, ShaderSelector, Thumbnail};
pub use session::{FrameInputs, RenderSession};
pub use timeline::{Easing, PresentationAnimator, Transition};
pub use types::{PixelSize, PointerState, Presentation, Tint};
pub use window::{run_preview, PreviewOptions};
