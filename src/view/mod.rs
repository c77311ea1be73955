// VIEW: Rendering and graphics
pub mod render;
pub mod gpu_init;

pub use render::{Renderer, UiFrame};
pub use gpu_init::GpuContext;
