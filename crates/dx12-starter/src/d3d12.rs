pub mod backend;
pub mod device;

pub mod barrier;
pub mod command;
pub mod pipeline;
pub mod pix;
pub mod resource;
pub mod scene;
pub mod shader;
pub mod swap_chain;
pub mod util;

pub use backend::{create_renderer, D3d12, Renderer};
