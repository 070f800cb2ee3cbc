pub mod cache;
pub mod config;
pub mod ids;
pub mod memory;
pub mod overlay;
pub mod pipeline;
pub mod placeholder;
pub mod quest;
pub mod render;
pub mod resolve;
pub mod source;
pub mod synth;
