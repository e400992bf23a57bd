pub mod app;
pub mod audio_graph;
pub mod audio_params;
pub mod ipc;
pub mod mute;
pub mod playback_engine;
pub mod scheduler;
pub mod sounding;
pub mod transport;

pub use app::*;
pub use audio_graph::*;
pub use audio_params::*;
pub use ipc::*;
pub use mute::*;
pub use playback_engine::*;
pub use scheduler::*;
pub use sounding::*;
pub use transport::*;
