pub mod audio;
pub mod playback;
pub mod storage;
pub mod synth;
pub mod types;
pub mod voice;

pub use audio::*;
pub use playback::*;
pub use storage::*;
pub use synth::*;
pub use types::*;
pub use voice::*;
