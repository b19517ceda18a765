pub mod orchestrator;
pub mod second_channel;
pub mod writer;

pub use orchestrator::{align_channel, AlignParams};
pub use second_channel::{align_data_channel, ChannelParams};
pub use writer::{write_output, WriteJob};
