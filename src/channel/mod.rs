//! Run channels and the registry that hands them out.

mod convert;
pub mod polling;
pub mod registry;
pub mod run_channel;

pub use polling::RunPollingOptions;
pub use registry::ChannelRegistry;
pub use run_channel::RunChannel;
