//! Timed, cancellable replay of simulation frames.

mod observer;
mod scheduler;

pub use observer::{
    ChannelObserver, FrameUpdate, NoopObserver, ReplayCancelledInfo, ReplayCompletion, ReplayEvent, ReplayObserver,
    ReplayStream, ReplayWarning,
};
pub use scheduler::{ReplayHandle, ReplayRequest, ReplayScheduler};
