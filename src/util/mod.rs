//! Global utility functions — these are publicly re-exported in `prelude.rs`.

pub mod atomic_ops;
pub mod ring;
pub mod timer;

pub use atomic_ops::AtomicOps;
pub use ring::SpscRing;
pub use timer::TimerThread;
