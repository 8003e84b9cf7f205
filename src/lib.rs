#![allow(
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::return_self_not_must_use,
    clippy::redundant_closure_for_method_calls
)]

// Control-thread subsystems: the effect controllers, display manager, and
// preset controller.
pub mod control;

// Signal processing: the effect trait, the three performer effects, and the
// registry that chains them.
pub mod dsp;

// The audio-interrupt entry point: wires the block allocator, the
// timekeeper, and the effect registry into the hard-real-time block loop.
pub mod engine;

// Typed error enums for the control-thread-facing subsystems.
pub mod error;

// Contract traits for the engine's external collaborators (block allocator,
// musical-clock input, button/LED/display I/O, file store).
pub mod external;

// The MIDI clock-input adapter: binds a port, forwards realtime clock and
// transport bytes onto the control thread's rings.
pub mod midi_clock;

// Program-wide constants and startup configuration.
pub mod settings;

// The process-wide musical time authority.
pub mod time_base;

// General utilities: atomic shorthand, the lock-free SPSC ring, the
// periodic-callback timer thread.
pub mod util;

// Widely-used re-exports.
pub mod prelude;

// In-memory block-allocator and file-store stand-ins, used by this crate's
// own tests and available to downstream integration tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
