//! The musical-clock input adapter (`SPEC_FULL.md` §6, contract 2): binds to
//! a MIDI input port and turns its real-time byte stream into the two rings
//! [`ControlThread`](crate::control::ControlThread) drains — pulse
//! timestamps on `clock_queue`, transport events on `event_queue`.
//!
//! Grounded on the reference engine's `app/midi/sender.rs` (`MIDISender`):
//! same port-binding style (bind-first-available vs. bind-by-substring,
//! `Box<dyn Error>` for connection failures), turned around from sending to
//! receiving. MIDI realtime bytes are single-byte system messages, so unlike
//! `MIDISender` there is no `MIDIMessage` payload to build — only the status
//! byte itself is examined.

use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use std::error::Error;
use std::sync::Arc;

use crate::util::ring::SpscRing;

/// MIDI Timing Clock: one pulse per 1/24 of a quarter note (spec's PPQN).
const TIMING_CLOCK: u8 = 0xF8;
/// MIDI Start: begin playback from the top.
const START: u8 = 0xFA;
/// MIDI Continue: resume playback from wherever it was stopped.
const CONTINUE: u8 = 0xFB;
/// MIDI Stop.
const STOP: u8 = 0xFC;

/// Encodes a [`TransportEvent`](crate::external::TransportEvent) onto the
/// `u32` event ring: `0` = Start, `1` = Stop, anything else = Continue,
/// matching `ControlThread::drain_event_queue`'s decode.
const EVENT_START: u32 = 0;
const EVENT_STOP: u32 = 1;
const EVENT_CONTINUE: u32 = 2;

/// Binds one MIDI input port and forwards its realtime clock/transport bytes
/// onto a pair of SPSC rings. Held for its lifetime; dropping it closes the
/// port.
pub struct MidiClockInput {
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl MidiClockInput {
    /// Binds to the first available MIDI input port.
    ///
    /// # Errors
    ///
    /// Returns an error if no MIDI input could be created or no port was
    /// found.
    pub fn new(
        name: &str,
        clock_queue: Arc<SpscRing<u32>>,
        event_queue: Arc<SpscRing<u32>>,
    ) -> Result<Self, Box<dyn Error>> {
        let input = MidiInput::new(name)?;

        if input.port_count() == 0 {
            return Err("no MIDI ports were found".into());
        }

        let mut ports = input.ports();
        let first_port = ports.remove(0);

        Self::connect(input, &first_port, name, clock_queue, event_queue)
    }

    /// Binds to the first port whose name contains `port_substring`
    /// (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if no MIDI input could be created, no port was
    /// found, or no port name matched the substring.
    pub fn new_with_port_containing(
        name: &str,
        port_substring: &str,
        clock_queue: Arc<SpscRing<u32>>,
        event_queue: Arc<SpscRing<u32>>,
    ) -> Result<Self, Box<dyn Error>> {
        let s = port_substring.to_lowercase();
        let input = MidiInput::new(name)?;

        if input.port_count() == 0 {
            return Err("no MIDI ports were found".into());
        }

        let mut found = None;
        for p in input.ports() {
            if let Ok(port_name) = input.port_name(&p)
                && port_name.to_lowercase().contains(&s)
            {
                found = Some(p);
                break;
            }
        }

        let Some(port) = found else {
            return Err(format!(
                "no MIDI port contained the provided substring \"{s}\""
            )
            .into());
        };

        Self::connect(input, &port, name, clock_queue, event_queue)
    }

    fn connect(
        input: MidiInput,
        port: &MidiInputPort,
        name: &str,
        clock_queue: Arc<SpscRing<u32>>,
        event_queue: Arc<SpscRing<u32>>,
    ) -> Result<Self, Box<dyn Error>> {
        let port_name =
            input.port_name(port).unwrap_or_else(|_| String::from("UNKNOWN"));
        let conn_name = format!("{name}_port");

        let connection = input
            .connect(
                port,
                &conn_name,
                move |timestamp_micros, message, _| {
                    handle_message(timestamp_micros, message, &clock_queue, &event_queue);
                },
                (),
            )
            .map_err(|e| e.to_string())?;

        Ok(Self { _connection: connection, port_name })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn close(self) {
        _ = self._connection.close();
    }
}

/// Runs on `midir`'s background input thread, not the audio interrupt — the
/// push targets are lock-free SPSC rings, so this never blocks on the
/// control thread.
fn handle_message(
    timestamp_micros: u64,
    message: &[u8],
    clock_queue: &Arc<SpscRing<u32>>,
    event_queue: &Arc<SpscRing<u32>>,
) {
    let Some(&status) = message.first() else { return };

    match status {
        TIMING_CLOCK => {
            clock_queue.push(timestamp_micros as u32);
        }
        START => {
            event_queue.push(EVENT_START);
        }
        STOP => {
            event_queue.push(EVENT_STOP);
        }
        CONTINUE => {
            event_queue.push(EVENT_CONTINUE);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_clock_byte_pushes_a_timestamp() {
        let clock_queue = Arc::new(SpscRing::new(16));
        let event_queue = Arc::new(SpscRing::new(16));
        handle_message(1_000, &[TIMING_CLOCK], &clock_queue, &event_queue);
        assert_eq!(clock_queue.pop(), Some(1_000));
        assert_eq!(event_queue.pop(), None);
    }

    #[test]
    fn transport_bytes_push_the_matching_event_code() {
        let clock_queue = Arc::new(SpscRing::new(16));
        let event_queue = Arc::new(SpscRing::new(16));

        handle_message(0, &[START], &clock_queue, &event_queue);
        assert_eq!(event_queue.pop(), Some(EVENT_START));

        handle_message(0, &[STOP], &clock_queue, &event_queue);
        assert_eq!(event_queue.pop(), Some(EVENT_STOP));

        handle_message(0, &[CONTINUE], &clock_queue, &event_queue);
        assert_eq!(event_queue.pop(), Some(EVENT_CONTINUE));
    }

    #[test]
    fn unrecognized_status_bytes_are_ignored() {
        let clock_queue = Arc::new(SpscRing::new(16));
        let event_queue = Arc::new(SpscRing::new(16));
        handle_message(0, &[0x90, 60, 127], &clock_queue, &event_queue);
        assert_eq!(clock_queue.pop(), None);
        assert_eq!(event_queue.pop(), None);
    }
}
