//! Integration tests for the control pipeline.
//!
//! These exercise the full public API: a client writes a textual
//! command to the control socket, the listener drains and parses it,
//! the universe patches its frame, and the transmitter clocks the
//! patched frame out of a recording backend.

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

use dmx_gpio::{GpioBackend, GpioError, Level};
use dmxd::frame::{BREAK_BITS, MAB_BITS, SLOT_BITS};
use dmxd::{CommandListener, StepClock, Transmitter, Universe};

fn test_socket_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("dmxd-it-{}-{tag}.sock", std::process::id()))
}

/// Poll until the client's connection is serviced.
fn poll_until_client(listener: &CommandListener, universe: &mut Universe) -> usize {
    for _ in 0..200 {
        match listener.poll(universe) {
            Ok(Some(n)) => return n,
            Ok(None) => std::thread::sleep(Duration::from_millis(1)),
            Err(e) => panic!("poll failed: {e}"),
        }
    }
    panic!("no client accepted");
}

/// Backend recording every level transition written to the pin.
#[derive(Default)]
struct RecordingGpio {
    writes: Vec<Level>,
}

impl GpioBackend for RecordingGpio {
    fn name(&self) -> &'static str {
        "recording"
    }
    fn init(&mut self) -> Result<(), GpioError> {
        Ok(())
    }
    fn set_output(&mut self, _pin: u8) -> Result<(), GpioError> {
        Ok(())
    }
    fn write(&mut self, _pin: u8, level: Level) {
        self.writes.push(level);
    }
}

// ── Socket → universe → frame ──

#[test]
fn command_patches_universe_through_socket() {
    let path = test_socket_path("pipeline");
    let listener = CommandListener::bind(&path).unwrap();
    let mut universe = Universe::new(4);

    let mut client = UnixStream::connect(&path).unwrap();
    client.write_all(b"1:255,2:128").unwrap();
    drop(client);

    let applied = poll_until_client(&listener, &mut universe);
    assert_eq!(applied, 2);

    // Table and frame agree on [255, 128, 0, 0].
    assert_eq!(universe.table().values(), &[255, 128, 0, 0]);
    assert_eq!(universe.frame().decode_channel(0).unwrap(), 255);
    assert_eq!(universe.frame().decode_channel(1).unwrap(), 128);
    assert_eq!(universe.frame().decode_channel(2).unwrap(), 0);
    assert_eq!(universe.frame().decode_channel(3).unwrap(), 0);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn sequential_clients_accumulate_state() {
    let path = test_socket_path("sequential");
    let listener = CommandListener::bind(&path).unwrap();
    let mut universe = Universe::new(4);

    for command in [&b"1:10"[..], b"2:20", b"1:30"] {
        let mut client = UnixStream::connect(&path).unwrap();
        client.write_all(command).unwrap();
        drop(client);
        poll_until_client(&listener, &mut universe);
    }

    // Later writes overwrite, untouched channels persist.
    assert_eq!(universe.table().values(), &[30, 20, 0, 0]);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn rejected_command_leaves_frame_intact() {
    let path = test_socket_path("reject");
    let listener = CommandListener::bind(&path).unwrap();
    let mut universe = Universe::new(4);

    let mut client = UnixStream::connect(&path).unwrap();
    client.write_all(b"1:10").unwrap();
    drop(client);
    poll_until_client(&listener, &mut universe);
    let before = universe.frame().clone();

    // Channel 9 does not exist in a 4-channel universe.
    let mut client = UnixStream::connect(&path).unwrap();
    client.write_all(b"2:20,9:1").unwrap();
    drop(client);
    for _ in 0..200 {
        match listener.poll(&mut universe) {
            Ok(Some(_)) => panic!("invalid command was applied"),
            Ok(None) => std::thread::sleep(Duration::from_millis(1)),
            Err(_) => break,
        }
    }

    assert_eq!(universe.frame(), &before);
    assert_eq!(universe.table().values(), &[10, 0, 0, 0]);

    let _ = std::fs::remove_file(&path);
}

// ── Frame → wire ──

#[test]
fn patched_frame_transmits_with_correct_structure() {
    let mut universe = Universe::new(2);
    universe.apply_command(&[(1, 0b0000_0001), (2, 0b1000_0000)]).unwrap();

    let tx = Transmitter::with_clock(5, StepClock::new(1));
    let mut gpio = RecordingGpio::default();
    assert_eq!(tx.send_frame(&mut gpio, universe.frame()), 0);

    // The write log collapsed consecutive repeats; rebuild the same
    // collapse from the frame and compare.
    let mut expected = Vec::new();
    for &bit in universe.frame().bits() {
        if expected.last() != Some(&bit) {
            expected.push(bit);
        }
    }
    assert_eq!(gpio.writes, expected);

    // Frame geometry: break, mark-after-break, two 11-bit slots.
    assert_eq!(
        universe.frame().len(),
        BREAK_BITS + MAB_BITS + 2 * SLOT_BITS
    );
    assert!(universe.frame().bits()[..BREAK_BITS]
        .iter()
        .all(|&b| b == Level::Low));
}
