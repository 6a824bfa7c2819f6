//! Integration Tests für DeviceContext (Dispatch, Compositing, Persistenz)
//!
//! Diese Tests laufen auf dem Host (x86_64) und nutzen MockLedWriter + MemoryStore

mod common;

use common::{
    BLUE, GREEN, MemoryStore, MockLedWriter, OFF, RED, STRIP_LEN, device, device_with_store,
};
use effekt_core::manager::DEFAULT_BOOT_SCRIPT;
use effekt_core::storage::{RECORD_CAPACITY, encode_record};
use effekt_core::{
    ControlTopic, DispatchError, DispatchOutcome, InboundMessage, LoadOutcome, PixelBuffer,
    RangeError, RestoreOutcome, StatusCode, StoreError, SyntaxErrorKind,
};
use rgb::RGB8;

fn msg(topic: ControlTopic, payload: &str) -> InboundMessage {
    InboundMessage::new(topic, payload).unwrap()
}

// ============================================================================
// Tests: PixelBuffer
// ============================================================================

#[test]
fn test_brightness_range() {
    let mut buffer: PixelBuffer<_, 8> = PixelBuffer::new(MockLedWriter::new(), 8, 0.3);

    assert_eq!(buffer.set_brightness(1.5), Err(RangeError::Brightness));
    assert_eq!(buffer.brightness(), 0.3);
    assert_eq!(buffer.set_brightness(-0.1), Err(RangeError::Brightness));
    assert_eq!(buffer.brightness(), 0.3);
    assert_eq!(buffer.set_brightness(0.5), Ok(()));
    assert_eq!(buffer.brightness(), 0.5);
}

#[test]
fn test_length_change_preserves_colors() {
    let mut buffer: PixelBuffer<_, 8> = PixelBuffer::new(MockLedWriter::new(), 6, 1.0);
    buffer.fill(RED);

    assert_eq!(buffer.set_length(7), Err(RangeError::Length));
    assert_eq!(buffer.set_length(0), Err(RangeError::Length));
    buffer.set_length(3).unwrap();
    buffer.set_length(5).unwrap();
    assert_eq!(buffer.colors(), &[RED, RED, RED, OFF, OFF]);
}

#[test]
fn test_flush_scales_by_brightness() {
    let mut buffer: PixelBuffer<_, 2> = PixelBuffer::new(MockLedWriter::new(), 2, 0.5);
    buffer.fill(RGB8::new(200, 100, 0));
    assert_eq!(buffer.writer().write_count, 0);

    buffer.flush().unwrap();
    assert_eq!(buffer.writer().write_count, 1);
    assert_eq!(buffer.writer().last_frame, vec![RGB8::new(100, 50, 0); 2]);
}

#[test]
fn test_immediate_writer_pushes_every_change() {
    let mut led: PixelBuffer<_, 1> = PixelBuffer::new(MockLedWriter::immediate(), 1, 1.0);
    led.fill(BLUE);
    led.set_brightness(0.2).unwrap();
    assert_eq!(led.writer().write_count, 2);

    led.flush().unwrap();
    assert_eq!(led.writer().write_count, 2);
}

#[test]
fn test_flush_reports_write_failure() {
    let mut buffer: PixelBuffer<_, 2> = PixelBuffer::new(MockLedWriter::new(), 2, 1.0);
    buffer.writer_mut().fail_next_write = true;
    assert!(buffer.flush().is_err());
    assert!(buffer.flush().is_ok());
}

// ============================================================================
// Tests: Dispatch
// ============================================================================

#[test]
fn test_out_of_range_brightness_is_ignored() {
    let mut dev = device();
    assert_eq!(
        dev.dispatch(&msg(ControlTopic::Brightness, "1.5")),
        Err(DispatchError::Range(RangeError::Brightness))
    );
    assert_eq!(dev.strip().brightness(), 1.0);
    assert_eq!(
        dev.dispatch(&msg(ControlTopic::Brightness, " 0.25 ")),
        Ok(DispatchOutcome::Brightness(0.25))
    );
    assert_eq!(dev.strip().brightness(), 0.25);
}

#[test]
fn test_invalid_boot_script_keeps_previous_rendering() {
    let mut dev = device();
    dev.dispatch(&msg(ControlTopic::InitScript, "Fill #00FF00 1"))
        .unwrap();
    dev.render(1.0).unwrap();
    let before = dev.strip().colors().to_vec();

    let result = dev.dispatch(&msg(ControlTopic::InitScript, "Fill #00FF00"));
    match result {
        Err(DispatchError::Syntax(e)) => assert_eq!(e.kind, SyntaxErrorKind::MissingArgument),
        other => panic!("Expected syntax error, got {:?}", other),
    }

    dev.render(1.0).unwrap();
    assert_eq!(dev.strip().colors(), before.as_slice());
    assert_eq!(dev.boot().manager().source(), Some("Fill #00FF00 1"));
}

#[test]
fn test_bad_message_does_not_affect_batch() {
    let mut dev = device();
    let batch = [
        msg(ControlTopic::Length, "zwölf"),
        msg(ControlTopic::InitScript, "Fill #0000FF 1"),
        msg(ControlTopic::Brightness, "2"),
        msg(ControlTopic::Length, "10"),
    ];
    let results: Vec<_> = batch.iter().map(|m| dev.dispatch(m)).collect();

    assert!(results[0].is_err());
    assert!(results[1].is_ok());
    assert!(results[2].is_err());
    assert_eq!(results[3], Ok(DispatchOutcome::Length(10)));

    dev.render(0.0).unwrap();
    assert_eq!(dev.strip().colors(), &[BLUE; 10]);
    assert_eq!(dev.strip().writer().last_frame, vec![BLUE; 10]);
}

// ============================================================================
// Tests: Event Trigger + Compositing
// ============================================================================

#[test]
fn test_same_trigger_payload_fires_once() {
    let mut dev = device();
    dev.dispatch(&msg(ControlTopic::EventScript, "Fill #FF0000 1"))
        .unwrap();

    assert_eq!(
        dev.dispatch(&msg(ControlTopic::EventTrigger, "42")),
        Ok(DispatchOutcome::Triggered { started: true })
    );
    assert_eq!(
        dev.dispatch(&msg(ControlTopic::EventTrigger, "42")),
        Ok(DispatchOutcome::DuplicateTrigger)
    );
    assert_eq!(
        dev.dispatch(&msg(ControlTopic::EventTrigger, "43")),
        Ok(DispatchOutcome::Triggered { started: true })
    );
}

#[test]
fn test_trigger_without_event_script() {
    let mut dev = device();
    assert_eq!(
        dev.dispatch(&msg(ControlTopic::EventTrigger, "1")),
        Ok(DispatchOutcome::Triggered { started: false })
    );
    assert!(!dev.event_visible());
}

#[test]
fn test_event_overrides_boot_until_next_load() {
    let mut dev = device();
    dev.dispatch(&msg(ControlTopic::InitScript, "Fill #00FF00 1"))
        .unwrap();
    dev.dispatch(&msg(ControlTopic::EventScript, "Fill #FF0000 1"))
        .unwrap();

    // geladen aber nicht getriggert → Boot sichtbar
    dev.render(1.0).unwrap();
    assert_eq!(dev.strip().colors(), &[GREEN; STRIP_LEN]);

    dev.dispatch(&msg(ControlTopic::EventTrigger, "a")).unwrap();
    dev.render(1.0).unwrap();
    assert_eq!(dev.strip().colors(), &[RED; STRIP_LEN]);

    // Event ist fertig (Hold), bleibt aber sichtbar
    dev.render(1.0).unwrap();
    assert!(dev.event().manager().sequencer().is_finished());
    assert_eq!(dev.strip().colors(), &[RED; STRIP_LEN]);

    dev.dispatch(&msg(ControlTopic::InitScript, "Fill #0000FF 1"))
        .unwrap();
    dev.render(1.0).unwrap();
    assert_eq!(dev.strip().colors(), &[BLUE; STRIP_LEN]);
}

#[test]
fn test_retrigger_restarts_event_from_beginning() {
    let mut dev = device();
    dev.dispatch(&msg(ControlTopic::EventScript, "SlowFill 10 #FF0000 20"))
        .unwrap();
    dev.dispatch(&msg(ControlTopic::EventTrigger, "x")).unwrap();
    dev.render(5.0).unwrap();
    assert_eq!(dev.strip().colors()[9], RED);

    dev.dispatch(&msg(ControlTopic::EventTrigger, "y")).unwrap();
    dev.render(0.5).unwrap();
    assert_eq!(dev.strip().colors()[0], RED);
    assert_eq!(dev.strip().colors()[1], RED);
    // Frame bleibt beim Neustart erhalten, überblendet wird von der alten Farbe
    assert_eq!(dev.strip().colors()[9], RED);
}

#[test]
fn test_frame_is_flushed_once_per_render() {
    let mut dev = device();
    dev.restore();
    dev.render(1.0).unwrap();
    dev.render(1.0).unwrap();
    assert_eq!(dev.strip().writer().write_count, 2);
    assert_eq!(dev.strip().writer().last_frame, vec![OFF; STRIP_LEN]);
}

// ============================================================================
// Tests: Persistenz
// ============================================================================

#[test]
fn test_boot_script_survives_restart() {
    let mut dev = device();
    assert_eq!(
        dev.dispatch(&msg(ControlTopic::InitScript, "Fill #FF0000 2 #0000FF 2")),
        Ok(DispatchOutcome::BootScript(LoadOutcome::Loaded))
    );
    let data = dev.boot().store().data.clone();

    let mut restarted = device_with_store(MemoryStore {
        data,
        write_count: 0,
        fail_writes: false,
    });
    assert_eq!(restarted.restore(), RestoreOutcome::Persisted);
    assert_eq!(
        restarted.boot().manager().source(),
        Some("Fill #FF0000 2 #0000FF 2")
    );

    // identisches Skript nach Neustart → kein erneuter Flash-Write
    assert_eq!(
        restarted.dispatch(&msg(ControlTopic::InitScript, "Fill #FF0000 2 #0000FF 2")),
        Ok(DispatchOutcome::BootScript(LoadOutcome::Unchanged))
    );
    assert_eq!(restarted.boot().store().write_count, 0);

    restarted.render(0.0).unwrap();
    assert_eq!(&restarted.strip().colors()[..4], &[RED, RED, BLUE, BLUE]);
}

#[test]
fn test_corrupt_store_falls_back_to_default() {
    let mut store = MemoryStore::erased();
    let mut raw = [0u8; RECORD_CAPACITY];
    let n = encode_record("Fill #FF0000 1", &mut raw).unwrap();
    raw[n - 1] ^= 0x40;
    store.data[..n].copy_from_slice(&raw[..n]);

    let mut dev = device_with_store(store);
    assert_eq!(dev.restore(), RestoreOutcome::Default(StoreError::Corrupt));
    assert_eq!(dev.boot().manager().source(), Some(DEFAULT_BOOT_SCRIPT));
}

#[test]
fn test_stored_garbage_script_falls_back_to_default() {
    let mut store = MemoryStore::erased();
    let mut raw = [0u8; RECORD_CAPACITY];
    let n = encode_record("Blink 3", &mut raw).unwrap();
    store.data[..n].copy_from_slice(&raw[..n]);

    let mut dev = device_with_store(store);
    assert_eq!(dev.restore(), RestoreOutcome::Default(StoreError::Corrupt));
}

#[test]
fn test_storage_failure_is_reported() {
    let mut store = MemoryStore::erased();
    store.fail_writes = true;
    let mut dev = device_with_store(store);

    assert_eq!(
        dev.dispatch(&msg(ControlTopic::InitScript, "Fill #00FF00 1")),
        Err(DispatchError::Storage(StoreError::Driver))
    );
    dev.render(0.0).unwrap();
    assert_eq!(dev.strip().colors()[0], GREEN);
}

// ============================================================================
// Tests: Status-LED
// ============================================================================

#[test]
fn test_status_heartbeat_on_status_led() {
    let mut dev = device();
    dev.set_status(StatusCode::LinkFailed);

    dev.update_status(0).unwrap();
    let led = dev.status_led().unwrap();
    assert_eq!(led.colors(), &[RED]);
    assert_eq!(led.writer().last_frame, vec![RGB8::new(26, 0, 0)]);

    dev.update_status(600).unwrap();
    let led = dev.status_led().unwrap();
    assert_eq!(led.brightness(), 0.05);
    assert_eq!(led.writer().last_frame, vec![RGB8::new(13, 0, 0)]);
}

#[test]
fn test_shared_status_led_leaves_strip_alone() {
    use effekt_core::{DeviceContext, LoopPolicy};

    let mut dev: DeviceContext<MockLedWriter, MockLedWriter, MemoryStore, 1> = DeviceContext::new(
        PixelBuffer::new(MockLedWriter::immediate(), 1, 1.0),
        None,
        MemoryStore::erased(),
        LoopPolicy::Hold,
    );
    dev.dispatch(&msg(ControlTopic::InitScript, "Fill #0000FF 1"))
        .unwrap();
    dev.render(0.0).unwrap();

    dev.set_status(StatusCode::BrokerFailed);
    dev.update_status(0).unwrap();
    assert_eq!(dev.strip().colors(), &[BLUE]);
}
