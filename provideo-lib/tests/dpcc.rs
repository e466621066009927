//! DPCC family against a simulated device.

mod common;

use common::*;
use provideo_lib::family::dpcc::{DpccMode, DpccPixel, DpccTestMode};
use provideo_lib::reassembly::Completion;

#[test]
fn test_level_round_trip() {
    let device = SimulatedDevice::new();
    let (connection, _) = device.connection();
    let instance = connection.open_instance("test");
    let dpcc = instance.dpcc();

    for level in [0u8, 1, 7, 50, 99, 100] {
        dpcc.set_level(level).unwrap();
        assert_eq!(dpcc.get_level().unwrap(), level, "level {level}");
    }
}

#[test]
fn test_enable_mode_and_test_mode_round_trip() {
    let device = SimulatedDevice::new();
    let (connection, sent) = device.connection();
    let instance = connection.open_instance("test");
    let dpcc = instance.dpcc();

    for enable in [true, false] {
        dpcc.set_enable(enable).unwrap();
        assert_eq!(dpcc.get_enable().unwrap(), enable);
    }
    for mode in [DpccMode::Fixed, DpccMode::Dynamic, DpccMode::Combined] {
        dpcc.set_mode(mode).unwrap();
        assert_eq!(dpcc.get_mode().unwrap(), mode);
    }
    for mode in [DpccTestMode::Off, DpccTestMode::MarkCorrected, DpccTestMode::MarkTable] {
        dpcc.set_test_mode(mode).unwrap();
        assert_eq!(dpcc.get_test_mode().unwrap(), mode);
    }
    assert!(sent.lines().contains(&"dpc_mode 2".to_string()));
}

#[test]
fn test_out_of_range_level_keeps_device_state() {
    let device = SimulatedDevice::new();
    device.set("dpc_level", &[12]);
    let (connection, _) = device.connection();
    let instance = connection.open_instance("test");

    let err = instance.dpcc().set_level(200).unwrap_err();
    assert!(err.code() < 0);
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(instance.dpcc().get_level().unwrap(), 12);
}

#[test]
fn test_unknown_mode_is_protocol_error() {
    let (connection, _) = replying(["dpc_mode 9\nOK\n"]);
    let instance = connection.open_instance("test");

    assert!(matches!(instance.dpcc().get_mode(), Err(Error::Protocol(_))));
}

#[test]
fn test_table_split_across_reads() {
    let (connection, _) = replying(["dpc_add_px 1", "0 20\ndpc_add", "_px 30 40\nO", "K\n"]);
    let instance = connection.open_instance("test");

    let table = instance.dpcc().get_table().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.records(), &[DpccPixel::new(10, 20), DpccPixel::new(30, 40)]);
    assert_eq!(table.completion(), Completion::Terminated);
}

#[test]
fn test_empty_table() {
    let (connection, _) = replying(["OK\n"]);
    let instance = connection.open_instance("test");

    let table = instance.dpcc().get_table().unwrap();
    assert!(table.is_empty());
    assert_eq!(table.capacity(), provideo_lib::family::dpcc::MAX_PIXELS);
}

#[test]
fn test_set_table_replaces_device_table() {
    let device = SimulatedDevice::new();
    device.state().pixels = vec![(1, 1), (2, 2), (3, 3)];
    let (connection, sent) = device.connection();
    let instance = connection.open_instance("test");

    instance.dpcc().set_table(&[10, 30], &[20, 40]).unwrap();

    assert_eq!(device.state().pixels, vec![(10, 20), (30, 40)]);
    assert_eq!(sent.lines(), vec!["dpc_clear", "dpc_add_px 10 20", "dpc_add_px 30 40"]);

    let table = instance.dpcc().get_table().unwrap();
    assert_eq!(table.records(), &[DpccPixel::new(10, 20), DpccPixel::new(30, 40)]);
}

#[test]
fn test_set_pixels() {
    let device = SimulatedDevice::new();
    let (connection, _) = device.connection();
    let instance = connection.open_instance("test");

    let pixels = [DpccPixel::new(5, 6), DpccPixel::new(7, 8)];
    instance.dpcc().set_pixels(&pixels).unwrap();
    assert_eq!(instance.dpcc().get_table().unwrap().into_records(), pixels.to_vec());
}

#[test]
fn test_set_table_length_mismatch_is_silent_no_op() {
    let device = SimulatedDevice::new();
    device.state().pixels = vec![(1, 1)];
    let (connection, sent) = device.connection();
    let instance = connection.open_instance("test");

    instance.dpcc().set_table(&[10, 30], &[20]).unwrap();

    assert!(sent.lines().is_empty());
    assert_eq!(device.state().pixels, vec![(1, 1)]);
}

#[test]
fn test_set_table_stops_at_first_failure() {
    let channel = ScriptedChannel::new(|line| match line {
        "dpc_add_px 2 2" => vec![b"FAIL table full\n".to_vec()],
        _ => vec![b"OK\n".to_vec()],
    });
    let sent = channel.sent_log();
    let connection = Connection::new(channel, fast_config());
    let instance = connection.open_instance("test");

    let err = instance.dpcc().set_table(&[1, 2, 3], &[1, 2, 3]).unwrap_err();
    assert!(matches!(err, Error::Device { .. }));
    assert_eq!(sent.lines(), vec!["dpc_clear", "dpc_add_px 1 1", "dpc_add_px 2 2"]);
}

#[test]
fn test_add_pixel() {
    let device = SimulatedDevice::new();
    let (connection, sent) = device.connection();
    let instance = connection.open_instance("test");

    instance.dpcc().add_pixel(1919, 1079).unwrap();
    assert_eq!(device.state().pixels, vec![(1919, 1079)]);
    assert_eq!(sent.lines(), vec!["dpc_add_px 1919 1079"]);
}

#[test]
fn test_table_storage_commands() {
    let device = SimulatedDevice::new();
    let (connection, sent) = device.connection();
    let instance = connection.open_instance("test");
    let dpcc = instance.dpcc();

    dpcc.save_table().unwrap();
    dpcc.load_table().unwrap();
    dpcc.auto_load_table().unwrap();
    dpcc.clear_table().unwrap();
    assert_eq!(sent.lines(), vec!["dpc_save", "dpc_load", "dpc_auto_load", "dpc_clear"]);
}

#[test]
fn test_table_without_terminal_line() {
    let device = SimulatedDevice::new();
    {
        let mut state = device.state();
        state.pixels = vec![(4, 4), (5, 5), (6, 6)];
        state.terminate_tables = false;
    }
    let (connection, _) = device.connection();
    let instance = connection.open_instance("test");

    let table = instance.dpcc().get_table().unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.completion(), Completion::Inactivity);
}
