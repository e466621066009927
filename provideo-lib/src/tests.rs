use crate::command::Command;
use crate::error::Error;
use crate::family::dpcc::DpccPixel;
use crate::flashloader::{FlashError, FlashEvent, FlashloaderArgs, parse_line};
use crate::reassembly::{Progress, Scan, TableAssembler, scan_next};
use crate::response::{Line, LineBuffer, classify, parse_ints};

const MAX_BUFFER: usize = 64 * 1024;

fn assemble(chunks: &[&[u8]], capacity: usize) -> crate::Result<(Progress, Vec<DpccPixel>)> {
    let mut assembler = TableAssembler::<DpccPixel>::new("dpc_add_px", capacity, MAX_BUFFER);
    let mut progress = Progress::NeedMore;
    for chunk in chunks {
        progress = assembler.feed(chunk)?;
    }
    Ok((progress, assembler.finish().into_records()))
}

#[test]
fn test_classify_terminal_lines() {
    assert_eq!(classify("OK", None), Line::Ok);
    assert_eq!(classify("OK\r", None), Line::Ok);
    assert_eq!(classify("FAIL", None), Line::Fail(None));
    assert_eq!(
        classify("FAIL level out of range", None),
        Line::Fail(Some("level out of range".to_string()))
    );
    assert_eq!(
        classify("ERROR: level out of range.", None),
        Line::Fail(Some("level out of range.".to_string()))
    );
    assert_eq!(
        classify("error unknown command", None),
        Line::Fail(Some("unknown command".to_string()))
    );
}

#[test]
fn test_classify_echo_requires_whole_token() {
    assert_eq!(classify("dpc_level 7", Some("dpc_level")), Line::Echo("7"));
    assert_eq!(classify("dpc_level", Some("dpc_level")), Line::Echo(""));
    assert_eq!(classify("dpc_levels 7", Some("dpc_level")), Line::Other("dpc_levels 7"));
    assert_eq!(classify("dpc_level 7", None), Line::Other("dpc_level 7"));
    assert!(!classify("dpc_level 7", Some("dpc_level")).is_terminal());
}

#[test]
fn test_parse_ints_stops_at_first_non_integer() {
    assert_eq!(parse_ints("10 20", 2), vec![10, 20]);
    assert_eq!(parse_ints("10 20 30", 2), vec![10, 20]);
    assert_eq!(parse_ints("-5 +6 0x1f", 3), vec![-5, 6, 31]);
    assert_eq!(parse_ints("10 abc 30", 3), vec![10]);
    assert_eq!(parse_ints("", 1), Vec::<i64>::new());
}

#[test]
fn test_line_buffer_splits_across_chunks() {
    let mut lines = LineBuffer::default();
    lines.extend(b"dpc_le");
    assert_eq!(lines.next_line(), None);
    lines.extend(b"vel 7\r\nO");
    assert_eq!(lines.next_line().as_deref(), Some("dpc_level 7"));
    assert_eq!(lines.next_line(), None);
    assert_eq!(lines.len(), 1);
    lines.extend(b"K\n");
    assert_eq!(lines.next_line().as_deref(), Some("OK"));
    assert!(lines.is_empty());
}

#[test]
fn test_command_format() {
    const LEVEL: Command = Command::new("dpc_level", 1);
    const BRIGHT: Command = Command::new("cproc_bright", 1).copyable();

    assert_eq!(LEVEL.format(&[], false), "dpc_level\n");
    assert_eq!(LEVEL.format(&[7], false), "dpc_level 7\n");
    // copy flag is ignored by commands without a copy variant
    assert_eq!(LEVEL.format(&[7], true), "dpc_level 7\n");
    assert_eq!(BRIGHT.format(&[-12], false), "cproc_bright -12\n");
    assert_eq!(BRIGHT.format(&[-12], true), "cproc_bright -12 1\n");
}

#[test]
fn test_scan_next_transitions() {
    assert_eq!(scan_next::<DpccPixel>(b"dpc_add_px 10 2", "dpc_add_px"), Scan::NeedMore);
    assert_eq!(
        scan_next::<DpccPixel>(b"dpc_add_px 10 20\nOK\n", "dpc_add_px"),
        Scan::Record {
            record: DpccPixel::new(10, 20),
            consumed: 17
        }
    );
    assert_eq!(
        scan_next::<DpccPixel>(b"OK\n", "dpc_add_px"),
        Scan::Terminal {
            ok: true,
            reason: None,
            consumed: 3
        }
    );
    assert_eq!(
        scan_next::<DpccPixel>(b"dpc_add_px 10\n", "dpc_add_px"),
        Scan::Malformed { consumed: 14 }
    );
    assert_eq!(
        scan_next::<DpccPixel>(b"dpc_add_px 70000 1\n", "dpc_add_px"),
        Scan::Malformed { consumed: 19 }
    );
    assert_eq!(scan_next::<DpccPixel>(b"dpc_table\n", "dpc_add_px"), Scan::Skip { consumed: 10 });
    assert_eq!(
        scan_next::<DpccPixel>(b"ERROR: dpc_add_px table locked\n", "dpc_add_px"),
        Scan::Terminal {
            ok: false,
            reason: Some("dpc_add_px table locked".to_string()),
            consumed: 31
        }
    );
}

#[test]
fn test_assembler_does_not_commit_half_received_record() {
    let mut assembler = TableAssembler::<DpccPixel>::new("dpc_add_px", 16, MAX_BUFFER);
    // "dpc_add_px 10 2" would parse as (10, 2) if the newline were not required
    assert_eq!(assembler.feed(b"dpc_add_px 10 2").unwrap(), Progress::NeedMore);
    assert_eq!(assembler.len(), 0);
    assert_eq!(assembler.feed(b"0\n").unwrap(), Progress::NeedMore);
    assert_eq!(assembler.len(), 1);
    assert_eq!(assembler.feed(b"OK\n").unwrap(), Progress::Complete);
    assert_eq!(assembler.finish().records(), &[DpccPixel::new(10, 20)]);
}

#[test]
fn test_assembler_fragmentation_is_irrelevant() {
    let stream: Vec<u8> = (0..50u16)
        .flat_map(|i| format!("dpc_add_px {} {}\n", i * 3, 1000 - i).into_bytes())
        .chain(b"OK\n".iter().copied())
        .collect();

    let (whole_progress, whole) = assemble(&[&stream], 64).unwrap();
    assert_eq!(whole_progress, Progress::Complete);
    assert_eq!(whole.len(), 50);

    for size in [1, 2, 3, 7, 16, 17, 100] {
        let chunks: Vec<&[u8]> = stream.chunks(size).collect();
        let (progress, pieces) = assemble(&chunks, 64).unwrap();
        assert_eq!(progress, Progress::Complete, "chunk size {size}");
        assert_eq!(pieces, whole, "chunk size {size}");
    }
}

#[test]
fn test_assembler_capacity_overflow() {
    let stream = b"dpc_add_px 1 1\ndpc_add_px 2 2\ndpc_add_px 3 3\nOK\n";
    match assemble(&[stream], 2) {
        Err(Error::OutOfMemory(msg)) => assert!(msg.contains("more than 2")),
        other => panic!("Expected OutOfMemory, got {:?}", other),
    }
    // exactly at capacity is fine
    let (_, pixels) = assemble(&[b"dpc_add_px 1 1\ndpc_add_px 2 2\nOK\n"], 2).unwrap();
    assert_eq!(pixels.len(), 2);
}

#[test]
fn test_assembler_buffer_cap() {
    let mut assembler = TableAssembler::<DpccPixel>::new("dpc_add_px", 16, 8);
    assert!(matches!(assembler.feed(b"dpc_add_px 1 1\n"), Err(Error::OutOfMemory(_))));
}

#[test]
fn test_assembler_full_table_in_one_slice() {
    use crate::family::dpcc::MAX_PIXELS;

    let stream: Vec<u8> = (0..MAX_PIXELS as u16)
        .flat_map(|i| format!("dpc_add_px {} {}\n", 1000 + i % 1920, 1000 + i / 1920).into_bytes())
        .chain(b"OK\n".iter().copied())
        .collect();
    assert!(stream.len() > MAX_BUFFER);

    let (progress, whole) = assemble(&[&stream], MAX_PIXELS).unwrap();
    assert_eq!(progress, Progress::Complete);
    assert_eq!(whole.len(), MAX_PIXELS);

    let bytes: Vec<&[u8]> = stream.chunks(1).collect();
    let (_, bytewise) = assemble(&bytes, MAX_PIXELS).unwrap();
    assert_eq!(bytewise, whole);
}

#[test]
fn test_assembler_failure_line() {
    let result = assemble(&[b"dpc_add_px 1 1\nFAIL table not loaded\n"], 8);
    match result {
        Err(Error::Device { reason }) => assert_eq!(reason.as_deref(), Some("table not loaded")),
        other => panic!("Expected device failure, got {:?}", other),
    }
}

#[test]
fn test_error_codes() {
    assert_eq!(Error::Fault.code(), -14);
    assert_eq!(Error::InvalidArgument(String::new()).code(), -22);
    assert_eq!(Error::Unsupported(String::new()).code(), -95);
    assert_eq!(Error::Device { reason: None }.code(), -5);
    assert_eq!(Error::Protocol(String::new()).code(), -71);
    assert_eq!(
        Error::ParamCount {
            command: "dpc_level",
            expected: 1,
            actual: 0
        }
        .code(),
        -71
    );
    assert_eq!(Error::Timeout(std::time::Duration::from_millis(1)).code(), -110);
    assert_eq!(Error::OutOfMemory(String::new()).code(), -12);
    assert_eq!(Error::NoDevice.code(), -19);
}

#[test]
fn test_device_reason_mapping() {
    assert!(matches!(
        Error::from_device_reason(Some("level out of range.".into())),
        Error::InvalidArgument(_)
    ));
    assert!(matches!(
        Error::from_device_reason(Some("unknown command".into())),
        Error::Unsupported(_)
    ));
    assert!(matches!(
        Error::from_device_reason(Some("flash busy".into())),
        Error::Device { reason: Some(_) }
    ));
    assert!(matches!(Error::from_device_reason(None), Error::Device { reason: None }));
}

#[test]
fn test_flashloader_args() {
    let mut args = FlashloaderArgs::new("/dev/ttyUSB0", "fw.bin");
    args.start_sector = 4;
    args.sector_count = 12;
    args.verify = true;
    assert_eq!(
        args.to_args(),
        vec![
            "--port",
            "/dev/ttyUSB0",
            "--baud",
            "115200",
            "--sector",
            "4",
            "--count",
            "12",
            "--file",
            "fw.bin",
            "--verify"
        ]
    );
}

#[test]
fn test_flashloader_parse_line() {
    assert_eq!(parse_line("Flashloader v2.1.0"), FlashEvent::Version("2.1.0".into()));
    assert_eq!(parse_line("Writing sector 3 ... 45%"), FlashEvent::Progress(45));
    assert_eq!(parse_line("100 %"), FlashEvent::Progress(100));
    assert_eq!(parse_line("Verification failed at 0x4000"), FlashEvent::Error(FlashError::VerifyFailed));
    assert_eq!(parse_line("could not open port COM3"), FlashEvent::Error(FlashError::PortOpen));
    assert_eq!(parse_line("No response from target"), FlashEvent::Error(FlashError::NoResponse));
    assert_eq!(parse_line("Timed out waiting for ack"), FlashEvent::Error(FlashError::Timeout));
    assert_eq!(parse_line("Done."), FlashEvent::Done);
    assert_eq!(parse_line("Erasing"), FlashEvent::Other("Erasing".into()));
}
