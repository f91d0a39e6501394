// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Card path handling below the mount root and line assembly.

use comfil_common::config::{MAX_LINE_LEN, SD_MAX_DIR_DEPTH, SD_MOUNT_ROOT};
use comfil_common::storage::{split_path, LineAssembler, LineError, OpenMode};

#[test]
fn test_split_file_at_root() {
    let split = split_path("/sd/report.txt", SD_MOUNT_ROOT).unwrap();
    assert!(split.dirs.is_empty());
    assert_eq!(split.file, "report.txt");
}

#[test]
fn test_split_nested_components() {
    let split = split_path("/sd/logs/2026/run.bin", SD_MOUNT_ROOT).unwrap();
    assert_eq!(split.dirs.as_slice(), &["logs", "2026"]);
    assert_eq!(split.file, "run.bin");
}

#[test]
fn test_split_keeps_dot_components() {
    let split = split_path("/sd/../x", SD_MOUNT_ROOT).unwrap();
    assert_eq!(split.dirs.as_slice(), &[".."]);
    assert_eq!(split.file, "x");
}

#[test]
fn test_split_empty_components_are_kept() {
    let split = split_path("/sd//x", SD_MOUNT_ROOT).unwrap();
    assert_eq!(split.dirs.as_slice(), &[""]);

    let split = split_path("/sd/", SD_MOUNT_ROOT).unwrap();
    assert_eq!(split.file, "");
}

#[test]
fn test_split_outside_root() {
    assert_eq!(split_path("report.txt", SD_MOUNT_ROOT), None);
    assert_eq!(split_path("/sdcard/report.txt", SD_MOUNT_ROOT), None);
    assert_eq!(split_path("/sd", SD_MOUNT_ROOT), None);
}

#[test]
fn test_split_depth_limit() {
    let at_limit = format!("/sd/{}f", "d/".repeat(SD_MAX_DIR_DEPTH));
    assert_eq!(
        split_path(&at_limit, SD_MOUNT_ROOT).unwrap().dirs.len(),
        SD_MAX_DIR_DEPTH
    );

    let too_deep = format!("/sd/{}f", "d/".repeat(SD_MAX_DIR_DEPTH + 1));
    assert_eq!(split_path(&too_deep, SD_MOUNT_ROOT), None);
}

#[test]
fn test_open_mode_for_existing() {
    assert_eq!(OpenMode::for_existing(true), OpenMode::Append);
    assert_eq!(OpenMode::for_existing(false), OpenMode::Create);
}

// =============================================================================
// Line assembly
// =============================================================================

type Assembled = Result<usize, LineError<()>>;

/// Feed `bytes` and collect every completed line.
fn feed(asm: &mut LineAssembler, buf: &mut [u8], bytes: &[u8]) -> Vec<Assembled> {
    bytes.iter().filter_map(|&b| asm.push(buf, b)).collect()
}

#[test]
fn test_line_split_across_reads() {
    let mut asm = LineAssembler::new();
    let mut buf = [0u8; MAX_LINE_LEN];

    // Two 64-byte packets, the line ends in the second
    let line = format!("report.txt;{}\n", "41".repeat(40));
    let (first, second) = line.as_bytes().split_at(64);
    assert!(feed(&mut asm, &mut buf, first).is_empty());
    let done = feed(&mut asm, &mut buf, second);

    assert_eq!(done, vec![Ok(line.len() - 1)]);
    assert_eq!(&buf[..line.len() - 1], line.trim_end().as_bytes());
}

#[test]
fn test_several_lines_in_one_read() {
    let mut asm = LineAssembler::new();
    let mut buf = [0u8; 16];

    let done = feed(&mut asm, &mut buf, b"ping\n\na;41\r\n");

    assert_eq!(done, vec![Ok(4), Ok(0), Ok(5)]);
    assert_eq!(&buf[..5], b"a;41\r");
}

#[test]
fn test_line_of_exactly_buffer_size_fits() {
    let mut asm = LineAssembler::new();
    let mut buf = vec![0u8; MAX_LINE_LEN];
    let mut line = vec![b'x'; MAX_LINE_LEN];
    line.push(b'\n');

    assert_eq!(feed(&mut asm, &mut buf, &line), vec![Ok(MAX_LINE_LEN)]);
}

#[test]
fn test_line_one_byte_over_is_too_long() {
    let mut asm = LineAssembler::new();
    let mut buf = vec![0u8; MAX_LINE_LEN];
    let mut line = vec![b'x'; MAX_LINE_LEN + 1];
    line.push(b'\n');

    assert_eq!(
        feed(&mut asm, &mut buf, &line),
        vec![Err(LineError::TooLong)]
    );
}

#[test]
fn test_next_line_after_overflow_is_clean() {
    let mut asm = LineAssembler::new();
    let mut buf = [0u8; 8];

    let done = feed(&mut asm, &mut buf, b"0123456789abcdef\nping\n");

    assert_eq!(done, vec![Err(LineError::TooLong), Ok(4)]);
    assert_eq!(&buf[..4], b"ping");
}

#[test]
fn test_unterminated_line_stays_pending() {
    let mut asm = LineAssembler::new();
    let mut buf = [0u8; 8];

    assert!(feed(&mut asm, &mut buf, b"no end").is_empty());
    assert_eq!(feed(&mut asm, &mut buf, b"\n"), vec![Ok(6)]);
}
