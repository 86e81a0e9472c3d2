//! End-to-end checks of the typed handle contract through IoService

use locus_io::error::Error;
use locus_io::{AccessMode, ByteOrder, BytesHandle, DataHandle, FileHandle, IoConfig, IoService};
use proptest::prelude::*;

#[test]
fn test_byte_order_applies_at_read_time() {
    let service = IoService::new(IoConfig::default().with_initial_capacity(4));
    let mut handle = service
        .open("bytes:", AccessMode::ReadWrite)
        .expect("Failed to open in-memory handle");
    assert_eq!(handle.order(), ByteOrder::BigEndian);

    // [0x04, 0x00] is a length header of 4 only when read little-endian
    handle.write_u16(0x0400).expect("Failed to write header");
    handle.write_u32(0x0102_0304).expect("Failed to write payload");

    handle.seek(0).expect("Failed to seek");
    assert!(matches!(handle.read_utf(), Err(Error::EndOfStream { .. })));
    assert_eq!(handle.offset().expect("offset"), 0);

    handle.set_order(ByteOrder::LittleEndian);
    assert_eq!(handle.read_utf().expect("Failed to read string"), "\x01\x02\x03\x04");
}

#[test]
fn test_growth_preserves_content() {
    let mut handle = BytesHandle::with_capacity(8);
    let prefix: Vec<u8> = (0..8).collect();
    handle.write(&prefix).expect("Failed to write prefix");

    handle.seek(100_000).expect("Failed to seek past end");
    handle.write_u8(0xff).expect("Failed to write far byte");
    assert!(handle.capacity() >= 100_001);

    handle.seek(0).expect("Failed to rewind");
    let mut back = vec![0u8; 8];
    handle.read_fully(&mut back).expect("Failed to read prefix");
    assert_eq!(back, prefix);

    let bytes = handle.bytes().expect("bytes");
    assert!(bytes[8..100_000].iter().all(|&b| b == 0));
    assert_eq!(bytes[100_000], 0xff);
}

#[test]
fn test_growth_count_is_logarithmic() {
    const TOTAL: usize = 1 << 16;
    let mut handle = BytesHandle::with_capacity(1);
    for i in 0..TOTAL {
        handle.write_u8(i as u8).expect("Failed to write");
    }
    assert_eq!(handle.length().expect("length"), TOTAL as u64);
    // Capacity doubles: 1 → 2 → ... → 2^16
    assert!(handle.growth_count() <= 17, "grew {} times", handle.growth_count());
}

#[test]
fn test_file_read_only_violations() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("ro.bin");
    std::fs::write(&path, b"abcd").expect("Failed to seed file");

    let service = IoService::default();
    let mut handle = service
        .open(&path.to_string_lossy(), AccessMode::Read)
        .expect("Failed to open file");

    assert!(matches!(handle.write(b"x"), Err(Error::ReadOnlyViolation)));
    let length = handle.length().expect("length");
    assert!(matches!(handle.seek(length + 1), Err(Error::OutOfRange { .. })));
    assert!(matches!(handle.set_length(0), Err(Error::ReadOnlyViolation)));
    assert_eq!(std::fs::read(&path).expect("read back"), b"abcd");
}

#[test]
fn test_closed_handles() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut handles: Vec<Box<dyn DataHandle>> = vec![
        Box::new(BytesHandle::from_vec(vec![1, 2, 3])),
        Box::new(FileHandle::open_path(dir.path().join("c.bin"), AccessMode::ReadWrite).expect("open")),
    ];

    for handle in handles.iter_mut() {
        handle.close().expect("first close");
        assert!(handle.is_closed());
        assert!(matches!(handle.read(&mut [0u8; 2]), Err(Error::Closed)));
        assert!(matches!(handle.seek(0), Err(Error::Closed)));
        handle.close().expect("second close");
    }
}

#[test]
fn test_writable_seek_zero_fills_both_backends() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut handles: Vec<Box<dyn DataHandle>> = vec![
        Box::new(BytesHandle::with_capacity(2)),
        Box::new(FileHandle::open_path(dir.path().join("z.bin"), AccessMode::ReadWrite).expect("open")),
    ];

    for handle in handles.iter_mut() {
        handle.write_u8(9).expect("write");
        handle.seek(6).expect("seek past end");
        assert_eq!(handle.length().expect("length"), 6);
        handle.seek(0).expect("rewind");
        let mut all = [0xaau8; 6];
        assert_eq!(handle.read(&mut all).expect("read"), 6);
        assert_eq!(all, [9, 0, 0, 0, 0, 0]);
    }
}

fn order_strategy() -> impl Strategy<Value = ByteOrder> {
    prop_oneof![Just(ByteOrder::BigEndian), Just(ByteOrder::LittleEndian)]
}

proptest! {
    #[test]
    fn prop_typed_round_trip(
        order in order_strategy(),
        a in any::<i16>(),
        b in any::<u32>(),
        c in any::<i64>(),
        d in any::<f64>().prop_filter("not NaN", |v| !v.is_nan()),
        s in "\\PC{0,40}",
    ) {
        let mut handle = BytesHandle::with_capacity(1).with_order(order);
        handle.write_i16(a).unwrap();
        handle.write_u32(b).unwrap();
        handle.write_i64(c).unwrap();
        handle.write_f64(d).unwrap();
        handle.write_utf(&s).unwrap();

        handle.seek(0).unwrap();
        prop_assert_eq!(handle.read_i16().unwrap(), a);
        prop_assert_eq!(handle.read_u32().unwrap(), b);
        prop_assert_eq!(handle.read_i64().unwrap(), c);
        prop_assert_eq!(handle.read_f64().unwrap(), d);
        prop_assert_eq!(handle.read_utf().unwrap(), s);
    }

    #[test]
    fn prop_growth_preserves_prefix(
        prefix in proptest::collection::vec(any::<u8>(), 0..256),
        far in 256u64..20_000,
    ) {
        let mut handle = BytesHandle::with_capacity(prefix.len().max(1));
        handle.write(&prefix).unwrap();
        handle.seek(far).unwrap();
        handle.write_u8(1).unwrap();

        let bytes = handle.bytes().unwrap();
        prop_assert_eq!(&bytes[..prefix.len()], &prefix[..]);
        prop_assert!(bytes[prefix.len()..far as usize].iter().all(|&x| x == 0));
    }
}
