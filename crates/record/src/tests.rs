use super::*;
use std::io::Cursor;

fn sample(key: &[u8], value: &[u8], version: u64) -> Record {
    Record {
        del_flag: DelFlag::Live,
        time_sec: 1_700_000_000,
        time_nsec: 123_456_789,
        version,
        key: key.to_vec(),
        value: value.to_vec(),
    }
}

// --------------------- Header ---------------------

#[test]
fn header_round_trip() {
    let header = RecordHeader {
        crc: 0xDEAD_BEEF,
        del_flag: 1,
        time_sec: 7,
        time_nsec: 8,
        version: 9,
        key_size: 3,
        value_size: 5,
    };

    let mut buf = Vec::new();
    header.encode(&mut buf).unwrap();
    assert_eq!(buf.len(), HEADER_SIZE);

    let mut fixed = [0u8; HEADER_SIZE];
    fixed.copy_from_slice(&buf);
    assert_eq!(RecordHeader::decode(&fixed).unwrap(), header);
}

// --------------------- Encode / decode round trip ---------------------

#[test]
fn record_round_trip() {
    let rec = sample(b"key", b"value", 3);
    let buf = rec.encode().unwrap();
    assert_eq!(buf.len() as u64, rec.encoded_len());
    assert_eq!(Record::decode(&buf).unwrap(), rec);
}

#[test]
fn tombstone_round_trip() {
    let rec = Record {
        del_flag: DelFlag::Tombstone,
        time_sec: 1,
        time_nsec: 2,
        version: 4,
        key: b"gone".to_vec(),
        value: Vec::new(),
    };
    let buf = rec.encode().unwrap();
    let back = Record::decode(&buf).unwrap();
    assert_eq!(back, rec);
    assert!(!back.del_flag.is_live());
}

#[test]
fn crc_covers_value_bytes_only() {
    let a = sample(b"aaa", b"same", 1);
    let b = sample(b"bbb", b"same", 9);
    assert_eq!(a.crc(), b.crc());
    assert_ne!(a.crc(), sample(b"aaa", b"other", 1).crc());
}

// --------------------- Corruption detection ---------------------

#[test]
fn decode_detects_flipped_value_byte() {
    let rec = sample(b"k", b"value", 1);
    let mut buf = rec.encode().unwrap();
    let last = buf.len() - 1;
    buf[last] ^= 0xFF;

    match Record::decode(&buf) {
        Err(RecordError::Corrupt(_)) => {}
        other => panic!("expected Corrupt, got {:?}", other),
    }
}

#[test]
fn decode_rejects_unknown_del_flag() {
    let rec = sample(b"k", b"v", 1);
    let mut buf = rec.encode().unwrap();
    // del_flag is the second header field
    buf[4] = 7;

    match Record::decode(&buf) {
        Err(RecordError::Corrupt(_)) => {}
        other => panic!("expected Corrupt, got {:?}", other),
    }
}

#[test]
fn decode_rejects_oversized_key_size_field() {
    let rec = sample(b"k", b"v", 1);
    let mut buf = rec.encode().unwrap();
    // key_size field starts at byte 24; patch it to an impossible length
    buf[24..28].copy_from_slice(&(u32::MAX).to_le_bytes());

    match Record::decode(&buf) {
        Err(RecordError::Corrupt(_)) => {}
        other => panic!("expected Corrupt, got {:?}", other),
    }
}

// --------------------- EOF vs truncation ---------------------

#[test]
fn read_record_on_empty_input_is_none() {
    let mut r = Cursor::new(Vec::<u8>::new());
    assert!(read_record(&mut r).unwrap().is_none());
}

#[test]
fn read_record_partial_header_is_truncated() {
    let buf = sample(b"k", b"v", 1).encode().unwrap();
    let mut r = Cursor::new(buf[..HEADER_SIZE - 5].to_vec());

    match read_record(&mut r) {
        Err(RecordError::Truncated) => {}
        other => panic!("expected Truncated, got {:?}", other),
    }
}

#[test]
fn read_record_partial_payload_is_truncated() {
    let buf = sample(b"key", b"value", 1).encode().unwrap();
    let mut r = Cursor::new(buf[..buf.len() - 2].to_vec());

    match read_record(&mut r) {
        Err(RecordError::Truncated) => {}
        other => panic!("expected Truncated, got {:?}", other),
    }
}

#[test]
fn read_record_yields_records_then_clean_eof() {
    let first = sample(b"a", b"1", 1);
    let second = sample(b"b", b"2", 1);
    let mut buf = first.encode().unwrap();
    buf.extend_from_slice(&second.encode().unwrap());

    let mut r = Cursor::new(buf);
    assert_eq!(read_record(&mut r).unwrap().unwrap(), first);
    assert_eq!(read_record(&mut r).unwrap().unwrap(), second);
    assert!(read_record(&mut r).unwrap().is_none());
}

// --------------------- Limits ---------------------

#[test]
fn encode_rejects_oversized_key() {
    let rec = sample(&vec![b'k'; MAX_KEY_SIZE + 1], b"v", 1);
    match rec.encode() {
        Err(RecordError::KeyTooLarge { len, .. }) => assert_eq!(len, MAX_KEY_SIZE + 1),
        other => panic!("expected KeyTooLarge, got {:?}", other),
    }
}

#[test]
fn encode_accepts_max_key() {
    let rec = sample(&vec![b'k'; MAX_KEY_SIZE], b"v", 1);
    assert!(rec.encode().is_ok());
}

#[test]
fn encode_rejects_oversized_payload() {
    let rec = sample(b"k", &vec![b'v'; MAX_RECORD_SIZE], 1);
    match rec.encode() {
        Err(RecordError::RecordTooLarge { .. }) => {}
        other => panic!("expected RecordTooLarge, got {:?}", other),
    }
}

// --------------------- write_record ---------------------

#[test]
fn write_record_returns_pre_append_offset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.00000000000000001");
    let mut file = std::fs::File::options()
        .create(true)
        .append(true)
        .read(true)
        .open(&path)
        .unwrap();

    let first = sample(b"a", b"1", 1);
    let second = sample(b"b", b"22", 1);

    assert_eq!(write_record(&mut file, &first).unwrap(), 0);
    assert_eq!(write_record(&mut file, &second).unwrap(), first.encoded_len());
    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        first.encoded_len() + second.encoded_len()
    );
}

#[test]
fn write_record_output_replays_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.00000000000000001");
    let mut file = std::fs::File::options()
        .create(true)
        .append(true)
        .read(true)
        .open(&path)
        .unwrap();

    let records = vec![sample(b"a", b"1", 1), sample(b"a", b"2", 2)];
    for rec in &records {
        write_record(&mut file, rec).unwrap();
    }

    let mut replayed = Vec::new();
    let mut r = std::fs::File::open(&path).unwrap();
    while let Some(rec) = read_record(&mut r).unwrap() {
        replayed.push(rec);
    }
    assert_eq!(replayed, records);
}
