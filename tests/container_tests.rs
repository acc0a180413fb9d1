//! Integration tests for the container format: framing, sealing, and both
//! read modes against real files.

use serde::{Deserialize, Serialize};
use streamdex::{Bincode, ContainerWriter, Enumerator, Error, Options, RandomAccess};
use tempfile::TempDir;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Header {
    source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Quote {
    name: String,
    prices: Vec<f64>,
}

fn quote(i: usize) -> Bincode<Quote> {
    Bincode(Quote { name: format!("SYM{:04}", i), prices: vec![100.0 + i as f64, 101.5] })
}

#[test]
fn test_sequential_roundtrip_preserves_order_and_header() {
    init_logs();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quotes.bin");

    let written: Vec<Bincode<Quote>> = (0..200).map(quote).collect();
    {
        let mut writer = ContainerWriter::create(
            &path,
            &Bincode(Header { source: "test-suite".to_string() }),
        )
        .unwrap();
        for record in &written {
            writer.write(record).unwrap();
        }
        writer.close().unwrap();
    }

    let mut reader: Enumerator<Bincode<Header>, Bincode<Quote>> =
        Enumerator::open(&path).unwrap();
    assert_eq!(reader.header().0.source, "test-suite");

    let mut read_back = Vec::new();
    while let Some(record) = reader.next_record().unwrap() {
        read_back.push(record.0);
    }
    let written: Vec<Quote> = written.into_iter().map(|r| r.0).collect();
    assert_eq!(read_back, written);
}

#[test]
fn test_callback_offsets_roundtrip_through_random_access() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quotes.bin");

    let reported = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    {
        let sink = std::sync::Arc::clone(&reported);
        let mut writer =
            ContainerWriter::create(&path, &Bincode(Header { source: "t".into() }))
                .unwrap()
                .on_write(move |offset, record: &Bincode<Quote>| {
                    sink.lock().unwrap().push((offset, record.0.clone()));
                    Ok(())
                });
        for i in 0..150 {
            writer.write(&quote(i)).unwrap();
        }
        writer.close().unwrap();
    }

    let mut reader: RandomAccess<Bincode<Header>, Bincode<Quote>> =
        RandomAccess::open(&path).unwrap();

    // Every reported offset decodes to exactly the record written there.
    for (offset, expected) in reported.lock().unwrap().iter() {
        let record = reader.record_at(*offset).unwrap().unwrap();
        assert_eq!(&record.0, expected);
    }
}

#[test]
fn test_truncated_container_raises_unsealed_at_end_of_data() {
    init_logs();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quotes.bin");

    {
        let mut writer =
            ContainerWriter::create(&path, &Bincode(Header { source: "t".into() })).unwrap();
        for i in 0..10 {
            writer.write(&quote(i)).unwrap();
        }
        writer.close().unwrap();
    }

    // Remove the seal marker; everything before it stays intact.
    let data = std::fs::read(&path).unwrap();
    std::fs::write(&path, &data[..data.len() - 4]).unwrap();

    let mut reader: Enumerator<Bincode<Header>, Bincode<Quote>> =
        Enumerator::open(&path).unwrap();

    // All ten records still decode; the failure comes exactly at end-of-data.
    for _ in 0..10 {
        assert!(reader.next_record().unwrap().is_some());
    }
    assert!(matches!(reader.next_record(), Err(Error::Unsealed(_))));
}

#[test]
fn test_sealed_then_reopened_file_is_stable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quotes.bin");

    {
        let mut writer = ContainerWriter::with_options(
            &path,
            &Bincode(Header { source: "t".into() }),
            Options::new().write_buffer_size(512),
        )
        .unwrap();
        writer.write(&quote(1)).unwrap();
        writer.close().unwrap();
    }

    // Two independent enumerators over the same file see the same stream.
    for _ in 0..2 {
        let reader: Enumerator<Bincode<Header>, Bincode<Quote>> =
            Enumerator::open(&path).unwrap();
        let records: Vec<_> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0.name, "SYM0001");
    }
}

#[test]
fn test_garbage_file_rejected_by_magic_check() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("not-a-container.bin");
    std::fs::write(&path, b"PK\x03\x04 some other format entirely").unwrap();

    let result = Enumerator::<Bincode<Header>, Bincode<Quote>>::open(&path);
    assert!(matches!(result, Err(Error::InvalidMagic { .. })));

    let result = RandomAccess::<Bincode<Header>, Bincode<Quote>>::open(&path);
    assert!(matches!(result, Err(Error::InvalidMagic { .. })));
}

#[test]
fn test_empty_record_stream_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.bin");

    ContainerWriter::<Bincode<Quote>>::create(&path, &Bincode(Header { source: "t".into() }))
        .unwrap()
        .close()
        .unwrap();

    let mut reader: Enumerator<Bincode<Header>, Bincode<Quote>> =
        Enumerator::open(&path).unwrap();
    assert!(reader.next_record().unwrap().is_none());
    assert!(reader.seal_reached());
}
