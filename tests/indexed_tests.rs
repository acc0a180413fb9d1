//! End-to-end scenario tests: container writes feeding the offset index,
//! point lookups going back through it.

use serde::{Deserialize, Serialize};
use streamdex::{Bincode, IndexedReader, IndexedWriter};
use tempfile::TempDir;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Header {
    source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct PriceRecord {
    name: String,
    prices: Vec<f64>,
    currency: String,
}

fn price_record(i: usize) -> Bincode<PriceRecord> {
    Bincode(PriceRecord {
        name: format!("AAPL{}", i),
        prices: vec![100.0 + i as f64],
        currency: "USD".to_string(),
    })
}

fn extract_name(record: &Bincode<PriceRecord>) -> Option<Vec<u8>> {
    if record.0.name.is_empty() {
        None
    } else {
        Some(record.0.name.clone().into_bytes())
    }
}

#[test]
fn test_indexed_scenario_thousand_symbols() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("price_entities.bin");
    let index = dir.path().join("name.index");

    {
        let mut writer = IndexedWriter::create(
            &data,
            &index,
            &Bincode(Header { source: "t".to_string() }),
            extract_name,
        )
        .unwrap();
        for i in 0..1000 {
            writer.write(&price_record(i)).unwrap();
        }
        writer.close().unwrap();
    }

    let mut reader: IndexedReader<Bincode<Header>, Bincode<PriceRecord>> =
        IndexedReader::open(&data, &index).unwrap();
    assert_eq!(reader.header().0.source, "t");

    // Exactly one offset per symbol; the fetched record carries the key.
    let offsets = reader.offsets(b"AAPL500").unwrap();
    assert_eq!(offsets.len(), 1);

    let records = reader.find(b"AAPL500").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0.name, "AAPL500");
    assert_eq!(records[0].0.prices, vec![600.0]);

    // Spot-check the rest of the range.
    for i in (0..1000).step_by(111) {
        let key = format!("AAPL{}", i);
        let records = reader.find(key.as_bytes()).unwrap();
        assert_eq!(records.len(), 1, "key {}", key);
        assert_eq!(records[0].0.name, key);
    }

    assert!(reader.find(b"AAPL1000").unwrap().is_empty());
}

#[test]
fn test_repeated_symbols_accumulate_offsets() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("ticks.bin");
    let index = dir.path().join("ticks.index");

    {
        let mut writer = IndexedWriter::create(
            &data,
            &index,
            &Bincode(Header { source: "ticks".to_string() }),
            extract_name,
        )
        .unwrap();
        // Three ticks per symbol, interleaved.
        for tick in 0..3 {
            for symbol in 0..50 {
                writer
                    .write(&Bincode(PriceRecord {
                        name: format!("SYM{:02}", symbol),
                        prices: vec![tick as f64],
                        currency: "USD".to_string(),
                    }))
                    .unwrap();
            }
        }
        writer.close().unwrap();
    }

    let mut reader: IndexedReader<Bincode<Header>, Bincode<PriceRecord>> =
        IndexedReader::open(&data, &index).unwrap();

    for symbol in 0..50 {
        let key = format!("SYM{:02}", symbol);
        let records = reader.find(key.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        // Offsets come back in insertion order, so ticks do too.
        let ticks: Vec<f64> = records.iter().map(|r| r.0.prices[0]).collect();
        assert_eq!(ticks, vec![0.0, 1.0, 2.0]);
    }
}

#[test]
fn test_index_survives_writer_reopen() {
    let dir = TempDir::new().unwrap();
    let data1 = dir.path().join("batch1.bin");
    let data2 = dir.path().join("batch2.bin");
    let index = dir.path().join("shared.index");

    // Two containers sharing one index file, written one after the other.
    {
        let mut writer = IndexedWriter::create(
            &data1,
            &index,
            &Bincode(Header { source: "batch1".to_string() }),
            extract_name,
        )
        .unwrap();
        for i in 0..100 {
            writer.write(&price_record(i)).unwrap();
        }
        writer.close().unwrap();
    }
    {
        let mut writer = IndexedWriter::create(
            &data2,
            &index,
            &Bincode(Header { source: "batch2".to_string() }),
            extract_name,
        )
        .unwrap();
        for i in 100..200 {
            writer.write(&price_record(i)).unwrap();
        }
        writer.close().unwrap();
    }

    // Keys from the first batch resolve against the first container.
    let mut reader: IndexedReader<Bincode<Header>, Bincode<PriceRecord>> =
        IndexedReader::open(&data1, &index).unwrap();
    let records = reader.find(b"AAPL42").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0.name, "AAPL42");
}
