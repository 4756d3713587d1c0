//! Binary snapshot codec — the durable full-state checkpoint.
//!
//! Layout: a `u64` record count, then per record a length-prefixed timestamp
//! string, the three metric values as `f64` in metric order (temperature,
//! humidity, light), and a length-prefixed sensor id string. All integers and
//! floats are little-endian, so a snapshot written on one machine loads on
//! any other.
//!
//! The snapshot is a full replace (truncate + rewrite), never an append. A
//! file that cannot be decoded completely — short header, truncated record,
//! implausible length prefix — yields an error rather than a partial load;
//! the caller decides what starting empty means (see [`crate::persist`]).

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::record::SensorRecord;

/// Upper bound on an encoded string length. Timestamps are 24 bytes and
/// sensor ids are short labels; anything past this is a corrupt or hostile
/// length prefix, rejected before it can drive a huge allocation.
const MAX_STRING_LEN: u64 = 4096;

/// Encode records to a writer.
pub fn encode<W: Write>(w: &mut W, records: &[SensorRecord]) -> io::Result<()> {
    w.write_all(&(records.len() as u64).to_le_bytes())?;
    for record in records {
        write_string(w, &record.timestamp)?;
        w.write_all(&record.temperature.to_le_bytes())?;
        w.write_all(&record.humidity.to_le_bytes())?;
        w.write_all(&record.light.to_le_bytes())?;
        write_string(w, &record.sensor_id)?;
    }
    Ok(())
}

/// Decode records from a reader.
///
/// Fails with `UnexpectedEof` on truncation and `InvalidData` on an
/// implausible length prefix. The count header must match the number of
/// records actually present.
pub fn decode<R: Read>(r: &mut R) -> io::Result<Vec<SensorRecord>> {
    let count = read_u64(r)?;
    let mut records = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let timestamp = read_string(r)?;
        let temperature = read_f64(r)?;
        let humidity = read_f64(r)?;
        let light = read_f64(r)?;
        let sensor_id = read_string(r)?;
        records.push(SensorRecord {
            timestamp,
            temperature,
            humidity,
            light,
            sensor_id,
        });
    }
    Ok(records)
}

/// Write a full-replace snapshot file.
pub fn write_snapshot(path: &Path, records: &[SensorRecord]) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    encode(&mut w, records)?;
    w.flush()
}

/// Read a snapshot file in full.
pub fn read_snapshot(path: &Path) -> io::Result<Vec<SensorRecord>> {
    let mut r = BufReader::new(File::open(path)?);
    decode(&mut r)
}

fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_all(&(s.len() as u64).to_le_bytes())?;
    w.write_all(s.as_bytes())
}

fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_u64(r)?;
    if len > MAX_STRING_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("string length {len} exceeds limit {MAX_STRING_LEN}"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}
