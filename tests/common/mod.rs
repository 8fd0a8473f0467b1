//! Shared fixtures for integration tests.

use std::io::Write;
use std::net::Ipv4Addr;

use tempfile::NamedTempFile;

/// One range: start address, country bytes, area bytes.
pub type Range<'a> = (&'a str, &'a [u8], &'a [u8]);

fn push_u24(data: &mut Vec<u8>, value: u32) {
    data.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Build a database image with inline records, ranges given in ascending order.
pub fn build_image(ranges: &[Range]) -> Vec<u8> {
    let mut data = vec![0u8; 8];
    let mut index = Vec::new();

    for (start, country, area) in ranges {
        let ip = u32::from(start.parse::<Ipv4Addr>().unwrap());
        index.push((ip, data.len() as u32));
        data.extend_from_slice(&ip.to_le_bytes());
        data.extend_from_slice(country);
        data.push(0);
        data.extend_from_slice(area);
        data.push(0);
    }

    let index_start = data.len() as u32;
    for (ip, record_ptr) in index {
        data.extend_from_slice(&ip.to_le_bytes());
        push_u24(&mut data, record_ptr);
    }
    let index_end = data.len() as u32 - 7;
    data[0..4].copy_from_slice(&index_start.to_le_bytes());
    data[4..8].copy_from_slice(&index_end.to_le_bytes());
    data
}

/// Write bytes to a temp file that lives as long as the returned handle.
pub fn write_temp(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}

/// A small release-like database: GBK country names, a placeholder area and
/// a version record on the last range.
pub fn sample_image() -> Vec<u8> {
    build_image(&[
        ("0.0.0.0", b"IANA", b"reserved"),
        ("1.0.0.0", b"Australia", b" CZ88.NET"),
        // "北京" / "联通"
        ("1.2.0.0", &[0xb1, 0xb1, 0xbe, 0xa9], &[0xc1, 0xaa, 0xcd, 0xa8]),
        ("8.8.8.0", b"United States", b"Google DNS"),
        ("8.8.9.0", b"United States", b""),
        ("255.255.255.0", b"Release", b"2024-01-01"),
    ])
}
