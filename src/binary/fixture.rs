//! In-memory QQWry image builder for tests.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use super::format::HEADER_SIZE;

/// Builds small database images, optionally sharing strings through redirects
/// the way published files do.
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    ranges: Vec<(u32, Vec<u8>, Vec<u8>)>,
    dedup: bool,
}

impl DatabaseBuilder {
    /// Builder writing every record inline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder that reuses repeated countries (`0x02`) and repeated
    /// country+area pairs (`0x01`).
    pub fn deduplicated() -> Self {
        Self {
            ranges: Vec::new(),
            dedup: true,
        }
    }

    /// Add a range starting at `start`.
    pub fn add_range(&mut self, start: &str, country: &str, area: &str) -> &mut Self {
        self.add_raw(
            start.parse::<Ipv4Addr>().expect("fixture ip").into(),
            country.as_bytes(),
            area.as_bytes(),
        )
    }

    /// Add a range with raw field bytes.
    pub fn add_raw(&mut self, start: u32, country: &[u8], area: &[u8]) -> &mut Self {
        self.ranges.push((start, country.to_vec(), area.to_vec()));
        self
    }

    /// Serialize to a complete file image.
    pub fn build(&self) -> Vec<u8> {
        let mut ranges = self.ranges.clone();
        ranges.sort_by_key(|(ip, _, _)| *ip);

        let mut data = vec![0u8; HEADER_SIZE];
        let mut countries: HashMap<Vec<u8>, u32> = HashMap::new();
        let mut pairs: HashMap<(Vec<u8>, Vec<u8>), u32> = HashMap::new();
        let mut index = Vec::with_capacity(ranges.len());

        for (ip, country, area) in &ranges {
            let record_ptr = data.len() as u32;
            data.extend_from_slice(&ip.to_le_bytes());
            index.push((*ip, record_ptr));

            let body = data.len() as u32;
            let pair = (country.clone(), area.clone());
            if self.dedup {
                if let Some(&shared) = pairs.get(&pair) {
                    data.push(0x01);
                    push_u24(&mut data, shared);
                    continue;
                }
                if let Some(&shared) = countries.get(country) {
                    data.push(0x02);
                    push_u24(&mut data, shared);
                } else {
                    countries.insert(country.clone(), body);
                    push_cstr(&mut data, country);
                }
                pairs.insert(pair, body);
            } else {
                push_cstr(&mut data, country);
            }
            push_cstr(&mut data, area);
        }

        let index_start = data.len() as u32;
        for (ip, record_ptr) in &index {
            data.extend_from_slice(&ip.to_le_bytes());
            push_u24(&mut data, *record_ptr);
        }
        let index_end = data.len() as u32 - 7;

        data[0..4].copy_from_slice(&index_start.to_le_bytes());
        data[4..8].copy_from_slice(&index_end.to_le_bytes());
        data
    }
}

fn push_u24(data: &mut Vec<u8>, value: u32) {
    data.extend_from_slice(&value.to_le_bytes()[..3]);
}

fn push_cstr(data: &mut Vec<u8>, s: &[u8]) {
    data.extend_from_slice(s);
    data.push(0);
}
