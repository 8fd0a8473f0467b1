//! Record decoding with bounded redirect following.
//!
//! A record is `[range ip: 4][country field][area field]`. Each field either
//! holds an inline NUL-terminated string or starts with a redirect tag:
//!
//! ```text
//! 0x01 <u24 R>   rest of the record continues at R (no return)
//! 0x02 <u24 R>   this field is read from R, next field follows the pointer
//! ```
//!
//! Chains are followed iteratively with a hop budget, so a cyclic or
//! adversarial file fails with `MalformedDatabase` instead of recursing.

use super::format::{
    FieldTag, DEFAULT_MAX_REDIRECT_DEPTH, HEADER_SIZE, MAX_STRING_LEN, OFFSET_SIZE,
    RECORD_IP_SIZE,
};
use super::source::ByteSource;
use crate::{Error, Result};

/// Result of walking one field's redirect chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    /// The chain ended in a literal string.
    Literal {
        /// String bytes, terminator excluded
        bytes: Vec<u8>,
        /// Where the following field starts
        next: u64,
    },
    /// The hop budget ran out; `last_offset` is where decoding stopped.
    RedirectExhausted { last_offset: u64 },
}

/// Decodes country/area fields from a byte source.
pub struct RecordResolver<'a, S: ByteSource + ?Sized> {
    source: &'a S,
    max_depth: u32,
}

impl<'a, S: ByteSource + ?Sized> RecordResolver<'a, S> {
    /// Resolver with the default redirect cap.
    pub fn new(source: &'a S) -> Self {
        Self::with_max_depth(source, DEFAULT_MAX_REDIRECT_DEPTH)
    }

    /// Resolver allowing at most `max_depth` redirects per field.
    pub fn with_max_depth(source: &'a S, max_depth: u32) -> Self {
        Self { source, max_depth }
    }

    /// Decode the country and area of the record at `record_ptr`.
    pub fn read_record(&self, record_ptr: u32) -> Result<(Vec<u8>, Vec<u8>)> {
        let start = record_ptr as u64 + RECORD_IP_SIZE as u64;
        // The record body needs its IP prefix plus at least one field byte.
        if (record_ptr as usize) < HEADER_SIZE || start >= self.source.len() {
            return Err(Error::malformed(format!(
                "record pointer {:#x} outside record area of {}-byte file",
                record_ptr,
                self.source.len()
            )));
        }

        let (country, next) = self.read_field(start)?;
        let (area, _) = self.read_field(next)?;
        Ok((country, area))
    }

    /// Decode one field at `pos`, returning its bytes and the next field position.
    pub fn read_field(&self, pos: u64) -> Result<(Vec<u8>, u64)> {
        match self.decode_field(pos)? {
            FieldOutcome::Literal { bytes, next } => Ok((bytes, next)),
            FieldOutcome::RedirectExhausted { last_offset } => Err(Error::malformed(format!(
                "redirect chain from {:#x} exceeds {} hops (stopped at {:#x})",
                pos, self.max_depth, last_offset
            ))),
        }
    }

    /// Walk the redirect chain starting at `pos`.
    ///
    /// A `0x02` pins the next-field position to just past its pointer; the
    /// first one seen wins. A `0x01` leaves it to wherever the chain ends.
    pub fn decode_field(&self, pos: u64) -> Result<FieldOutcome> {
        let mut cur = pos;
        let mut resume: Option<u64> = None;
        let mut hops = 0u32;

        loop {
            let tag = self.byte_at(cur)?;
            let target = match FieldTag::from_u8(tag) {
                FieldTag::Literal(_) => {
                    let (bytes, end) = self.string_at(cur)?;
                    return Ok(FieldOutcome::Literal {
                        bytes,
                        next: resume.unwrap_or(end),
                    });
                }
                FieldTag::FullRedirect => self.redirect_target(cur)?,
                FieldTag::FieldRedirect => {
                    let target = self.redirect_target(cur)?;
                    resume.get_or_insert(cur + 1 + OFFSET_SIZE as u64);
                    target
                }
            };

            if hops == self.max_depth {
                return Ok(FieldOutcome::RedirectExhausted { last_offset: cur });
            }
            hops += 1;
            log::trace!("redirect {:#04x} at {:#x} -> {:#x}", tag, cur, target);
            cur = target;
        }
    }

    fn byte_at(&self, pos: u64) -> Result<u8> {
        if pos >= self.source.len() {
            return Err(Error::malformed(format!(
                "field offset {:#x} outside file of {} bytes",
                pos,
                self.source.len()
            )));
        }
        self.source.read_u8(pos)
    }

    /// Read and check the 3-byte target following the tag at `pos`.
    fn redirect_target(&self, pos: u64) -> Result<u64> {
        let ptr = pos + 1;
        if ptr + OFFSET_SIZE as u64 > self.source.len() {
            return Err(Error::malformed(format!(
                "redirect pointer at {:#x} truncated",
                ptr
            )));
        }
        let target = self.source.read_u24_le(ptr)? as u64;
        if target < HEADER_SIZE as u64 || target >= self.source.len() {
            return Err(Error::malformed(format!(
                "redirect at {:#x} points to {:#x}, outside {:#x}..{:#x}",
                pos,
                target,
                HEADER_SIZE,
                self.source.len()
            )));
        }
        Ok(target)
    }

    /// NUL-terminated string at `pos`; returns the bytes and the offset past the NUL.
    fn string_at(&self, pos: u64) -> Result<(Vec<u8>, u64)> {
        let bytes = self
            .source
            .read_until_nul(pos, MAX_STRING_LEN)?
            .ok_or_else(|| {
                Error::malformed(format!(
                    "unterminated string at {:#x} (limit {} bytes)",
                    pos, MAX_STRING_LEN
                ))
            })?;
        let end = pos + bytes.len() as u64 + 1;
        Ok((bytes, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Eight zero bytes standing in for the header, then `body`.
    fn file(body: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data.extend_from_slice(body);
        data
    }

    fn ptr(offset: u32) -> [u8; 3] {
        let b = offset.to_le_bytes();
        [b[0], b[1], b[2]]
    }

    #[test]
    fn test_literal_fields() {
        // record at 8: ip, "CN\0", "Beijing\0"
        let data = file(b"\0\0\0\0CN\0Beijing\0");
        let resolver = RecordResolver::new(&data);
        let (country, area) = resolver.read_record(8).unwrap();
        assert_eq!(country, b"CN");
        assert_eq!(area, b"Beijing");
    }

    #[test]
    fn test_empty_area() {
        let data = file(b"\0\0\0\0Testland\0\0");
        let (country, area) = RecordResolver::new(&data).read_record(8).unwrap();
        assert_eq!(country, b"Testland");
        assert!(area.is_empty());
    }

    #[test]
    fn test_full_redirect_moves_both_fields() {
        // 8: record ip, 0x01 -> X
        // X (=16): "Testland\0" "\0"
        let mut body = vec![0u8; 4];
        body.push(0x01);
        body.extend_from_slice(&ptr(16));
        body.extend_from_slice(b"Testland\0\0");
        let data = file(&body);

        let (country, area) = RecordResolver::new(&data).read_record(8).unwrap();
        assert_eq!(country, b"Testland");
        assert_eq!(area, b"");
    }

    #[test]
    fn test_field_redirect_restores_position() {
        // 8: ip, 0x02 -> 21, "Area\0"
        // 21: "A very long shared country name\0"
        let mut body = vec![0u8; 4];
        body.push(0x02);
        body.extend_from_slice(&ptr(21));
        body.extend_from_slice(b"Area\0");
        assert_eq!(HEADER_SIZE + body.len(), 21);
        body.extend_from_slice(b"A very long shared country name\0");
        let data = file(&body);

        let resolver = RecordResolver::new(&data);
        let (country, next) = resolver.read_field(12).unwrap();
        assert_eq!(country, b"A very long shared country name");
        assert_eq!(next, 16);

        let (country, area) = resolver.read_record(8).unwrap();
        assert_eq!(country, b"A very long shared country name");
        assert_eq!(area, b"Area");
    }

    #[test]
    fn test_full_then_field_redirect() {
        // 8: ip, 0x01 -> 16
        // 16: 0x02 -> 25, "Area\0"  (area follows the field pointer)
        // 25: "Country\0"
        let mut body = vec![0u8; 4];
        body.push(0x01);
        body.extend_from_slice(&ptr(16));
        body.push(0x02);
        body.extend_from_slice(&ptr(25));
        body.extend_from_slice(b"Area\0");
        assert_eq!(HEADER_SIZE + body.len(), 25);
        body.extend_from_slice(b"Country\0");
        let data = file(&body);

        let (country, area) = RecordResolver::new(&data).read_record(8).unwrap();
        assert_eq!(country, b"Country");
        assert_eq!(area, b"Area");
    }

    #[test]
    fn test_chained_field_redirect() {
        // 8: ip, 0x02 -> 20, 0x02 -> 24
        // 20: 0x02 -> 24
        // 24: "Final\0"
        let mut body = vec![0u8; 4];
        body.push(0x02);
        body.extend_from_slice(&ptr(20));
        body.push(0x02);
        body.extend_from_slice(&ptr(24));
        assert_eq!(HEADER_SIZE + body.len(), 20);
        body.push(0x02);
        body.extend_from_slice(&ptr(24));
        body.extend_from_slice(b"Final\0");
        let data = file(&body);

        let (country, area) = RecordResolver::new(&data).read_record(8).unwrap();
        assert_eq!(country, b"Final");
        assert_eq!(area, b"Final");
    }

    #[test]
    fn test_area_full_redirect() {
        // 8: ip, "C\0", 0x01 -> 20
        // 20: "Shared\0"
        let mut body = vec![0u8; 4];
        body.extend_from_slice(b"C\0");
        body.push(0x01);
        body.extend_from_slice(&ptr(20));
        body.resize(20 - HEADER_SIZE, 0xff);
        body.extend_from_slice(b"Shared\0");
        let data = file(&body);

        let (country, area) = RecordResolver::new(&data).read_record(8).unwrap();
        assert_eq!(country, b"C");
        assert_eq!(area, b"Shared");
    }

    #[test]
    fn test_self_cycle_is_malformed() {
        // 12: 0x02 -> 12
        let mut body = vec![0u8; 4];
        body.push(0x02);
        body.extend_from_slice(&ptr(12));
        let data = file(&body);

        let resolver = RecordResolver::new(&data);
        assert_eq!(
            resolver.decode_field(12).unwrap(),
            FieldOutcome::RedirectExhausted { last_offset: 12 }
        );
        assert!(matches!(
            resolver.read_record(8),
            Err(Error::MalformedDatabase(_))
        ));
    }

    #[test]
    fn test_two_node_cycle_is_malformed() {
        // 12: 0x01 -> 16, 16: 0x01 -> 12
        let mut body = vec![0u8; 4];
        body.push(0x01);
        body.extend_from_slice(&ptr(16));
        body.push(0x01);
        body.extend_from_slice(&ptr(12));
        let data = file(&body);

        assert!(matches!(
            RecordResolver::new(&data).read_record(8),
            Err(Error::MalformedDatabase(_))
        ));
    }

    #[test]
    fn test_depth_cap() {
        // 12: 0x02 -> 16 -> 20 -> 24: "X\0"  (three hops)
        let mut body = vec![0u8; 4];
        for target in [16u32, 20, 24] {
            body.push(0x02);
            body.extend_from_slice(&ptr(target));
        }
        body.extend_from_slice(b"X\0");
        let data = file(&body);

        assert_eq!(
            RecordResolver::with_max_depth(&data, 3).read_field(12).unwrap(),
            (b"X".to_vec(), 16)
        );
        assert!(RecordResolver::with_max_depth(&data, 2).read_field(12).is_err());
    }

    #[test]
    fn test_redirect_out_of_file() {
        let mut body = vec![0u8; 4];
        body.push(0x01);
        body.extend_from_slice(&ptr(0xff_ffff));
        let data = file(&body);
        assert!(matches!(
            RecordResolver::new(&data).read_record(8),
            Err(Error::MalformedDatabase(_))
        ));
    }

    #[test]
    fn test_redirect_into_header() {
        let mut body = vec![0u8; 4];
        body.push(0x02);
        body.extend_from_slice(&ptr(3));
        let data = file(&body);
        assert!(matches!(
            RecordResolver::new(&data).read_record(8),
            Err(Error::MalformedDatabase(_))
        ));
    }

    #[test]
    fn test_truncated_redirect_pointer() {
        let mut body = vec![0u8; 4];
        body.extend_from_slice(&[0x02, 0x10]);
        let data = file(&body);
        assert!(matches!(
            RecordResolver::new(&data).read_record(8),
            Err(Error::MalformedDatabase(_))
        ));
    }

    #[test]
    fn test_unterminated_string() {
        let data = file(b"\0\0\0\0abc");
        assert!(matches!(
            RecordResolver::new(&data).read_record(8),
            Err(Error::MalformedDatabase(_))
        ));
    }

    #[test]
    fn test_missing_area_field() {
        // country ends exactly at EOF, so the area position is out of range
        let data = file(b"\0\0\0\0CN\0");
        assert!(matches!(
            RecordResolver::new(&data).read_record(8),
            Err(Error::MalformedDatabase(_))
        ));
    }

    #[test]
    fn test_record_pointer_out_of_range() {
        let data = file(b"\0\0\0\0CN\0\0");
        assert!(RecordResolver::new(&data).read_record(1000).is_err());
    }

    #[test]
    fn test_record_pointer_into_header() {
        let data = file(b"\0\0\0\0CN\0\0");
        for ptr in 0..HEADER_SIZE as u32 {
            assert!(matches!(
                RecordResolver::new(&data).read_record(ptr),
                Err(Error::MalformedDatabase(_))
            ));
        }
    }

    #[test]
    fn test_record_without_field_bytes() {
        // IP prefix runs right up to EOF
        let data = file(b"\0\0\0\0");
        assert!(matches!(
            RecordResolver::new(&data).read_record(8),
            Err(Error::MalformedDatabase(_))
        ));
    }
}
