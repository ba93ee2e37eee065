//! Wire layout of event messages
//!
//! The byte layout here is the inter-stage contract: a fixed header, then
//! the payload, then the event metadata block. All multi-byte fields are
//! native byte order; the pipeline runs on a single host.
//!
//! Processor events (TTL / text / binary array):
//!
//! ```text
//! offset  size  field
//!      0     1  base tag (1 = processor event)
//!      1     1  event kind tag, from the channel kind
//!      2     2  source processor id
//!      4     2  sub-processor index
//!      6     2  source-local channel index
//!      8     8  timestamp (sample clock)
//!     16     2  virtual channel index
//!     18     6  reserved, zero
//!     24     D  payload, D = channel data size
//!   24+D     M  metadata values, M = total event metadata size
//! ```
//!
//! Spike events:
//!
//! ```text
//! offset  size  field
//!      0     1  base tag (2 = spike event)
//!      1     1  electrode kind tag
//!      2     2  source processor id
//!      4     2  sub-processor index
//!      6     2  source-local channel index
//!      8     8  timestamp (sample clock)
//!     16     2  reserved, zero
//!     18   4*C  thresholds, ascending lane order, C = channel count
//! 18+4C     D  samples, C * total_samples f32, channel-major
//!    end     M  metadata values
//! ```

use crate::error::Error;

/// Header size of a processor event message
pub const EVENT_BASE_SIZE: usize = 24;
/// Header size of a spike event message
pub const SPIKE_BASE_SIZE: usize = 18;

pub(crate) const OFF_BASE_TAG: usize = 0;
pub(crate) const OFF_KIND_TAG: usize = 1;
pub(crate) const OFF_SOURCE_ID: usize = 2;
pub(crate) const OFF_SUB_IDX: usize = 4;
pub(crate) const OFF_SOURCE_INDEX: usize = 6;
pub(crate) const OFF_TIMESTAMP: usize = 8;
pub(crate) const OFF_CHANNEL: usize = 16;

// Reserved tails: 6 bytes after the virtual channel, 2 after the timestamp
const _: () = assert!(EVENT_BASE_SIZE == OFF_CHANNEL + 2 + 6);
const _: () = assert!(SPIKE_BASE_SIZE == OFF_TIMESTAMP + 8 + 2);

/// Writes primitive fields into a caller-provided region, in order.
/// Fails with `PayloadTooSmall` when the region cannot hold the write.
pub(crate) struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Writer<'a> {
        Writer { buf, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            return Err(Error::PayloadTooSmall);
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    pub fn put_u8(&mut self, v: u8) -> Result<(), Error> {
        self.put(&[v])
    }

    pub fn put_u16(&mut self, v: u16) -> Result<(), Error> {
        self.put(&v.to_ne_bytes())
    }

    pub fn put_u64(&mut self, v: u64) -> Result<(), Error> {
        self.put(&v.to_ne_bytes())
    }

    pub fn put_f32(&mut self, v: f32) -> Result<(), Error> {
        self.put(&v.to_ne_bytes())
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.put(bytes)
    }

    /// Write `n` zero bytes (reserved regions, text padding)
    pub fn put_zeros(&mut self, n: usize) -> Result<(), Error> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(Error::PayloadTooSmall);
        }
        self.buf[self.pos..end].fill(0);
        self.pos = end;
        Ok(())
    }
}

/// Reads primitive fields from a message, in order.
/// Fails with `MalformedMessage` when the read runs past the end.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Reader<'a> {
        Reader { buf, pos: 0 }
    }

    pub fn seek(&mut self, pos: usize) -> Result<(), Error> {
        if pos > self.buf.len() {
            return Err(Error::MalformedMessage);
        }
        self.pos = pos;
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(Error::MalformedMessage);
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, Error> {
        let b = self.take(2)?;
        Ok(u16::from_ne_bytes([b[0], b[1]]))
    }

    pub fn u64(&mut self) -> Result<u64, Error> {
        let b = self.take(8)?;
        Ok(u64::from_ne_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn f32(&mut self) -> Result<f32, Error> {
        let b = self.take(4)?;
        Ok(f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        self.take(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_reader_roundtrip() {
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        w.put_u8(0xAB).unwrap();
        w.put_u16(0x1234).unwrap();
        w.put_u64(0x0102030405060708).unwrap();
        w.put_f32(-1.5).unwrap();
        w.put_u8(9).unwrap();
        assert_eq!(w.pos(), 16);
        assert!(w.put_u8(0).is_err());

        let mut r = Reader::new(&buf);
        assert_eq!(r.u8().unwrap(), 0xAB);
        assert_eq!(r.u16().unwrap(), 0x1234);
        assert_eq!(r.u64().unwrap(), 0x0102030405060708);
        assert_eq!(r.f32().unwrap(), -1.5);
        assert_eq!(r.u8().unwrap(), 9);
        assert_eq!(r.u8().unwrap_err(), Error::MalformedMessage);
    }

    #[test]
    fn seek_bounds() {
        let buf = [0u8; 4];
        let mut r = Reader::new(&buf);
        assert!(r.seek(4).is_ok());
        assert!(r.seek(5).is_err());
    }
}
