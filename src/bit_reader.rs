#![forbid(unsafe_code)]

use std::io::{self, BufRead};

use byteorder::ReadBytesExt;

////////////////////////////////////////////////////////////////////////////////

const MAX_SEQUENCE_LEN: u8 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BitSequence {
    bits: u16,
    len: u8,
}

impl BitSequence {
    pub fn new(bits: u16, len: u8) -> Self {
        assert!(len <= MAX_SEQUENCE_LEN);
        Self {
            bits: bits & low_mask(len) as u16,
            len,
        }
    }

    pub fn empty() -> Self {
        Self { bits: 0, len: 0 }
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    /// Append `other` after the bits of `self`, most significant bit first.
    pub fn concat(self, other: Self) -> Self {
        assert!(self.len + other.len <= MAX_SEQUENCE_LEN);
        Self {
            bits: ((u32::from(self.bits) << other.len) | u32::from(other.bits)) as u16,
            len: self.len + other.len,
        }
    }
}

fn low_mask(len: u8) -> u32 {
    (1u32 << len) - 1
}

////////////////////////////////////////////////////////////////////////////////

/// Reads a byte stream as the LSB-first bit stream deflate is packed in.
pub struct BitReader<T> {
    stream: T,
    buffer: u32,
    buffered: u8,
}

impl<T: BufRead> BitReader<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            buffer: 0,
            buffered: 0,
        }
    }

    pub fn read_bits(&mut self, len: u8) -> io::Result<BitSequence> {
        assert!(len <= MAX_SEQUENCE_LEN && len != 0);
        while self.buffered < len {
            let byte = self.stream.read_u8()?;
            self.buffer |= u32::from(byte) << self.buffered;
            self.buffered += 8;
        }

        let bits = self.buffer & low_mask(len);
        self.buffer >>= len;
        self.buffered -= len;

        Ok(BitSequence::new(bits as u16, len))
    }

    /// Like `read_bits`, but for the zero-width fields deflate tables allow.
    pub fn read_extra(&mut self, len: u8) -> io::Result<u16> {
        if len == 0 {
            return Ok(0);
        }
        Ok(self.read_bits(len)?.bits())
    }

    /// Discard all the unread bits in the current byte and return a mutable reference
    /// to the underlying reader.
    pub fn align_to_byte(&mut self) -> &mut T {
        debug_assert!(self.buffered < 8);
        self.buffer = 0;
        self.buffered = 0;
        &mut self.stream
    }

    /// Give back the underlying reader positioned right after the last consumed byte.
    pub fn into_inner(self) -> T {
        self.stream
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_bits() -> io::Result<()> {
        let data: &[u8] = &[0b01100011, 0b01011011, 0b10101111];
        let mut reader = BitReader::new(data);
        assert_eq!(reader.read_bits(1)?, BitSequence::new(0b1, 1));
        assert_eq!(reader.read_bits(2)?, BitSequence::new(0b01, 2));
        assert_eq!(reader.read_bits(3)?, BitSequence::new(0b100, 3));
        assert_eq!(reader.read_bits(4)?, BitSequence::new(0b1101, 4));
        assert_eq!(reader.read_bits(5)?, BitSequence::new(0b10110, 5));
        assert_eq!(reader.read_bits(8)?, BitSequence::new(0b01011110, 8));
        assert_eq!(
            reader.read_bits(2).unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
        Ok(())
    }

    #[test]
    fn read_full_width() -> io::Result<()> {
        let data: &[u8] = &[0x34, 0x12, 0xff];
        let mut reader = BitReader::new(data);
        assert_eq!(reader.read_bits(16)?.bits(), 0x1234);
        assert_eq!(reader.read_extra(0)?, 0);
        assert_eq!(reader.read_extra(8)?, 0xff);
        Ok(())
    }

    #[test]
    fn align_to_byte() -> io::Result<()> {
        let data: &[u8] = &[0b01100011, 0b11011011, 0b10101111];
        let mut reader = BitReader::new(data);
        assert_eq!(reader.read_bits(3)?, BitSequence::new(0b011, 3));
        assert_eq!(reader.align_to_byte().read_u8()?, 0b11011011);
        assert_eq!(reader.read_bits(8)?, BitSequence::new(0b10101111, 8));
        Ok(())
    }

    #[test]
    fn concat() {
        let head = BitSequence::new(0b10, 2);
        let tail = BitSequence::new(0b011, 3);
        assert_eq!(head.concat(tail), BitSequence::new(0b10011, 5));
        assert_eq!(BitSequence::empty().concat(tail), tail);
    }
}
