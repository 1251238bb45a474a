#![forbid(unsafe_code)]

////////////////////////////////////////////////////////////////////////////////

const MOD_ADLER: u32 = 65521;

/// Largest number of bytes that can be summed before `b` may overflow a `u32`.
const NMAX: usize = 5552;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Adler32 {
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    pub fn update(&mut self, data: &[u8]) {
        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                self.a += u32::from(byte);
                self.b += self.a;
            }
            self.a %= MOD_ADLER;
            self.b %= MOD_ADLER;
        }
    }

    pub fn finalize(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

#[cfg(test)]
pub fn checksum(data: &[u8]) -> u32 {
    let mut digest = Adler32::new();
    digest.update(data);
    digest.finalize()
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        assert_eq!(checksum(b""), 1);
        assert_eq!(checksum(b"hello"), 0x062c_0215);
        assert_eq!(checksum(b"hello world"), 0x1a0b_045d);
        assert_eq!(checksum(b"Wikipedia"), 0x11e6_0398);
    }

    #[test]
    fn incremental_matches_oneshot() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 7 % 251) as u8).collect();

        let mut digest = Adler32::new();
        for piece in data.chunks(333) {
            digest.update(piece);
        }

        assert_eq!(digest.finalize(), checksum(&data));
    }

    #[test]
    fn long_run_of_max_bytes_does_not_overflow() {
        let data = vec![0xffu8; 3 * NMAX + 17];
        let mut digest = Adler32::new();
        digest.update(&data);

        let (mut a, mut b) = (1u64, 0u64);
        for &byte in &data {
            a = (a + u64::from(byte)) % u64::from(MOD_ADLER);
            b = (b + a) % u64::from(MOD_ADLER);
        }
        assert_eq!(u64::from(digest.finalize()), (b << 16) | a);
    }
}
