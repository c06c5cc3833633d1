//! CRC validation for protected MPEG audio frames.
//!
//! Frames with the protection bit cleared carry a 16-bit CRC right after the
//! header. The checksum is CRC-16 with polynomial 0x8005, initial value
//! 0xFFFF, processed MSB first with no final xor.

/// CRC algorithm parameters: polynomial and initial value.
pub struct Algorithm<T> {
    poly: T,
    init: T,
}

/// CRC-16 algorithm protecting MPEG audio header and side information.
pub const CRC_MPEG_AUDIO_ALG: Algorithm<u16> = Algorithm {
    poly: 0x8005,
    init: 0xFFFF,
};

/// Shifts `len` bits through a CRC-16 register.
#[inline(always)]
pub const fn crc16(poly: u16, mut value: u16, len: usize) -> u16 {
    value <<= 8;

    let mut i = 0;
    while i < len {
        value = (value << 1) ^ (((value >> 15) & 1) * poly);
        i += 1;
    }

    value
}

#[inline(always)]
const fn crc16_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc16(poly, i as u16, 8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc16 {
    pub poly: u16,
    pub init: u16,
    table: [u16; 256],
}

impl Crc16 {
    pub const fn new(algorithm: &Algorithm<u16>) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            table: crc16_table(algorithm.poly),
        }
    }

    const fn table_entry(&self, index: u16) -> u16 {
        self.table[(index & 0xFF) as usize]
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u16, bytes: &[u8]) -> u16 {
        let mut i = 0;

        while i < bytes.len() {
            crc = self.table_entry((crc >> 8) ^ bytes[i] as u16) ^ (crc << 8);
            i += 1;
        }

        crc
    }

    #[inline(always)]
    pub const fn checksum(&self, bytes: &[u8]) -> u16 {
        self.update(self.init, bytes)
    }
}

pub static CRC_MPEG_AUDIO: Crc16 = Crc16::new(&CRC_MPEG_AUDIO_ALG);

#[test]
fn check_value() {
    // CRC-16/CMS catalogue check value
    assert_eq!(CRC_MPEG_AUDIO.checksum(b"123456789"), 0xAEE7);
}

#[test]
fn split_update_matches_checksum() {
    let crc = &CRC_MPEG_AUDIO;
    let partial = crc.update(crc.init, b"1234");
    assert_eq!(crc.update(partial, b"56789"), crc.checksum(b"123456789"));
}
