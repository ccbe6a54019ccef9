//! On-disk message record header. Byte-exact: two magic
//! halves, a version/record-length/flags triplet, the key quadruple
//! (tnum/unum/onum/snum), a creation timestamp, and the three length
//! fields needed to validate the body that follows.

use std::convert::TryInto;

pub const MAGIC1: u16 = 0x4d47; // "MG"
pub const MAGIC2: u16 = 0x4d41; // "MA"
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 60;

pub const FLAG_COMPRESS_LZO: u16 = 0x0001;
pub const FLAG_COMPRESS_ZLIB: u16 = 0x0002;
pub const FLAG_COMPRESS_BZIP: u16 = 0x0004;
pub const FLAG_ENCRYPTED: u16 = 0x0008;
const FLAG_COMPRESS_MASK: u16 = FLAG_COMPRESS_LZO | FLAG_COMPRESS_ZLIB | FLAG_COMPRESS_BZIP;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionEngine {
    None,
    Lzo,
    Zlib,
    Bzip,
}

impl CompressionEngine {
    pub fn from_flags(flags: u16) -> Self {
        match flags & FLAG_COMPRESS_MASK {
            FLAG_COMPRESS_LZO => CompressionEngine::Lzo,
            FLAG_COMPRESS_ZLIB => CompressionEngine::Zlib,
            FLAG_COMPRESS_BZIP => CompressionEngine::Bzip,
            _ => CompressionEngine::None,
        }
    }

    pub fn flag_bit(self) -> u16 {
        match self {
            CompressionEngine::None => 0,
            CompressionEngine::Lzo => FLAG_COMPRESS_LZO,
            CompressionEngine::Zlib => FLAG_COMPRESS_ZLIB,
            CompressionEngine::Bzip => FLAG_COMPRESS_BZIP,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecordHeader {
    pub flags: u16,
    pub tnum: u64,
    pub unum: u64,
    pub onum: u64,
    pub snum: u64,
    pub created: i64,
    pub compressed_len: u32,
    pub encrypted_len: u32,
    pub plaintext_len: u32,
}

impl RecordHeader {
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn compression(&self) -> CompressionEngine {
        CompressionEngine::from_flags(self.flags)
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&MAGIC1.to_be_bytes());
        buf[2..4].copy_from_slice(&MAGIC2.to_be_bytes());
        buf[4] = VERSION;
        buf[5] = HEADER_LEN as u8;
        buf[6..8].copy_from_slice(&self.flags.to_be_bytes());
        buf[8..16].copy_from_slice(&self.tnum.to_be_bytes());
        buf[16..24].copy_from_slice(&self.unum.to_be_bytes());
        buf[24..32].copy_from_slice(&self.onum.to_be_bytes());
        buf[32..40].copy_from_slice(&self.snum.to_be_bytes());
        buf[40..48].copy_from_slice(&self.created.to_be_bytes());
        buf[48..52].copy_from_slice(&self.compressed_len.to_be_bytes());
        buf[52..56].copy_from_slice(&self.encrypted_len.to_be_bytes());
        buf[56..60].copy_from_slice(&self.plaintext_len.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, &'static str> {
        if buf.len() < HEADER_LEN {
            return Err("record shorter than header");
        }
        let magic1 = u16::from_be_bytes(buf[0..2].try_into().unwrap());
        let magic2 = u16::from_be_bytes(buf[2..4].try_into().unwrap());
        if magic1 != MAGIC1 || magic2 != MAGIC2 {
            return Err("bad magic");
        }
        let version = buf[4];
        if version != VERSION {
            return Err("unsupported record version");
        }
        let record_length = buf[5] as usize;
        if record_length != HEADER_LEN {
            return Err("unexpected record length");
        }
        let flags = u16::from_be_bytes(buf[6..8].try_into().unwrap());
        let tnum = u64::from_be_bytes(buf[8..16].try_into().unwrap());
        let unum = u64::from_be_bytes(buf[16..24].try_into().unwrap());
        let onum = u64::from_be_bytes(buf[24..32].try_into().unwrap());
        let snum = u64::from_be_bytes(buf[32..40].try_into().unwrap());
        let created = i64::from_be_bytes(buf[40..48].try_into().unwrap());
        let compressed_len = u32::from_be_bytes(buf[48..52].try_into().unwrap());
        let encrypted_len = u32::from_be_bytes(buf[52..56].try_into().unwrap());
        let plaintext_len = u32::from_be_bytes(buf[56..60].try_into().unwrap());

        Ok(RecordHeader {
            flags,
            tnum,
            unum,
            onum,
            snum,
            created,
            compressed_len,
            encrypted_len,
            plaintext_len,
        })
    }
}
