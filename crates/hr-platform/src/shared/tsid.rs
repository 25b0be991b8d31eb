//! TSID Generator
//!
//! Time-sorted identifiers encoded as 13 Crockford Base32 characters.

use rand::Rng;
use std::sync::atomic::{AtomicU16, Ordering};

/// Crockford Base32 alphabet (excludes I, L, O, U)
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

const TSID_LEN: usize = 13;

static COUNTER: AtomicU16 = AtomicU16::new(0);

pub struct TsidGenerator;

impl TsidGenerator {
    /// Generate a new TSID, e.g. `"0HZXEQ5Y8JY5Z"`.
    ///
    /// Layout (64 bits): 42 bits of milliseconds since the Unix epoch,
    /// 10 random bits, 12 bits of a process-wide counter.
    pub fn generate() -> String {
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed) as u64;
        let random: u64 = rand::thread_rng().gen_range(0..1024);

        let tsid = ((millis & 0x3FF_FFFF_FFFF) << 22) | (random << 12) | (counter & 0xFFF);
        encode_crockford(tsid)
    }

    /// Whether `value` has the shape of a TSID.
    pub fn is_valid(value: &str) -> bool {
        value.len() == TSID_LEN
            && value
                .bytes()
                .all(|b| ALPHABET.contains(&b.to_ascii_uppercase()))
    }
}

fn encode_crockford(mut value: u64) -> String {
    let mut out = [b'0'; TSID_LEN];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(value & 0x1F) as usize];
        value >>= 5;
    }
    out.iter().map(|b| *b as char).collect()
}
