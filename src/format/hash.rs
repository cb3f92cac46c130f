//! Key hash used to select a table slot.
//!
//! This is Paul Hsieh's SuperFastHash exactly as the cache writer computes
//! it, including the sign extension of trailing bytes (the writer hashes a
//! `char*`, which is signed on the platforms that produce these caches).

/// Hash `data` the way the cache writer does.
///
/// Returns 0 for empty input.
#[must_use]
pub fn super_fast_hash(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }

    let mut hash = data.len() as u32;
    let mut chunks = data.chunks_exact(4);

    for chunk in &mut chunks {
        hash = hash.wrapping_add(get16(chunk, 0));
        let tmp = (get16(chunk, 2) << 11) ^ hash;
        hash = (hash << 16) ^ tmp;
        hash = hash.wrapping_add(hash >> 11);
    }

    let rem = chunks.remainder();
    match rem.len() {
        3 => {
            hash = hash.wrapping_add(get16(rem, 0));
            hash ^= hash << 16;
            hash ^= (signed(rem[2]) << 18) as u32;
            hash = hash.wrapping_add(hash >> 11);
        }
        2 => {
            hash = hash.wrapping_add(get16(rem, 0));
            hash ^= hash << 11;
            hash = hash.wrapping_add(hash >> 17);
        }
        1 => {
            hash = hash.wrapping_add(signed(rem[0]) as u32);
            hash ^= hash << 10;
            hash = hash.wrapping_add(hash >> 1);
        }
        _ => {}
    }

    // Force "avalanching" of final 127 bits
    hash ^= hash << 3;
    hash = hash.wrapping_add(hash >> 5);
    hash ^= hash << 4;
    hash = hash.wrapping_add(hash >> 17);
    hash ^= hash << 25;
    hash = hash.wrapping_add(hash >> 6);

    hash
}

fn get16(bytes: &[u8], offset: usize) -> u32 {
    u32::from(u16::from_le_bytes([bytes[offset], bytes[offset + 1]]))
}

fn signed(byte: u8) -> i32 {
    i32::from(byte as i8)
}
