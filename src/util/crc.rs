//! CRC-32 Castagnoli checksum utilities.

/// Compute the CRC-32C (Castagnoli) checksum of the given data.
pub fn crc32(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Compute the CRC-32C checksum of multiple data slices.
pub fn crc32_multi(slices: &[&[u8]]) -> u32 {
    let mut crc = 0u32;
    for slice in slices {
        crc = crc32c::crc32c_append(crc, slice);
    }
    crc
}

/// Verify that data matches the expected checksum.
pub fn verify_crc(data: &[u8], expected: u32) -> bool {
    crc32(data) == expected
}
