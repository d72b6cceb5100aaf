use crate::application::errors::{ChecksumRegion, PipelineError, Result};

/// Added after rotation when masking a CRC.
const MASK_DELTA: u32 = 0xa282_ead8;

/// Masked CRC-32C used by the record framing.
///
/// The raw Castagnoli CRC is rotated right by 15 bits and offset by a fixed
/// constant, so that a CRC computed over bytes that themselves embed CRCs
/// does not degenerate. Readers and writers of other implementations use the
/// same transform, so it must stay bit-exact.
pub struct RecordChecksum;

impl RecordChecksum {
    pub fn compute(bytes: &[u8]) -> u32 {
        Self::mask(crc32c::crc32c(bytes))
    }

    pub fn mask(crc: u32) -> u32 {
        crc.rotate_right(15).wrapping_add(MASK_DELTA)
    }

    pub fn verify(bytes: &[u8], expected: u32, region: ChecksumRegion) -> Result<()> {
        let actual = Self::compute(bytes);
        if actual != expected {
            return Err(PipelineError::ChecksumMismatch {
                region,
                expected,
                actual,
            });
        }
        Ok(())
    }
}
