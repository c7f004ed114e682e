//! Factory calibration coefficients (COEF, registers 0x10 - 0x21).
//!
//! The 18 byte block packs nine two's complement coefficients MSB first:
//!
//! | coefficient | bits | source                                  |
//! |-------------|------|-----------------------------------------|
//! | c0          | 12   | `b[0]`, `b[1]` high nibble              |
//! | c1          | 12   | `b[1]` low nibble, `b[2]`               |
//! | c00         | 20   | `b[3]`, `b[4]`, `b[5]` high nibble      |
//! | c10         | 20   | `b[5]` low nibble, `b[6]`, `b[7]`       |
//! | c01 .. c30  | 16   | `b[8..18]`, two bytes each              |

use crate::dps310::COEF_LEN;

/// Interprets the low `bits` bits of `value` as a two's complement number.
///
/// Values above `2^(bits-1) - 1` are negative and have `2^bits` subtracted.
/// `bits` must be in `1..=31`.
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    let value = value & ((1u32 << bits) - 1);
    let max = (1u32 << (bits - 1)) - 1;
    if value > max {
        value as i32 - (1i32 << bits)
    } else {
        value as i32
    }
}

/// Calibration coefficients, already sign extended.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Calibration {
    pub c0: f32,
    pub c1: f32,
    pub c00: f32,
    pub c10: f32,
    pub c01: f32,
    pub c11: f32,
    pub c20: f32,
    pub c21: f32,
    pub c30: f32,
}

impl Calibration {
    pub fn from_bytes(b: &[u8; COEF_LEN]) -> Self {
        let c0 = (b[0] as u32) << 4 | (b[1] as u32) >> 4;
        let c1 = (b[1] as u32 & 0x0f) << 8 | b[2] as u32;
        let c00 = (b[3] as u32) << 12 | (b[4] as u32) << 4 | (b[5] as u32) >> 4;
        let c10 = (b[5] as u32 & 0x0f) << 16 | (b[6] as u32) << 8 | b[7] as u32;
        let word = |i: usize| sign_extend(u32::from(u16::from_be_bytes([b[i], b[i + 1]])), 16) as f32;

        Self {
            c0: sign_extend(c0, 12) as f32,
            c1: sign_extend(c1, 12) as f32,
            c00: sign_extend(c00, 20) as f32,
            c10: sign_extend(c10, 20) as f32,
            c01: word(8),
            c11: word(10),
            c20: word(12),
            c21: word(14),
            c30: word(16),
        }
    }
}
