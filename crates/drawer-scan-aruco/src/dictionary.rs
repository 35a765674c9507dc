//! Dictionary metadata and packed marker codes.

/// A fixed ArUco-style dictionary.
#[derive(Clone, Copy, Debug)]
pub struct Dictionary {
    /// Human-readable name, as used in configuration files.
    pub name: &'static str,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// Maximum error-correcting Hamming distance supported by the dictionary.
    pub max_correction_bits: u8,
    /// One `u64` per marker id, encoding the inner `marker_size × marker_size` bits.
    ///
    /// Bits are stored in row-major order (`idx = y * n + x`) with **black = 1**.
    pub codes: &'static [u64],
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }
}

/// Convert the two-byte OpenCV row-major, MSB-first, white = 1 layout of a
/// 4×4 marker into the packed black = 1 form used here.
const fn code_4x4(hi: u8, lo: u8) -> u64 {
    let bytes = [hi, lo];
    let mut code = 0u64;
    let mut k = 0;
    while k < 16 {
        let white = (bytes[k / 8] >> (7 - (k % 8))) & 1;
        if white == 0 {
            code |= 1u64 << k;
        }
        k += 1;
    }
    code
}

/// Leading ids of OpenCV's `DICT_4X4_50`.
///
/// Only ids `0..8` are embedded; drawer cases use ids 1 to 4.
static DICT_4X4_50_CODES: [u64; 8] = [
    code_4x4(181, 50),
    code_4x4(15, 154),
    code_4x4(51, 45),
    code_4x4(153, 70),
    code_4x4(84, 158),
    code_4x4(121, 205),
    code_4x4(158, 46),
    code_4x4(196, 242),
];

pub const DICT_4X4_50: Dictionary = Dictionary {
    name: "DICT_4X4_50",
    marker_size: 4,
    max_correction_bits: 1,
    codes: &DICT_4X4_50_CODES,
};

/// Look up an embedded dictionary by name (case-insensitive).
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    [DICT_4X4_50]
        .into_iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
}
