use std::fmt;

pub const BASES: &[u8; 4] = b"ACGT";
pub const DELETE_CODE: u8 = 4;
pub const INSERT_CODE: u8 = 5;
pub const EMPTY_CODE: u8 = 6;

/// Maps a nucleotide to its base code, case-insensitively.
pub fn base_to_code(base: u8) -> Option<u8> {
    match base.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

pub fn code_to_char(code: u8) -> char {
    match code {
        0..=3 => BASES[code as usize] as char,
        DELETE_CODE => '-',
        INSERT_CODE => '*',
        _ => '_',
    }
}

/// Complement of a nucleotide code; gap and sentinel codes are unchanged.
pub fn complement_code(code: u8) -> u8 {
    if code < 4 {
        3 - code
    } else {
        code
    }
}

/// One read's contribution to one pileup cell.
///
/// `base` is stored in read orientation. Use [`Observation::strand_corrected_base`]
/// to compare against the reference strand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation<E> {
    pub base: u8,
    pub reverse: bool,
    pub evidence: E,
}

impl<E: Default> Observation<E> {
    pub fn empty() -> Self {
        Self {
            base: EMPTY_CODE,
            reverse: false,
            evidence: E::default(),
        }
    }

    pub fn gap(reverse: bool) -> Self {
        Self {
            base: DELETE_CODE,
            reverse,
            evidence: E::default(),
        }
    }

    pub fn insert_marker(reverse: bool) -> Self {
        Self {
            base: INSERT_CODE,
            reverse,
            evidence: E::default(),
        }
    }
}

impl<E: Default> Default for Observation<E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<E> Observation<E> {
    pub fn is_empty(&self) -> bool {
        self.base == EMPTY_CODE
    }

    /// Deletions and insert markers both count as gaps.
    pub fn is_gap(&self) -> bool {
        self.base == DELETE_CODE || self.base == INSERT_CODE
    }

    pub fn is_base(&self) -> bool {
        self.base < 4
    }

    pub fn strand_corrected_base(&self) -> u8 {
        if self.reverse {
            complement_code(self.base)
        } else {
            self.base
        }
    }
}

impl<E: fmt::Display> fmt::Display for Observation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = code_to_char(self.base);
        if !self.is_base() {
            return write!(f, "{}", symbol);
        }
        // Lowercase marks reverse-strand observations
        let symbol = if self.reverse {
            symbol.to_ascii_lowercase()
        } else {
            symbol
        };
        write!(f, "{}{}", symbol, self.evidence)
    }
}
