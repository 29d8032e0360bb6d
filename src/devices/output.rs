// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// PGM output status

use super::flags::ChangeBank;

/// PGM outputs supported by the keybus.
pub const MAX_PGMS: usize = 14;

/// Active/idle state and change flags for PGM outputs 1-14 (stored 0-based).
pub type PgmBank = ChangeBank<MAX_PGMS>;

/// 1-based PGM number as used on the wire and in topics.
pub fn pgm_number(index: usize) -> u32 {
    index as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pgm_bank() {
        let mut pgms = PgmBank::new();
        assert_eq!(pgms.capacity(), 14);
        assert!(pgms.update(13, true));
        assert_eq!(pgm_number(13), 14);
        assert!(!pgms.update(14, true));
    }
}
