use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

bitflags! {
    /// Which neighbours a border cell connects to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BorderFlags: u8 {
        const LEFT = 1 << 0;
        const TOP = 1 << 1;
        const RIGHT = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

static DRAW_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Token identifying one logical border drawing.
///
/// Border flags accumulate on a cell only while the stored id matches the
/// incoming one; a different id replaces the stored adjacency outright. Two
/// box draws sharing an id therefore merge into tees and crosses, while an
/// unrelated later draw starts fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BorderDrawId(u64);

impl BorderDrawId {
    /// Allocate a fresh 60-bit token.
    pub fn next() -> Self {
        Self(DRAW_ID_COUNTER.fetch_add(1, Ordering::Relaxed) & ((1 << 60) - 1))
    }
}

/// The eleven glyphs a border drawing can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderCharSet {
    pub horizontal: char,
    pub vertical: char,
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub cross: char,
    pub tee_up: char,
    pub tee_down: char,
    pub tee_left: char,
    pub tee_right: char,
}

impl BorderCharSet {
    /// Unicode light box drawing.
    pub const UNICODE_LIGHT: BorderCharSet = BorderCharSet {
        horizontal: '─',
        vertical: '│',
        top_left: '┌',
        top_right: '┐',
        bottom_left: '└',
        bottom_right: '┘',
        cross: '┼',
        tee_up: '┴',
        tee_down: '┬',
        tee_left: '┤',
        tee_right: '├',
    };

    /// Plain ASCII fallback.
    pub const ASCII: BorderCharSet = BorderCharSet {
        horizontal: '-',
        vertical: '|',
        top_left: '+',
        top_right: '+',
        bottom_left: '+',
        bottom_right: '+',
        cross: '+',
        tee_up: '+',
        tee_down: '+',
        tee_left: '+',
        tee_right: '+',
    };

    /// Select the glyph for an adjacency set.
    ///
    /// Degenerate single-direction cases fall back to the straight glyphs;
    /// the empty set is a caller error.
    pub fn glyph(&self, flags: BorderFlags) -> char {
        debug_assert!(!flags.is_empty(), "border glyph for empty adjacency");
        let l = flags.contains(BorderFlags::LEFT);
        let t = flags.contains(BorderFlags::TOP);
        let r = flags.contains(BorderFlags::RIGHT);
        let b = flags.contains(BorderFlags::BOTTOM);
        match (l, t, r, b) {
            (true, true, true, true) => self.cross,
            (true, true, true, false) => self.tee_up,
            (true, false, true, true) => self.tee_down,
            (false, true, true, true) => self.tee_right,
            (true, true, false, true) => self.tee_left,
            (false, false, true, true) => self.top_left,
            (true, false, false, true) => self.top_right,
            (false, true, true, false) => self.bottom_left,
            (true, true, false, false) => self.bottom_right,
            (false, true, false, true) => self.vertical,
            (false, true, false, false) => self.vertical,
            (false, false, false, true) => self.vertical,
            _ => self.horizontal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_glyphs() {
        let set = BorderCharSet::UNICODE_LIGHT;
        assert_eq!(set.glyph(BorderFlags::RIGHT | BorderFlags::BOTTOM), '┌');
        assert_eq!(set.glyph(BorderFlags::LEFT | BorderFlags::BOTTOM), '┐');
        assert_eq!(set.glyph(BorderFlags::RIGHT | BorderFlags::TOP), '└');
        assert_eq!(set.glyph(BorderFlags::LEFT | BorderFlags::TOP), '┘');
    }

    #[test]
    fn test_tee_and_cross_glyphs() {
        let set = BorderCharSet::UNICODE_LIGHT;
        assert_eq!(set.glyph(BorderFlags::all()), '┼');
        assert_eq!(
            set.glyph(BorderFlags::LEFT | BorderFlags::RIGHT | BorderFlags::TOP),
            '┴'
        );
        assert_eq!(
            set.glyph(BorderFlags::LEFT | BorderFlags::RIGHT | BorderFlags::BOTTOM),
            '┬'
        );
        assert_eq!(
            set.glyph(BorderFlags::TOP | BorderFlags::BOTTOM | BorderFlags::RIGHT),
            '├'
        );
        assert_eq!(
            set.glyph(BorderFlags::TOP | BorderFlags::BOTTOM | BorderFlags::LEFT),
            '┤'
        );
    }

    #[test]
    fn test_degenerate_fallbacks() {
        let set = BorderCharSet::UNICODE_LIGHT;
        assert_eq!(set.glyph(BorderFlags::LEFT), '─');
        assert_eq!(set.glyph(BorderFlags::RIGHT), '─');
        assert_eq!(set.glyph(BorderFlags::LEFT | BorderFlags::RIGHT), '─');
        assert_eq!(set.glyph(BorderFlags::TOP), '│');
        assert_eq!(set.glyph(BorderFlags::BOTTOM), '│');
        assert_eq!(set.glyph(BorderFlags::TOP | BorderFlags::BOTTOM), '│');
    }

    #[test]
    fn test_draw_ids_are_unique() {
        let a = BorderDrawId::next();
        let b = BorderDrawId::next();
        assert_ne!(a, b);
    }
}
