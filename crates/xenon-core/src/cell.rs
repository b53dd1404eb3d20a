use xenon_common::border::{BorderDrawId, BorderFlags};
use xenon_common::style::{Color, Foreground, ForegroundStyle, Grapheme};

/// Border adjacency a cell accumulated, tagged with the drawing that put
/// it there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderState {
    pub flags: BorderFlags,
    pub id: BorderDrawId,
}

/// One cell of the back buffer.
///
/// A cell holds its committed appearance plus pending values written by
/// the draw operations; `changed` marks cells the next update pass must
/// look at. A grapheme attachment replaces the foreground glyph: the
/// committed foreground then carries the zero sentinel code unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCell {
    fg: Foreground,
    bg: Color,
    new_fg: Option<Foreground>,
    new_bg: Option<Color>,
    changed: bool,
    grapheme: Option<Grapheme>,
    border: Option<BorderState>,
}

impl TerminalCell {
    pub fn new(fg: Foreground, bg: Color) -> Self {
        Self {
            fg,
            bg,
            new_fg: None,
            new_bg: None,
            changed: false,
            grapheme: None,
            border: None,
        }
    }

    /// Forget everything and take a committed appearance.
    pub fn reset(&mut self, fg: Foreground, bg: Color) {
        *self = Self::new(fg, bg);
    }

    pub fn fg(&self) -> Foreground {
        self.fg
    }

    pub fn bg(&self) -> Color {
        self.bg
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    pub fn grapheme(&self) -> Option<&Grapheme> {
        self.grapheme.as_ref()
    }

    /// Pending foreground if any, else the committed one.
    pub fn effective_fg(&self) -> Foreground {
        self.new_fg.unwrap_or(self.fg)
    }

    pub fn effective_bg(&self) -> Color {
        self.new_bg.unwrap_or(self.bg)
    }

    /// Stage new foreground and/or background values.
    pub fn draw(&mut self, fg: Option<Foreground>, bg: Option<Color>) {
        if let Some(fg) = fg {
            self.new_fg = Some(fg);
        }
        if let Some(bg) = bg {
            self.new_bg = Some(bg);
        }
        self.changed = true;
    }

    /// Attach a grapheme; the staged foreground keeps only the style (the
    /// grapheme is the visible content).
    pub fn attach_grapheme(&mut self, grapheme: Grapheme, style: ForegroundStyle) {
        self.new_fg = Some(Foreground::blank(style));
        self.grapheme = Some(grapheme);
        self.changed = true;
    }

    /// Drop a grapheme attachment and schedule a plain repaint of the
    /// cell as a blank in the given style.
    pub fn clear_grapheme(&mut self, style: ForegroundStyle) {
        self.grapheme = None;
        self.new_fg = Some(Foreground::new(style, ' ' as u16));
        self.changed = true;
    }

    /// Drop a grapheme attachment without scheduling a repaint; the
    /// caller is about to overwrite the cell anyway.
    pub fn detach_grapheme(&mut self) {
        self.grapheme = None;
    }

    /// Whether a draw staged a real glyph over this cell.
    pub fn pending_glyph(&self) -> bool {
        self.new_fg.is_some_and(|fg| fg.has_glyph())
    }

    /// Commit pending values. True when the committed appearance changed.
    pub fn commit_diff(&mut self) -> bool {
        let mut dirty = false;
        if let Some(fg) = self.new_fg.take() {
            if fg != self.fg {
                self.fg = fg;
                dirty = true;
            }
        }
        if let Some(bg) = self.new_bg.take() {
            if bg != self.bg {
                self.bg = bg;
                dirty = true;
            }
        }
        dirty
    }

    /// Merge border adjacency: flags accumulate while the draw id matches
    /// the stored one, otherwise the incoming set replaces it. Returns the
    /// adjacency now in effect.
    pub fn apply_border(&mut self, flags: BorderFlags, id: BorderDrawId) -> BorderFlags {
        match &mut self.border {
            Some(state) if state.id == id => {
                state.flags |= flags;
                state.flags
            }
            _ => {
                self.border = Some(BorderState { flags, id });
                flags
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> TerminalCell {
        TerminalCell::new(Foreground::default(), Color::Normal)
    }

    #[test]
    fn test_draw_marks_changed() {
        let mut c = cell();
        assert!(!c.changed());
        c.draw(None, Some(Color::Standard(1)));
        assert!(c.changed());
        assert_eq!(c.effective_bg(), Color::Standard(1));
        // Committed value is untouched until the diff pass.
        assert_eq!(c.bg(), Color::Normal);
    }

    #[test]
    fn test_commit_diff() {
        let mut c = cell();
        c.draw(None, Some(Color::Standard(1)));
        assert!(c.commit_diff());
        assert_eq!(c.bg(), Color::Standard(1));
        // Re-staging the same value commits without a difference.
        c.draw(None, Some(Color::Standard(1)));
        assert!(!c.commit_diff());
    }

    #[test]
    fn test_border_accumulates_on_same_id() {
        let mut c = cell();
        let id = BorderDrawId::next();
        assert_eq!(c.apply_border(BorderFlags::LEFT, id), BorderFlags::LEFT);
        assert_eq!(
            c.apply_border(BorderFlags::TOP, id),
            BorderFlags::LEFT | BorderFlags::TOP
        );
    }

    #[test]
    fn test_border_replaced_on_new_id() {
        let mut c = cell();
        c.apply_border(BorderFlags::LEFT, BorderDrawId::next());
        let merged = c.apply_border(BorderFlags::TOP, BorderDrawId::next());
        assert_eq!(merged, BorderFlags::TOP);
    }

    #[test]
    fn test_grapheme_attachment() {
        let mut c = cell();
        c.attach_grapheme(Grapheme::new("字", 2), ForegroundStyle::default());
        assert!(c.changed());
        assert!(!c.effective_fg().has_glyph());
        c.clear_grapheme(ForegroundStyle::default());
        assert!(c.grapheme().is_none());
        assert_eq!(c.effective_fg().code_unit, ' ' as u16);
    }
}
