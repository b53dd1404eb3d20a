use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;
use xenon_common::border::{BorderCharSet, BorderDrawId, BorderFlags};
use xenon_common::geometry::{Offset, Position, Rect, Size};
use xenon_common::style::{Color, Foreground, ForegroundStyle, Grapheme};

use crate::cell::TerminalCell;

/// The cell-addressed back buffer.
///
/// Storage only ever grows: shrinking the logical size leaves the trailing
/// rows and cells allocated but unused, so growing back restores nothing
/// worse than stale content. A parallel per-row flag records which rows the
/// next update pass has to walk.
pub struct CellBuffer {
    rows: Vec<Vec<TerminalCell>>,
    row_changed: Vec<bool>,
    size: Size,
    default_fg: ForegroundStyle,
    background_fill: Option<Color>,
}

impl CellBuffer {
    pub fn new(size: Size) -> Self {
        let default_fg = ForegroundStyle::default();
        let blank = TerminalCell::new(Foreground::blank(default_fg), Color::Normal);
        let rows = (0..size.height)
            .map(|_| vec![blank.clone(); size.width as usize])
            .collect();
        Self {
            rows,
            row_changed: vec![false; size.height as usize],
            size,
            default_fg,
            background_fill: None,
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Grow the storage to cover `size`; existing cells keep their state.
    pub fn resize(&mut self, size: Size) {
        let blank = TerminalCell::new(Foreground::blank(self.default_fg), Color::Normal);
        for row in &mut self.rows {
            if row.len() < size.width as usize {
                row.resize(size.width as usize, blank.clone());
            }
        }
        while self.rows.len() < size.height as usize {
            self.rows.push(vec![blank.clone(); size.width as usize]);
            self.row_changed.push(false);
        }
        self.size = size;
    }

    /// Reset every cell and clear the row flags.
    pub fn reset(&mut self, fg: ForegroundStyle, bg: Color) {
        for row in &mut self.rows {
            for cell in row {
                cell.reset(Foreground::blank(fg), bg);
            }
        }
        self.row_changed.fill(false);
    }

    pub fn cell(&self, pos: Position) -> Option<&TerminalCell> {
        if !self.size.contains(pos) {
            return None;
        }
        self.rows.get(pos.y as usize)?.get(pos.x as usize)
    }

    pub(crate) fn cell_mut(&mut self, pos: Position) -> Option<&mut TerminalCell> {
        if !self.size.contains(pos) {
            return None;
        }
        self.rows.get_mut(pos.y as usize)?.get_mut(pos.x as usize)
    }

    pub(crate) fn row_dirty(&self, y: i32) -> bool {
        self.row_changed.get(y as usize).copied().unwrap_or(false)
    }

    pub(crate) fn set_row_dirty(&mut self, y: i32, dirty: bool) {
        if let Some(flag) = self.row_changed.get_mut(y as usize) {
            *flag = dirty;
        }
    }

    pub(crate) fn take_background_fill(&mut self) -> Option<Color> {
        self.background_fill.take()
    }

    /// Fill the screen with `color`.
    ///
    /// The optimized form records the fill and resets the buffer clean; the
    /// renderer then emits one background SGR plus a whole-screen erase
    /// instead of touching every cell.
    pub fn draw_color(&mut self, color: Color, optimize_by_clear: bool) {
        if optimize_by_clear {
            trace!(?color, "background fill via erase");
            self.background_fill = Some(color);
            let fg = self.default_fg;
            self.reset(fg, color);
            return;
        }
        if let Some(rect) = self.size.to_rect() {
            self.draw_rect(rect, Some(Foreground::blank(self.default_fg)), Some(color));
        }
    }

    /// Stage values at one position, clipped to the screen.
    pub fn draw_point(&mut self, pos: Position, fg: Option<Foreground>, bg: Option<Color>) {
        let Some(cell) = self.cell_mut(pos) else {
            return;
        };
        cell.draw(fg, bg);
        self.set_row_dirty(pos.y, true);
    }

    /// Stage values over a rectangle, clipped to the screen.
    pub fn draw_rect(&mut self, rect: Rect, fg: Option<Foreground>, bg: Option<Color>) {
        let Some(screen) = self.size.to_rect() else {
            return;
        };
        let Some(rect) = screen.clip(rect) else {
            return;
        };
        for y in rect.y1..=rect.y2 {
            for x in rect.x1..=rect.x2 {
                if let Some(cell) = self.cell_mut(Position::new(x, y)) {
                    cell.draw(fg, bg);
                }
            }
            self.set_row_dirty(y, true);
        }
    }

    /// ASCII fast path: printable code units drawn left to right.
    pub fn draw_text(&mut self, pos: Position, text: &str, style: ForegroundStyle) {
        for (i, unit) in text.encode_utf16().enumerate() {
            if !(32..=126).contains(&unit) {
                continue;
            }
            self.draw_point(
                pos + Offset::E1 * i as i32,
                Some(Foreground::new(style, unit)),
                None,
            );
        }
    }

    /// Unicode path: grapheme clusters with double-width placement.
    pub fn draw_unicode_text(&mut self, pos: Position, text: &str, style: ForegroundStyle) {
        let mut x = pos.x;
        for grapheme in text.graphemes(true) {
            let width = UnicodeWidthStr::width(grapheme).min(2);
            if width == 0 {
                continue;
            }
            let target = Position::new(x, pos.y);
            if grapheme.len() == 1 && width == 1 {
                // Single-byte cluster: a plain code unit.
                let unit = grapheme.encode_utf16().next().unwrap_or(b' ' as u16);
                self.draw_point(target, Some(Foreground::new(style, unit)), None);
            } else {
                self.try_draw_grapheme(target, grapheme, width as u8, style);
            }
            x += width as i32;
        }
    }

    /// Place one grapheme cluster, fixing up any wide neighbours it
    /// overlaps. Returns false when the placement was rejected.
    fn try_draw_grapheme(
        &mut self,
        pos: Position,
        data: &str,
        width: u8,
        style: ForegroundStyle,
    ) -> bool {
        if !self.size.contains(pos) {
            return false;
        }
        let default_fg = self.default_fg;

        // The target may currently be the right half of a wide grapheme;
        // losing it clears the owner on the left as well.
        let existing = self.cell(pos).and_then(|c| c.grapheme().cloned());
        if let Some(existing) = existing {
            if existing.is_second {
                let left = pos - Offset::E1;
                let left_is_wide = self
                    .cell(left)
                    .and_then(|c| c.grapheme())
                    .is_some_and(|g| !g.is_second && g.width == 2);
                if left_is_wide {
                    if let Some(cell) = self.cell_mut(left) {
                        cell.clear_grapheme(default_fg);
                    }
                }
                if let Some(cell) = self.cell_mut(pos) {
                    cell.clear_grapheme(default_fg);
                }
            } else if existing.width == 2 {
                // The target owns a wide grapheme: both halves go.
                if let Some(cell) = self.cell_mut(pos) {
                    cell.clear_grapheme(default_fg);
                }
                let right = pos + Offset::E1;
                if self
                    .cell(right)
                    .and_then(|c| c.grapheme())
                    .is_some_and(|g| g.is_second)
                {
                    if let Some(cell) = self.cell_mut(right) {
                        cell.clear_grapheme(default_fg);
                    }
                }
            }
        }

        if width == 2 {
            let right = pos + Offset::E1;
            if !self.size.contains(right) {
                trace!(?pos, "wide grapheme rejected at right edge");
                return false;
            }
            // Whatever the right cell showed, its span is cleared first.
            let right_grapheme = self.cell(right).and_then(|c| c.grapheme().cloned());
            if let Some(rg) = right_grapheme {
                if let Some(cell) = self.cell_mut(right) {
                    cell.clear_grapheme(default_fg);
                }
                if !rg.is_second && rg.width == 2 {
                    let beyond = right + Offset::E1;
                    if let Some(cell) = self.cell_mut(beyond) {
                        if cell.grapheme().is_some_and(|g| g.is_second) {
                            cell.clear_grapheme(default_fg);
                        }
                    }
                }
            }
            let half = Grapheme {
                data: data.to_string(),
                width: 2,
                is_second: true,
            };
            if let Some(cell) = self.cell_mut(right) {
                cell.attach_grapheme(half, style);
                // The right half is painted solely through the left cell.
                cell.set_changed(false);
            }
        }

        if let Some(cell) = self.cell_mut(pos) {
            cell.attach_grapheme(Grapheme::new(data, width), style);
        }
        self.set_row_dirty(pos.y, true);
        true
    }

    /// Grapheme cells are checked before painting: when either half of
    /// the span was overdrawn with a real glyph the grapheme is detached
    /// and both halves repaint as plain cells (reported as false);
    /// otherwise the pending style commits and the grapheme keeps its
    /// span.
    pub(crate) fn validate_grapheme_and_diff(&mut self, pos: Position) -> bool {
        let default_fg = self.default_fg;
        let Some(cell) = self.cell(pos) else {
            return false;
        };
        let Some(grapheme) = cell.grapheme() else {
            return false;
        };
        let (width, is_second) = (grapheme.width, grapheme.is_second);

        let partner = (width == 2).then(|| {
            if is_second {
                pos - Offset::E1
            } else {
                pos + Offset::E1
            }
        });
        let here_overdrawn = cell.pending_glyph();
        let partner_overdrawn = partner
            .and_then(|p| self.cell(p))
            .is_some_and(|c| c.pending_glyph());

        if here_overdrawn || partner_overdrawn {
            // Overdrawn halves keep their staged glyph for the ordinary
            // paint path; the surviving half repaints as a blank.
            for (half, overdrawn) in [(Some(pos), here_overdrawn), (partner, partner_overdrawn)] {
                let Some(half) = half else { continue };
                if let Some(cell) = self.cell_mut(half) {
                    if cell.grapheme().is_some() {
                        if overdrawn {
                            cell.detach_grapheme();
                        } else {
                            cell.clear_grapheme(default_fg);
                        }
                    }
                }
                self.set_row_dirty(half.y, true);
            }
            return false;
        }

        if let Some(cell) = self.cell_mut(pos) {
            cell.commit_diff();
        }
        true
    }

    /// One straight border segment. Endpoints do not extend outward; the
    /// glyph at each cell reflects the adjacency accumulated under the
    /// draw id.
    pub fn draw_border_line(
        &mut self,
        from: Position,
        to: Position,
        style: ForegroundStyle,
        charset: &BorderCharSet,
        id: BorderDrawId,
    ) {
        assert!(
            from.x == to.x || from.y == to.y,
            "border line endpoints must share an axis"
        );
        if from.y == to.y {
            let (x1, x2) = (from.x.min(to.x), from.x.max(to.x));
            for x in x1..=x2 {
                let mut flags = BorderFlags::empty();
                if x > x1 {
                    flags |= BorderFlags::LEFT;
                }
                if x < x2 {
                    flags |= BorderFlags::RIGHT;
                }
                if flags.is_empty() {
                    flags = BorderFlags::LEFT | BorderFlags::RIGHT;
                }
                self.put_border_cell(Position::new(x, from.y), flags, style, charset, id);
            }
        } else {
            let (y1, y2) = (from.y.min(to.y), from.y.max(to.y));
            for y in y1..=y2 {
                let mut flags = BorderFlags::empty();
                if y > y1 {
                    flags |= BorderFlags::TOP;
                }
                if y < y2 {
                    flags |= BorderFlags::BOTTOM;
                }
                if flags.is_empty() {
                    flags = BorderFlags::TOP | BorderFlags::BOTTOM;
                }
                self.put_border_cell(Position::new(from.x, y), flags, style, charset, id);
            }
        }
    }

    fn put_border_cell(
        &mut self,
        pos: Position,
        flags: BorderFlags,
        style: ForegroundStyle,
        charset: &BorderCharSet,
        id: BorderDrawId,
    ) {
        let Some(cell) = self.cell_mut(pos) else {
            return;
        };
        let merged = cell.apply_border(flags, id);
        let glyph = charset.glyph(merged);
        cell.draw(Some(Foreground::new(style, glyph as u16)), None);
        self.set_row_dirty(pos.y, true);
    }

    /// Four border lines sharing one draw id so the corners join.
    ///
    /// # Panics
    ///
    /// A box narrower or shorter than two cells is a caller error.
    pub fn draw_border_box(
        &mut self,
        rect: Rect,
        style: ForegroundStyle,
        charset: &BorderCharSet,
        id: Option<BorderDrawId>,
    ) -> BorderDrawId {
        assert!(
            rect.width() >= 2 && rect.height() >= 2,
            "border box must be at least 2x2"
        );
        let id = id.unwrap_or_else(BorderDrawId::next);
        let tl = Position::new(rect.x1, rect.y1);
        let tr = Position::new(rect.x2, rect.y1);
        let bl = Position::new(rect.x1, rect.y2);
        let br = Position::new(rect.x2, rect.y2);
        self.draw_border_line(tl, tr, style, charset, id);
        self.draw_border_line(bl, br, style, charset, id);
        self.draw_border_line(tl, bl, style, charset, id);
        self.draw_border_line(tr, br, style, charset, id);
        id
    }

    /// Paint a block of background colours, one cell per entry.
    pub fn draw_image(&mut self, origin: Position, pixels: &[Vec<Color>]) {
        for (dy, row) in pixels.iter().enumerate() {
            for (dx, color) in row.iter().enumerate() {
                self.draw_point(
                    origin + Offset::new(dx as i32, dy as i32),
                    None,
                    Some(*color),
                );
            }
        }
    }
}
