use std::io::{self, Write};

use tracing::{debug, trace};
use xenon_common::border::{BorderCharSet, BorderDrawId};
use xenon_common::event::CursorState;
use xenon_common::geometry::{Offset, Position, Rect, Size};
use xenon_common::style::{Color, Foreground, ForegroundStyle, TextEffects};

use crate::buffer::CellBuffer;
use crate::esc;

/// The minimal SGR parameter sequence taking the terminal from one
/// (effects, fg, bg) state to another.
///
/// Equal effects need at most two colour sequences; vanishing effects are
/// cheapest through a single reset; anything else toggles each effect
/// individually alongside the changed colours.
pub fn sgr_transition(
    out: &mut Vec<u8>,
    from_fg: ForegroundStyle,
    from_bg: Color,
    to_fg: ForegroundStyle,
    to_bg: Color,
) -> io::Result<()> {
    if from_fg.effects == to_fg.effects {
        if from_fg.color != to_fg.color {
            esc::sgr(out, &to_fg.color.fg_params())?;
        }
        if from_bg != to_bg {
            esc::sgr(out, &to_bg.bg_params())?;
        }
        return Ok(());
    }

    if to_fg.effects.is_empty() {
        let mut params = String::from("0");
        if to_fg.color != Color::Normal {
            params.push(';');
            params.push_str(&to_fg.color.fg_params());
        }
        if to_bg != Color::Normal {
            params.push(';');
            params.push_str(&to_bg.bg_params());
        }
        return esc::sgr(out, &params);
    }

    let mut parts: Vec<String> = Vec::new();
    if from_fg.color != to_fg.color {
        parts.push(to_fg.color.fg_params());
    }
    if from_bg != to_bg {
        parts.push(to_bg.bg_params());
    }
    let toggled = from_fg.effects ^ to_fg.effects;
    for (flag, on, off) in TextEffects::TABLE {
        if toggled.contains(flag) {
            let code = if to_fg.effects.contains(flag) { on } else { off };
            parts.push(code.to_string());
        }
    }
    esc::sgr(out, &parts.join(";"))
}

fn move_cursor(out: &mut Vec<u8>, physical: &mut Option<Position>, target: Position) -> io::Result<()> {
    if *physical != Some(target) {
        esc::cursor_to(out, target)?;
        *physical = Some(target);
    }
    Ok(())
}

/// Diff-driven renderer over the back buffer.
///
/// Persistent state mirrors what the terminal itself holds: the physical
/// cursor position (`None` while unknown), the SGR state last sent, and an
/// output accumulator flushed once per update so each frame reaches the
/// sink as a single contiguous write.
pub struct Viewport {
    buffer: CellBuffer,
    cursor: CursorState,
    cursor_hidden: bool,
    current_fg: ForegroundStyle,
    current_bg: Color,
    physical: Option<Position>,
    out: Vec<u8>,
    active: bool,
}

impl Viewport {
    pub fn new(size: Size) -> Self {
        Self {
            buffer: CellBuffer::new(size),
            cursor: CursorState::default(),
            cursor_hidden: false,
            current_fg: ForegroundStyle::default(),
            current_bg: Color::Normal,
            physical: None,
            out: Vec::with_capacity(16 * 1024),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn size(&self) -> Size {
        self.buffer.size()
    }

    pub fn buffer(&self) -> &CellBuffer {
        &self.buffer
    }

    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    /// Move or restyle the cursor. Appearance changes are queued for the
    /// next flush; the position lands with the next update's trailing
    /// cursor move.
    pub fn set_cursor(&mut self, cursor: CursorState) {
        if (cursor.shape, cursor.blinking) != (self.cursor.shape, self.cursor.blinking) {
            // Writes to the accumulator cannot fail.
            let _ = esc::cursor_style(&mut self.out, cursor.shape, cursor.blinking);
        }
        self.cursor = cursor;
    }

    pub fn cursor_hidden(&self) -> bool {
        self.cursor_hidden
    }

    pub fn set_cursor_hidden(&mut self, hidden: bool) {
        if hidden != self.cursor_hidden {
            let _ = esc::cursor_visible(&mut self.out, !hidden);
            self.cursor_hidden = hidden;
        }
    }

    /// Enter viewport mode: switch the screen over, clear it, and size the
    /// buffer.
    pub fn activate<W: Write>(&mut self, sink: &mut W, size: Size) -> io::Result<()> {
        debug!(?size, "activating viewport");
        esc::alternate_screen(&mut self.out, true)?;
        esc::mouse_tracking(&mut self.out, true)?;
        esc::focus_tracking(&mut self.out, true)?;
        esc::bracketed_paste(&mut self.out, true)?;
        self.clamp_cursor(size);
        esc::cursor_to(&mut self.out, self.cursor.position)?;
        esc::erase_screen(&mut self.out)?;
        self.physical = Some(self.cursor.position);
        self.buffer.resize(size);
        self.active = true;
        self.flush(sink)
    }

    /// Leave viewport mode, undoing every mode toggle from activation.
    pub fn deactivate<W: Write>(&mut self, sink: &mut W) -> io::Result<()> {
        debug!("deactivating viewport");
        esc::alternate_screen(&mut self.out, false)?;
        esc::mouse_tracking(&mut self.out, false)?;
        esc::focus_tracking(&mut self.out, false)?;
        esc::bracketed_paste(&mut self.out, false)?;
        esc::sgr_reset(&mut self.out)?;
        self.current_fg = ForegroundStyle::default();
        self.current_bg = Color::Normal;
        self.physical = None;
        self.active = false;
        self.flush(sink)
    }

    pub fn resize(&mut self, size: Size) {
        self.buffer.resize(size);
        self.clamp_cursor(size);
    }

    fn clamp_cursor(&mut self, size: Size) {
        let max_x = size.width.saturating_sub(1) as i32;
        let max_y = size.height.saturating_sub(1) as i32;
        self.cursor.position.x = self.cursor.position.x.clamp(0, max_x);
        self.cursor.position.y = self.cursor.position.y.clamp(0, max_y);
    }

    // Draw operations, delegated to the buffer.

    pub fn draw_color(&mut self, color: Color, optimize_by_clear: bool) {
        self.buffer.draw_color(color, optimize_by_clear);
    }

    pub fn draw_point(&mut self, pos: Position, fg: Option<Foreground>, bg: Option<Color>) {
        self.buffer.draw_point(pos, fg, bg);
    }

    pub fn draw_rect(&mut self, rect: Rect, fg: Option<Foreground>, bg: Option<Color>) {
        self.buffer.draw_rect(rect, fg, bg);
    }

    pub fn draw_text(&mut self, pos: Position, text: &str, style: ForegroundStyle) {
        self.buffer.draw_text(pos, text, style);
    }

    pub fn draw_unicode_text(&mut self, pos: Position, text: &str, style: ForegroundStyle) {
        self.buffer.draw_unicode_text(pos, text, style);
    }

    pub fn draw_border_line(
        &mut self,
        from: Position,
        to: Position,
        style: ForegroundStyle,
        charset: &BorderCharSet,
        id: BorderDrawId,
    ) {
        self.buffer.draw_border_line(from, to, style, charset, id);
    }

    pub fn draw_border_box(
        &mut self,
        rect: Rect,
        style: ForegroundStyle,
        charset: &BorderCharSet,
        id: Option<BorderDrawId>,
    ) -> BorderDrawId {
        self.buffer.draw_border_box(rect, style, charset, id)
    }

    pub fn draw_image(&mut self, origin: Position, pixels: &[Vec<Color>]) {
        self.buffer.draw_image(origin, pixels);
    }

    /// Reconcile the physical screen with the buffer.
    ///
    /// Walks only the dirty rows, emitting cursor moves, SGR transitions
    /// and glyphs for cells whose committed appearance changes. The frame
    /// is accumulated and handed to the sink as one write.
    pub fn update<W: Write>(&mut self, sink: &mut W) -> io::Result<()> {
        if let Some(fill) = self.buffer.take_background_fill() {
            let to_fg = ForegroundStyle::default();
            sgr_transition(&mut self.out, self.current_fg, self.current_bg, to_fg, fill)?;
            self.current_fg = to_fg;
            self.current_bg = fill;
            esc::erase_screen(&mut self.out)?;
        }

        let old_cursor = self.cursor.position;
        let size = self.buffer.size();
        let mut physical = self.physical;

        for y in 0..size.height as i32 {
            if !self.buffer.row_dirty(y) {
                continue;
            }
            self.buffer.set_row_dirty(y, false);

            let mut x = 0;
            while x < size.width as i32 {
                let pos = Position::new(x, y);
                let (changed, has_grapheme) = match self.buffer.cell(pos) {
                    Some(cell) => (cell.changed(), cell.grapheme().is_some()),
                    None => break,
                };
                if !changed {
                    x += 1;
                    continue;
                }

                if has_grapheme && self.buffer.validate_grapheme_and_diff(pos) {
                    let Some((grapheme, style, bg)) = self
                        .buffer
                        .cell(pos)
                        .and_then(|cell| {
                            cell.grapheme()
                                .cloned()
                                .map(|g| (g, cell.fg().style, cell.bg()))
                        })
                    else {
                        break;
                    };
                    if grapheme.is_second {
                        x += 1;
                        continue;
                    }
                    trace!(?pos, data = %grapheme.data, "repainting grapheme");
                    move_cursor(&mut self.out, &mut physical, pos)?;
                    self.transition(style, bg)?;
                    self.out.extend_from_slice(grapheme.data.as_bytes());
                    if let Some(p) = &mut physical {
                        *p += Offset::E1 * grapheme.width as i32;
                    }
                    // Graphemes stay marked so they repaint next frame; the
                    // row flag comes back for the same reason.
                    self.buffer.set_row_dirty(y, true);
                    x += grapheme.width as i32;
                    continue;
                }

                // Plain cell: commit the staged values and paint on change.
                let committed = self
                    .buffer
                    .cell_mut(pos)
                    .map(|cell| {
                        let dirty = cell.commit_diff();
                        cell.set_changed(false);
                        (dirty, cell.fg(), cell.bg())
                    });
                if let Some((true, fg, bg)) = committed {
                    move_cursor(&mut self.out, &mut physical, pos)?;
                    self.transition(fg.style, bg)?;
                    push_code_unit(&mut self.out, fg.code_unit);
                    if let Some(p) = &mut physical {
                        *p += Offset::E1;
                    }
                }
                x += 1;
            }
        }

        if !self.cursor_hidden {
            move_cursor(&mut self.out, &mut physical, old_cursor)?;
        }
        self.physical = physical;
        self.flush(sink)
    }

    fn transition(&mut self, fg: ForegroundStyle, bg: Color) -> io::Result<()> {
        sgr_transition(&mut self.out, self.current_fg, self.current_bg, fg, bg)?;
        self.current_fg = fg;
        self.current_bg = bg;
        Ok(())
    }

    fn flush<W: Write>(&mut self, sink: &mut W) -> io::Result<()> {
        if !self.out.is_empty() {
            sink.write_all(&self.out)?;
            sink.flush()?;
            self.out.clear();
        }
        Ok(())
    }
}

/// Emit one UTF-16 code unit as UTF-8. The zero sentinel paints as a
/// space so a background-only cell still covers its column.
fn push_code_unit(out: &mut Vec<u8>, unit: u16) {
    let c = if unit == 0 {
        ' '
    } else {
        char::from_u32(unit as u32).unwrap_or(' ')
    };
    let mut enc = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut enc).as_bytes());
}
