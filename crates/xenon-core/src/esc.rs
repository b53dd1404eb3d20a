//! Escape sequence catalogue.
//!
//! Pure builders that write byte-level encodings to any `impl Write`; no
//! state and no decisions about when to emit. Cursor positions are
//! 0-indexed here and converted to the terminal's 1-indexed form.

use std::io::{self, Write};

use xenon_common::event::CursorShape;
use xenon_common::geometry::Position;

/// Move the cursor with CUP.
#[inline]
pub fn cursor_to(w: &mut impl Write, pos: Position) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", pos.y + 1, pos.x + 1)
}

/// Show or hide the cursor (DECTCEM).
#[inline]
pub fn cursor_visible(w: &mut impl Write, visible: bool) -> io::Result<()> {
    private_mode(w, "25", visible)
}

/// Select the cursor shape and blink via DECSCUSR.
pub fn cursor_style(w: &mut impl Write, shape: CursorShape, blinking: bool) -> io::Result<()> {
    let param = match (shape, blinking) {
        (CursorShape::Block, true) => 1,
        (CursorShape::Block, false) => 2,
        (CursorShape::Underline, true) => 3,
        (CursorShape::Underline, false) => 4,
        (CursorShape::VerticalBar, true) => 5,
        (CursorShape::VerticalBar, false) => 6,
    };
    write!(w, "\x1b[{param} q")
}

/// Ask for a cursor-position report (DSR 6).
#[inline]
pub fn query_cursor_position(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[6n")
}

/// Erase the whole screen (ED 2).
#[inline]
pub fn erase_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Switch the alternate screen buffer.
#[inline]
pub fn alternate_screen(w: &mut impl Write, on: bool) -> io::Result<()> {
    private_mode(w, "1049", on)
}

/// Toggle automatic line wrap (DECAWM).
#[inline]
pub fn line_wrap(w: &mut impl Write, on: bool) -> io::Result<()> {
    private_mode(w, "7", on)
}

/// Any-motion mouse tracking with SGR reports.
#[inline]
pub fn mouse_tracking(w: &mut impl Write, on: bool) -> io::Result<()> {
    private_mode(w, "1003;1006", on)
}

/// Focus in/out reporting.
#[inline]
pub fn focus_tracking(w: &mut impl Write, on: bool) -> io::Result<()> {
    private_mode(w, "1004", on)
}

/// Bracketed paste mode.
#[inline]
pub fn bracketed_paste(w: &mut impl Write, on: bool) -> io::Result<()> {
    private_mode(w, "2004", on)
}

fn private_mode(w: &mut impl Write, params: &str, on: bool) -> io::Result<()> {
    write!(w, "\x1b[?{}{}", params, if on { 'h' } else { 'l' })
}

/// Set the window title (OSC 0).
#[inline]
pub fn set_title(w: &mut impl Write, title: &str) -> io::Result<()> {
    write!(w, "\x1b]0;{title}\x07")
}

/// Set the icon name (OSC 1).
#[inline]
pub fn set_icon(w: &mut impl Write, icon: &str) -> io::Result<()> {
    write!(w, "\x1b]1;{icon}\x07")
}

/// Ring the bell.
#[inline]
pub fn bell(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x07")
}

/// One SGR sequence with pre-rendered parameters.
#[inline]
pub fn sgr(w: &mut impl Write, params: &str) -> io::Result<()> {
    write!(w, "\x1b[{params}m")
}

/// Reset all graphic rendition state.
#[inline]
pub fn sgr_reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}
