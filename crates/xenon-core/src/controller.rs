use std::io::{self, Write};

use xenon_common::event::CursorShape;

use crate::esc;

/// High-level escape-writing API over the byte sink.
///
/// Each operation writes its sequence and flushes; the renderer borrows
/// the sink directly for its batched frame writes.
pub struct OutputController<W> {
    sink: W,
}

impl<W: Write> OutputController<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn bell(&mut self) -> io::Result<()> {
        esc::bell(&mut self.sink)?;
        self.sink.flush()
    }

    pub fn set_title(&mut self, title: &str) -> io::Result<()> {
        esc::set_title(&mut self.sink, title)?;
        self.sink.flush()
    }

    pub fn set_icon(&mut self, icon: &str) -> io::Result<()> {
        esc::set_icon(&mut self.sink, icon)?;
        self.sink.flush()
    }

    pub fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        esc::cursor_visible(&mut self.sink, visible)?;
        self.sink.flush()
    }

    pub fn set_cursor_style(&mut self, shape: CursorShape, blinking: bool) -> io::Result<()> {
        esc::cursor_style(&mut self.sink, shape, blinking)?;
        self.sink.flush()
    }

    /// Ask the terminal where its cursor is; the reply arrives on the
    /// input stream as a cursor-position report.
    pub fn query_cursor_position(&mut self) -> io::Result<()> {
        esc::query_cursor_position(&mut self.sink)?;
        self.sink.flush()
    }

    pub fn set_alternate_screen(&mut self, on: bool) -> io::Result<()> {
        esc::alternate_screen(&mut self.sink, on)?;
        self.sink.flush()
    }

    pub fn set_line_wrap(&mut self, on: bool) -> io::Result<()> {
        esc::line_wrap(&mut self.sink, on)?;
        self.sink.flush()
    }

    pub fn set_mouse_tracking(&mut self, on: bool) -> io::Result<()> {
        esc::mouse_tracking(&mut self.sink, on)?;
        self.sink.flush()
    }

    pub fn set_focus_tracking(&mut self, on: bool) -> io::Result<()> {
        esc::focus_tracking(&mut self.sink, on)?;
        self.sink.flush()
    }

    pub fn set_bracketed_paste(&mut self, on: bool) -> io::Result<()> {
        esc::bracketed_paste(&mut self.sink, on)?;
        self.sink.flush()
    }

    pub fn sgr_reset(&mut self) -> io::Result<()> {
        esc::sgr_reset(&mut self.sink)?;
        self.sink.flush()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}
