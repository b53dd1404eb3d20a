//! Terminal I/O core: input decoding, back-buffer rendering, and the
//! escape-writing output layer, coordinated by the [`Terminal`] facade.

pub mod buffer;
pub mod cell;
pub mod controller;
pub mod esc;
pub mod platform;
pub mod viewport;

use std::io::Write;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use xenon_common::error::{Result, XenonError};
use xenon_common::event::{DaKind, InputEvent, Signal};
use xenon_common::geometry::{Position, Size};
use xenon_common::traits::{
    AssumeAllCapabilities, Capability, CapabilityProbe, RawMode, TerminalListener, WindowOps,
};
use xenon_input::{DecoderConfig, InputDecoder};

pub use buffer::CellBuffer;
pub use cell::TerminalCell;
pub use controller::OutputController;
pub use platform::SizePoller;
pub use viewport::Viewport;

/// How the core treats the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Pass-through: input is decoded and delivered, output goes straight
    /// to the sink.
    Logger,
    /// Full-screen cell rendering on the alternate screen buffer.
    Viewport,
}

/// Construction-time settings.
#[derive(Debug, Clone)]
pub struct TerminalConfig {
    pub size: Size,
    pub decoder: DecoderConfig,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            size: Size::new(80, 24),
            decoder: DecoderConfig::default(),
        }
    }
}

/// Coordinates the decoder, the viewport renderer, and the output
/// controller over one byte sink.
///
/// Input chunks arrive through the channel handed out by
/// [`input_sender`]; [`run`] drives decoding and the bracketed-paste
/// timeout, delivering results to the registered listener.
///
/// [`input_sender`]: Terminal::input_sender
/// [`run`]: Terminal::run
pub struct Terminal<W: Write + Send> {
    controller: OutputController<W>,
    viewport: Viewport,
    decoder: InputDecoder,
    listener: Option<Box<dyn TerminalListener>>,
    capabilities: Box<dyn CapabilityProbe>,
    raw_mode: Option<Box<dyn RawMode>>,
    window: Option<Box<dyn WindowOps>>,
    mode: Mode,
    attached: bool,
    size: Size,
    input_tx: mpsc::Sender<Bytes>,
    input_rx: Option<mpsc::Receiver<Bytes>>,
    last_cursor_reply: Option<Position>,
}

impl<W: Write + Send> Terminal<W> {
    pub fn new(sink: W, config: TerminalConfig) -> Self {
        let (input_tx, input_rx) = mpsc::channel(64);
        Self {
            controller: OutputController::new(sink),
            viewport: Viewport::new(config.size),
            decoder: InputDecoder::with_config(config.decoder),
            listener: None,
            capabilities: Box::new(AssumeAllCapabilities),
            raw_mode: None,
            window: None,
            mode: Mode::Logger,
            attached: false,
            size: config.size,
            input_tx,
            input_rx: Some(input_rx),
            last_cursor_reply: None,
        }
    }

    /// Where the platform byte source delivers its chunks.
    pub fn input_sender(&self) -> mpsc::Sender<Bytes> {
        self.input_tx.clone()
    }

    /// Tear down the facade and recover the byte sink.
    pub fn into_sink(self) -> W {
        self.controller.into_inner()
    }

    pub fn set_listener(&mut self, listener: Box<dyn TerminalListener>) {
        self.listener = Some(listener);
    }

    pub fn set_raw_mode_handler(&mut self, raw_mode: Box<dyn RawMode>) {
        self.raw_mode = Some(raw_mode);
    }

    pub fn set_window_ops(&mut self, window: Box<dyn WindowOps>) {
        self.window = Some(window);
    }

    pub fn set_capability_probe(&mut self, probe: Box<dyn CapabilityProbe>) {
        self.capabilities = probe;
    }

    pub fn check_support(&self, capability: Capability) -> bool {
        self.capabilities.supports(capability)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Take control of the terminal.
    ///
    /// # Panics
    ///
    /// Attaching twice is a caller error.
    pub async fn attach(&mut self) -> Result<()> {
        assert!(!self.attached, "attach called while already attached");
        info!(mode = ?self.mode, "attaching terminal");
        if let Some(raw) = &mut self.raw_mode {
            raw.set_raw(true).await?;
        }
        if self.mode == Mode::Viewport {
            self.viewport.activate(self.controller.sink_mut(), self.size)?;
        }
        self.attached = true;
        Ok(())
    }

    /// Release the terminal, restoring modes best-effort: the sink is
    /// flushed and raw mode restored even when an earlier step failed.
    ///
    /// # Panics
    ///
    /// Detaching while not attached is a caller error.
    pub async fn detach(&mut self) -> Result<()> {
        assert!(self.attached, "detach called while not attached");
        info!("detaching terminal");
        if self.viewport.is_active() {
            if let Err(err) = self.viewport.deactivate(self.controller.sink_mut()) {
                error!("failed to leave viewport mode: {err}");
            }
        }
        if let Err(err) = self.controller.flush() {
            error!("failed to flush output sink: {err}");
        }
        if let Some(raw) = &mut self.raw_mode {
            if let Err(err) = raw.set_raw(false).await {
                // Restoration failures are reported, never propagated.
                error!("failed to restore terminal mode: {err}");
            }
        }
        self.attached = false;
        Ok(())
    }

    /// Switch between logger pass-through and viewport rendering.
    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        if self.attached {
            match mode {
                Mode::Viewport => {
                    self.viewport.activate(self.controller.sink_mut(), self.size)?
                }
                Mode::Logger => self.viewport.deactivate(self.controller.sink_mut())?,
            }
        }
        self.mode = mode;
        Ok(())
    }

    pub fn bell(&mut self) -> Result<()> {
        Ok(self.controller.bell()?)
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        Ok(self.controller.set_title(title)?)
    }

    pub fn set_icon(&mut self, icon: &str) -> Result<()> {
        Ok(self.controller.set_icon(icon)?)
    }

    /// Ask the platform for a new window size; the buffer follows on
    /// success.
    pub async fn try_set_size(&mut self, size: Size) -> Result<bool> {
        let Some(window) = &mut self.window else {
            return Ok(false);
        };
        if !window.try_set_size(size).await? {
            return Ok(false);
        }
        self.resize(size);
        Ok(true)
    }

    /// Adopt a new screen size (platform notification or successful
    /// resize request).
    pub fn resize(&mut self, size: Size) {
        debug!(?size, "screen resized");
        self.size = size;
        self.viewport.resize(size);
        if let Some(listener) = &mut self.listener {
            listener.on_screen_resize(size);
        }
    }

    /// Platform signal delivery, forwarded to the listener.
    pub fn notify_signal(&mut self, signal: Signal) {
        if let Some(listener) = &mut self.listener {
            listener.on_signal(signal);
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Render the dirty parts of the back buffer to the sink.
    pub fn update_screen(&mut self) -> Result<()> {
        Ok(self.viewport.update(self.controller.sink_mut())?)
    }

    /// Send a cursor-position query and arm the decoder for its reply.
    pub fn query_cursor_position(&mut self) -> Result<()> {
        self.controller.query_cursor_position()?;
        self.decoder.set_awaiting_cursor_reply(true);
        Ok(())
    }

    /// The most recent cursor-position reply, if one arrived.
    pub fn take_cursor_reply(&mut self) -> Option<Position> {
        self.last_cursor_reply.take()
    }

    /// Decode one input chunk synchronously and deliver its events.
    pub fn process_chunk(&mut self, chunk: &[u8]) {
        let events = self.decoder.decode(chunk);
        self.dispatch(events);
    }

    /// Drive input decoding until the byte source closes.
    ///
    /// The select loop owns the single timer in the core: the bracketed
    /// paste deadline, re-armed after every chunk while a paste is
    /// pending.
    pub async fn run(&mut self) -> Result<()> {
        let mut input_rx = self
            .input_rx
            .take()
            .ok_or_else(|| XenonError::State("terminal run loop already started".into()))?;
        let paste_timeout = self.decoder.config().paste_timeout;
        let mut deadline: Option<tokio::time::Instant> = None;

        info!("starting terminal input loop");
        loop {
            tokio::select! {
                chunk = input_rx.recv() => {
                    match chunk {
                        Some(chunk) => {
                            self.process_chunk(&chunk);
                            deadline = self
                                .decoder
                                .paste_pending()
                                .then(|| tokio::time::Instant::now() + paste_timeout);
                        }
                        None => {
                            debug!("input channel closed");
                            break;
                        }
                    }
                }
                // Never polled unless a deadline is armed.
                _ = async { tokio::time::sleep_until(deadline.unwrap()).await }, if deadline.is_some() => {
                    if let Some(event) = self.decoder.flush_paste() {
                        self.dispatch(vec![event]);
                    }
                    deadline = None;
                }
            }
        }
        // Teardown: a pending paste timer dies with the loop.
        info!("terminal input loop finished");
        Ok(())
    }

    fn dispatch(&mut self, events: Vec<InputEvent>) {
        for event in events {
            match event {
                InputEvent::Keyboard(input) => {
                    if let Some(listener) = &mut self.listener {
                        listener.on_keyboard_input(input);
                    }
                }
                InputEvent::Mouse(mouse) => {
                    if let Some(listener) = &mut self.listener {
                        listener.on_mouse_event(mouse);
                    }
                }
                InputEvent::FocusChange { gained } => {
                    if let Some(listener) = &mut self.listener {
                        listener.on_focus_change(gained);
                    }
                }
                InputEvent::CursorPositionReply { position } => {
                    debug!(?position, "cursor position reply");
                    self.last_cursor_reply = Some(position);
                }
                InputEvent::DeviceAttributes {
                    kind,
                    device_type,
                    version,
                    ..
                } => {
                    let prefix = match kind {
                        DaKind::Primary => '?',
                        DaKind::Secondary => '>',
                    };
                    debug!(%prefix, device_type, version, "device attributes reply");
                }
                InputEvent::Unhandled(raw) => {
                    if let Some(listener) = &mut self.listener {
                        listener.on_raw_input(&raw, false);
                    }
                }
                InputEvent::RawProcessed(raw) => {
                    if let Some(listener) = &mut self.listener {
                        listener.on_raw_input(&raw, true);
                    }
                }
            }
        }
    }
}
