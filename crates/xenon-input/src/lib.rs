//! Streaming decoder turning terminal byte chunks into typed input events.

pub mod key;
pub mod mouse;
pub mod paste;

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};
use xenon_common::event::{DaKind, InputEvent};
use xenon_common::geometry::Position;

use crate::mouse::MouseDecoder;
use crate::paste::{PasteBuffer, PasteOutcome};

static FOCUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[([IO])").expect("focus regex"));
static CURSOR_REPLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\x1b\[(\d+);(\d+)R$").expect("cursor reply regex"));
static DEVICE_ATTRS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\x1b\[([?>])(\d+(?:;\d+)*)c$").expect("device attributes regex"));

/// Tunables for the decoder.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// How long an unterminated bracketed paste may sit before it is
    /// flushed.
    pub paste_timeout: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            paste_timeout: Duration::from_millis(50),
        }
    }
}

/// Stateful chunk-at-a-time input decoder.
///
/// Events are produced synchronously while a chunk is consumed; the
/// bracketed-paste accumulator is the only state spanning chunks. The
/// driver owning the decoder is responsible for calling [`flush_paste`]
/// once [`paste_timeout`] elapses with [`paste_pending`] still true.
///
/// [`flush_paste`]: InputDecoder::flush_paste
/// [`paste_timeout`]: DecoderConfig::paste_timeout
/// [`paste_pending`]: InputDecoder::paste_pending
#[derive(Debug, Default)]
pub struct InputDecoder {
    config: DecoderConfig,
    paste: PasteBuffer,
    mouse: MouseDecoder,
    awaiting_cursor_position: bool,
}

impl InputDecoder {
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            paste: PasteBuffer::default(),
            mouse: MouseDecoder::default(),
            awaiting_cursor_position: false,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Arm or disarm acceptance of a cursor-position reply. Replies that
    /// arrive unarmed fall through the matcher and end up unhandled.
    pub fn set_awaiting_cursor_reply(&mut self, awaiting: bool) {
        self.awaiting_cursor_position = awaiting;
    }

    /// Whether a bracketed paste is waiting on its timeout.
    pub fn paste_pending(&self) -> bool {
        self.paste.timer_armed()
    }

    /// Paste-timeout expiry: emit whatever accumulated, return to idle.
    pub fn flush_paste(&mut self) -> Option<InputEvent> {
        self.paste.flush()
    }

    /// Decode one chunk of bytes into events.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<InputEvent> {
        let text = decode_permissive(chunk);
        trace!(len = chunk.len(), "decoding input chunk");
        self.decode_text(&text)
    }

    fn decode_text(&mut self, text: &str) -> Vec<InputEvent> {
        let mut events = Vec::new();

        match self.paste.feed(text) {
            PasteOutcome::Consumed(event) => {
                events.extend(event);
                events.push(InputEvent::RawProcessed(text.to_string()));
                return events;
            }
            PasteOutcome::NotPaste => {}
        }

        if let Some(mut focus) = try_focus(text) {
            debug!(count = focus.len(), "focus chunk");
            events.append(&mut focus);
            events.push(InputEvent::RawProcessed(text.to_string()));
            return events;
        }

        if self.awaiting_cursor_position {
            if let Some(event) = try_cursor_reply(text) {
                self.awaiting_cursor_position = false;
                events.push(event);
                events.push(InputEvent::RawProcessed(text.to_string()));
                return events;
            }
        }

        if let Some(event) = try_device_attributes(text) {
            events.push(event);
            events.push(InputEvent::RawProcessed(text.to_string()));
            return events;
        }

        if let Some(mut mouse) = self.mouse.try_decode(text) {
            events.append(&mut mouse);
            events.push(InputEvent::RawProcessed(text.to_string()));
            return events;
        }

        events.extend(key::process_rest(text));
        events
    }
}

/// Every focus report in the chunk, in order.
///
/// The chunk is consumed whole once any focus report is present, which
/// drops input interleaved with the reports; terminals do not interleave
/// them in practice.
fn try_focus(text: &str) -> Option<Vec<InputEvent>> {
    let events: Vec<InputEvent> = FOCUS_RE
        .captures_iter(text)
        .map(|c| InputEvent::FocusChange {
            gained: &c[1] == "I",
        })
        .collect();
    if events.is_empty() {
        None
    } else {
        Some(events)
    }
}

/// Whole-chunk `CSI y;x R` cursor-position reply, 1-based on the wire.
fn try_cursor_reply(text: &str) -> Option<InputEvent> {
    let c = CURSOR_REPLY_RE.captures(text)?;
    let y: i32 = c[1].parse().ok()?;
    let x: i32 = c[2].parse().ok()?;
    Some(InputEvent::CursorPositionReply {
        position: Position::new(x - 1, y - 1),
    })
}

/// Whole-chunk primary/secondary device-attributes reply.
fn try_device_attributes(text: &str) -> Option<InputEvent> {
    let c = DEVICE_ATTRS_RE.captures(text)?;
    let kind = if &c[1] == "?" {
        DaKind::Primary
    } else {
        DaKind::Secondary
    };
    let params: Vec<u32> = c[2].split(';').filter_map(|p| p.parse().ok()).collect();
    Some(InputEvent::DeviceAttributes {
        kind,
        device_type: params.first().copied().unwrap_or(0),
        version: params.get(1).copied().unwrap_or(0),
        extra: params.get(2..).unwrap_or_default().to_vec(),
    })
}

/// Decode bytes leniently: well-formed UTF-8 passes through (DECSET 1005
/// widened coordinates rely on this), anything else keeps its Latin-1
/// scalar value. A chunk that is a single byte with the high bit set is
/// the legacy 8-bit meta convention and is rewritten to `ESC` + low bits.
fn decode_permissive(bytes: &[u8]) -> String {
    if bytes.len() == 1 && bytes[0] >= 0x80 {
        let mut out = String::with_capacity(2);
        out.push('\x1b');
        out.push((bytes[0] & 0x7f) as char);
        return out;
    }

    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(tail) => {
                out.push_str(tail);
                break;
            }
            Err(err) => {
                let (valid, after) = rest.split_at(err.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                out.push(after[0] as char);
                rest = &after[1..];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use xenon_common::event::{ButtonState, Key, KeyboardInput, Modifiers, MouseButton, MouseEvent};

    /// Events minus the raw-processed bookkeeping entries.
    fn semantic(events: Vec<InputEvent>) -> Vec<InputEvent> {
        events
            .into_iter()
            .filter(|e| !matches!(e, InputEvent::RawProcessed(_)))
            .collect()
    }

    #[test]
    fn test_meta_high_bit_byte() {
        let mut dec = InputDecoder::new();
        // 0xe1 = 0x80 | 'a'.
        let events = dec.decode(&[0xe1]);
        assert_eq!(
            events,
            vec![InputEvent::key(Key::Char('a'), Modifiers::META)]
        );
    }

    #[test]
    fn test_permissive_decode() {
        assert_eq!(decode_permissive(b"abc"), "abc");
        assert_eq!(decode_permissive("é".as_bytes()), "é");
        // Invalid bytes keep their scalar value; two bytes so the meta
        // rewrite does not apply.
        assert_eq!(decode_permissive(&[0xff, 0xff]), "\u{ff}\u{ff}");
    }

    #[test]
    fn test_focus_events() {
        let mut dec = InputDecoder::new();
        let events = semantic(dec.decode(b"\x1b[I"));
        assert_eq!(events, vec![InputEvent::FocusChange { gained: true }]);
        let events = semantic(dec.decode(b"\x1b[O"));
        assert_eq!(events, vec![InputEvent::FocusChange { gained: false }]);
    }

    #[test]
    fn test_focus_swallows_interleaved_mouse() {
        let mut dec = InputDecoder::new();
        let events = semantic(dec.decode(b"\x1b[I\x1b[O\x1b[M\x20\x21\x21\x1b[O\x1b[M\x20\x21\x21"));
        assert_eq!(
            events,
            vec![
                InputEvent::FocusChange { gained: true },
                InputEvent::FocusChange { gained: false },
                InputEvent::FocusChange { gained: false },
            ]
        );
    }

    #[test]
    fn test_cursor_reply_only_when_armed() {
        let mut dec = InputDecoder::new();
        // Unarmed: the reply is not recognized as such.
        let events = semantic(dec.decode(b"\x1b[5;10R"));
        assert!(!events
            .iter()
            .any(|e| matches!(e, InputEvent::CursorPositionReply { .. })));

        dec.set_awaiting_cursor_reply(true);
        let events = semantic(dec.decode(b"\x1b[5;10R"));
        assert_eq!(
            events,
            vec![InputEvent::CursorPositionReply {
                position: Position::new(9, 4)
            }]
        );
        // The flag is one-shot.
        let events = semantic(dec.decode(b"\x1b[5;10R"));
        assert!(!events
            .iter()
            .any(|e| matches!(e, InputEvent::CursorPositionReply { .. })));
    }

    #[test]
    fn test_device_attributes() {
        let mut dec = InputDecoder::new();
        let events = semantic(dec.decode(b"\x1b[?64;1;2;6c"));
        assert_eq!(
            events,
            vec![InputEvent::DeviceAttributes {
                kind: DaKind::Primary,
                device_type: 64,
                version: 1,
                extra: vec![2, 6],
            }]
        );
        let events = semantic(dec.decode(b"\x1b[>41;351;0c"));
        assert_eq!(
            events,
            vec![InputEvent::DeviceAttributes {
                kind: DaKind::Secondary,
                device_type: 41,
                version: 351,
                extra: vec![0],
            }]
        );
    }

    #[test]
    fn test_sgr_mouse_chunk() {
        let mut dec = InputDecoder::new();
        let events = semantic(dec.decode(b"\x1b[<0;1;1M"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(0, 0),
                button: MouseButton::Left,
                state: ButtonState::Pressed,
                mods: Modifiers::empty(),
            })]
        );
    }

    #[test]
    fn test_paste_split_across_chunks() {
        let mut dec = InputDecoder::new();
        assert!(semantic(dec.decode(b"\x1b[200~start")).is_empty());
        assert!(dec.paste_pending());
        assert!(semantic(dec.decode(b"second")).is_empty());
        let events = semantic(dec.decode(b"end\x1b[201~"));
        assert_eq!(events, vec![InputEvent::paste("startsecondend", true)]);
        assert!(!dec.paste_pending());
    }

    #[test]
    fn test_paste_timeout_scenario() {
        let mut dec = InputDecoder::new();
        dec.decode(b"\x1b[200~start");
        dec.decode(b"second");
        // Driver notices the deadline passed.
        let flushed = dec.flush_paste();
        assert_eq!(flushed, Some(InputEvent::paste("startsecond", true)));
        // Late tail: terminator first, then the leftover characters.
        let events = semantic(dec.decode(b"end\x1b[201~"));
        assert_eq!(
            events,
            vec![
                InputEvent::Unhandled("\x1b[201~".into()),
                InputEvent::plain_key(Key::Char('e')),
                InputEvent::plain_key(Key::Char('n')),
                InputEvent::plain_key(Key::Char('d')),
            ]
        );
    }

    #[test]
    fn test_raw_processed_reported_for_handled_chunks() {
        let mut dec = InputDecoder::new();
        let events = dec.decode(b"\x1b[I");
        assert_eq!(
            events.last(),
            Some(&InputEvent::RawProcessed("\x1b[I".into()))
        );
    }

    #[test]
    fn test_plain_text_chunk() {
        let mut dec = InputDecoder::new();
        let events = dec.decode(b"hi");
        assert_eq!(
            events,
            vec![
                InputEvent::plain_key(Key::Char('h')),
                InputEvent::plain_key(Key::Char('i')),
            ]
        );
    }

    #[test]
    fn test_unicode_text_chunk() {
        let mut dec = InputDecoder::new();
        let events = dec.decode("héllo".as_bytes());
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[1],
            InputEvent::Keyboard(KeyboardInput::Unicode("é".into()))
        );
    }
}
