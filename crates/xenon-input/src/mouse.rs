use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;
use xenon_common::event::{ButtonState, InputEvent, Modifiers, MouseButton, MouseEvent};
use xenon_common::geometry::{Offset, Position};

static SGR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[<(\d+);(\d+);(\d+)([Mm])$").expect("sgr mouse regex"));
static URXVT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+);(\d+);(\d+)M$").expect("urxvt mouse regex"));
static DEC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+);(\d+);(\d+);(\d+)&w$").expect("dec locator regex"));
static VT300_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[24([135])~\[(\d+),(\d+)\]\r$").expect("vt300 mouse regex"));

/// Button-byte fields shared by the X10/URXVT/SGR encodings.
#[derive(Debug, Clone, Copy)]
struct ButtonBits {
    /// 0..=2 buttons, 3 release-without-button, 4..=7 wheel, 8..=11 extra.
    number: i32,
    mods: Modifiers,
    motion: bool,
}

fn decode_button_bits(b: i32) -> ButtonBits {
    let mut mods = Modifiers::empty();
    if b & 4 != 0 {
        mods |= Modifiers::SHIFT;
    }
    if b & 8 != 0 {
        mods |= Modifiers::META;
    }
    if b & 16 != 0 {
        mods |= Modifiers::CTRL;
    }
    let low = b & 3;
    // The extension groups are mutually exclusive; 64 marks the wheel
    // block, 128 the extra-buttons block.
    let number = if b & 64 != 0 {
        4 + low
    } else if b & 128 != 0 {
        8 + low
    } else {
        low
    };
    ButtonBits {
        number,
        mods,
        motion: b & 32 != 0,
    }
}

fn button_from_number(number: i32) -> Option<MouseButton> {
    match number {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Middle),
        2 => Some(MouseButton::Right),
        8..=11 => Some(MouseButton::Extra(number as u8)),
        _ => None,
    }
}

fn scroll_delta(number: i32) -> Option<Offset> {
    match number {
        4 => Some(Offset::new(0, -1)),
        5 => Some(Offset::new(0, 1)),
        6 => Some(Offset::new(1, 0)),
        7 => Some(Offset::new(-1, 0)),
        _ => None,
    }
}

/// Greedy mouse matcher.
///
/// Remembers the last pressed button so the X10 "release without button"
/// byte can be attributed to it.
#[derive(Debug, Default)]
pub(crate) struct MouseDecoder {
    last_pressed: Option<MouseButton>,
}

impl MouseDecoder {
    /// Try to consume a whole chunk as mouse reports. The chunk may carry
    /// several reports back to back; it is split on the ESC bytes and every
    /// segment must parse, otherwise the chunk is left for the key path.
    pub fn try_decode(&mut self, text: &str) -> Option<Vec<InputEvent>> {
        if !text.starts_with('\x1b') {
            return None;
        }
        let mut events = Vec::new();
        for segment in text.split('\x1b').skip(1) {
            if segment.is_empty() {
                return None;
            }
            events.push(self.parse_segment(segment)?);
        }
        if events.is_empty() {
            return None;
        }
        trace!(count = events.len(), "decoded mouse chunk");
        Some(events)
    }

    /// Parse one report with its leading ESC removed.
    fn parse_segment(&mut self, segment: &str) -> Option<InputEvent> {
        if let Some(body) = segment.strip_prefix("[M") {
            return self.parse_x10(body);
        }
        if let Some(c) = SGR_RE.captures(segment) {
            let b: i32 = c[1].parse().ok()?;
            let x: i32 = c[2].parse().ok()?;
            let y: i32 = c[3].parse().ok()?;
            let state = if &c[4] == "M" {
                ButtonState::Pressed
            } else {
                ButtonState::Released
            };
            let bits = decode_button_bits(b);
            return Some(self.emit(bits, Some(state), Position::new(x - 1, y - 1)));
        }
        if let Some(c) = URXVT_RE.captures(segment) {
            let b: i32 = c[1].parse::<i32>().ok()? - 32;
            let x: i32 = c[2].parse().ok()?;
            let y: i32 = c[3].parse().ok()?;
            let bits = decode_button_bits(b);
            return Some(self.emit(bits, None, Position::new(x - 1, y - 1)));
        }
        if let Some(c) = DEC_RE.captures(segment) {
            return self.parse_dec_locator(&c);
        }
        if let Some(c) = VT300_RE.captures(segment) {
            let button = match &c[1] {
                "1" => MouseButton::Left,
                "3" => MouseButton::Middle,
                _ => MouseButton::Right,
            };
            let x: i32 = c[2].parse().ok()?;
            let y: i32 = c[3].parse().ok()?;
            return Some(InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(x - 1, y - 1),
                button,
                state: ButtonState::Pressed,
                mods: Modifiers::empty(),
            }));
        }
        None
    }

    /// X10 report: three scalars after `ESC [ M`. DECSET 1005 widens the
    /// coordinate bytes to UTF-8, which the permissive decode upstream has
    /// already turned into scalars.
    fn parse_x10(&mut self, body: &str) -> Option<InputEvent> {
        let scalars: Vec<i32> = body.chars().map(|ch| ch as i32).collect();
        let [b, x, y] = scalars.as_slice() else {
            return None;
        };
        let bits = decode_button_bits(b - 32);
        let position = Position::new(x10_coord(*x), x10_coord(*y));
        Some(self.emit(bits, None, position))
    }

    fn parse_dec_locator(&mut self, c: &regex::Captures<'_>) -> Option<InputEvent> {
        let pe: i32 = c[1].parse().ok()?;
        let pb: i32 = c[2].parse().ok()?;
        let row: i32 = c[3].parse().ok()?;
        let col: i32 = c[4].parse().ok()?;
        if !(2..=9).contains(&pe) {
            return None;
        }
        // Event codes pair up (down, up) per button.
        let button = match (pe - 2) / 2 {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Extra(8),
        };
        let state = if pe % 2 == 0 {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        };
        let mods = decode_button_bits(pb).mods;
        if state == ButtonState::Pressed {
            self.last_pressed = Some(button);
        }
        Some(InputEvent::Mouse(MouseEvent::Press {
            position: Position::new(col - 1, row - 1),
            button,
            state,
            mods,
        }))
    }

    /// Map decoded button bits to a mouse event. `state_hint` is the
    /// SGR trailing-byte state; the byte-encoded reports infer release
    /// from the button-less number 3.
    fn emit(
        &mut self,
        bits: ButtonBits,
        state_hint: Option<ButtonState>,
        position: Position,
    ) -> InputEvent {
        if let Some(delta) = scroll_delta(bits.number) {
            return InputEvent::Mouse(MouseEvent::Scroll {
                position,
                delta,
                mods: bits.mods,
            });
        }

        if bits.motion {
            return InputEvent::Mouse(MouseEvent::Motion {
                position,
                button: button_from_number(bits.number),
                mods: bits.mods,
            });
        }

        let state = state_hint.unwrap_or(if bits.number == 3 {
            ButtonState::Released
        } else {
            ButtonState::Pressed
        });

        let button = match button_from_number(bits.number) {
            Some(button) => button,
            None => match self.last_pressed.take() {
                Some(button) => button,
                // Release without a button and nothing remembered: all we
                // know is where the pointer is.
                None => {
                    return InputEvent::Mouse(MouseEvent::Motion {
                        position,
                        button: None,
                        mods: bits.mods,
                    })
                }
            },
        };

        if state == ButtonState::Pressed {
            self.last_pressed = Some(button);
        }
        InputEvent::Mouse(MouseEvent::Press {
            position,
            button,
            state,
            mods: bits.mods,
        })
    }
}

/// X10 coordinate decode: overflow repair for scalars that landed in the
/// control range, then bias 32 and 1-based adjustment. A biased zero (the
/// bare 32 byte) stands for 255.
fn x10_coord(scalar: i32) -> i32 {
    let mut v = scalar;
    if v < 0x20 {
        v += 0xff;
    }
    let coord = v - 32;
    let coord = if coord == 0 { 255 } else { coord };
    coord - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Vec<InputEvent> {
        MouseDecoder::default()
            .try_decode(text)
            .expect("chunk should decode as mouse input")
    }

    #[test]
    fn test_sgr_press_release() {
        let mut dec = MouseDecoder::default();
        let press = dec.try_decode("\x1b[<0;1;1M").unwrap();
        assert_eq!(
            press,
            vec![InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(0, 0),
                button: MouseButton::Left,
                state: ButtonState::Pressed,
                mods: Modifiers::empty(),
            })]
        );
        let release = dec.try_decode("\x1b[<0;1;1m").unwrap();
        assert_eq!(
            release,
            vec![InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(0, 0),
                button: MouseButton::Left,
                state: ButtonState::Released,
                mods: Modifiers::empty(),
            })]
        );
    }

    #[test]
    fn test_x10_basic_press() {
        // b = 0x20 → 0 after bias: left button, pressed, at column/row 1.
        let events = decode("\x1b[M\x20\x21\x21");
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
    fn test_x10_wide_coordinates() {
        // 0xff scalars decode to 222 zero-based.
        let events = decode("\x1b[M\x20\u{ff}\u{ff}");
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(222, 222),
                button: MouseButton::Left,
                state: ButtonState::Pressed,
                mods: Modifiers::empty(),
            })]
        );
    }

    #[test]
    fn test_x10_zero_coordinate_means_255() {
        let events = decode("\x1b[M\x20\x20\x21");
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(254, 0),
                button: MouseButton::Left,
                state: ButtonState::Pressed,
                mods: Modifiers::empty(),
            })]
        );
    }

    #[test]
    fn test_release_uses_remembered_button() {
        let mut dec = MouseDecoder::default();
        // '"' = 34 → button 2 (right) pressed.
        dec.try_decode("\x1b[M\x22\x21\x21").unwrap();
        // '#' = 35 → release without button.
        let release = dec.try_decode("\x1b[M\x23\x21\x21").unwrap();
        assert_eq!(
            release,
            vec![InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(0, 0),
                button: MouseButton::Right,
                state: ButtonState::Released,
                mods: Modifiers::empty(),
            })]
        );
        // A second bare release has nothing remembered.
        let motion = dec.try_decode("\x1b[M\x23\x21\x21").unwrap();
        assert!(matches!(
            motion[0],
            InputEvent::Mouse(MouseEvent::Motion { button: None, .. })
        ));
    }

    #[test]
    fn test_scroll_wheel() {
        // 64 | 0 = wheel up; '`' = 96 = 64 + 32 bias.
        let events = decode("\x1b[M\x60\x21\x21");
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::Scroll {
                position: Position::new(0, 0),
                delta: Offset::new(0, -1),
                mods: Modifiers::empty(),
            })]
        );
    }

    #[test]
    fn test_motion_flag() {
        // 32 (motion) + 0 (left) + 32 bias = '@' = 64.
        let events = decode("\x1b[M\x40\x21\x21");
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::Motion {
                position: Position::new(0, 0),
                button: Some(MouseButton::Left),
                mods: Modifiers::empty(),
            })]
        );
    }

    #[test]
    fn test_urxvt_with_modifiers() {
        // b raw 52 → 20 after bias: button 0 + shift(4) + ctrl(16).
        let events = decode("\x1b[52;10;5M");
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(9, 4),
                button: MouseButton::Left,
                state: ButtonState::Pressed,
                mods: Modifiers::SHIFT | Modifiers::CTRL,
            })]
        );
    }

    #[test]
    fn test_dec_locator() {
        let events = decode("\x1b[2;0;5;7&w");
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(6, 4),
                button: MouseButton::Left,
                state: ButtonState::Pressed,
                mods: Modifiers::empty(),
            })]
        );
        let release = decode("\x1b[5;0;5;7&w");
        assert!(matches!(
            release[0],
            InputEvent::Mouse(MouseEvent::Press {
                button: MouseButton::Middle,
                state: ButtonState::Released,
                ..
            })
        ));
    }

    #[test]
    fn test_vt300() {
        let events = decode("\x1b[243~[12,3]\r");
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::Press {
                position: Position::new(11, 2),
                button: MouseButton::Middle,
                state: ButtonState::Pressed,
                mods: Modifiers::empty(),
            })]
        );
    }

    #[test]
    fn test_multiple_reports_in_one_chunk() {
        let mut dec = MouseDecoder::default();
        let events = dec.try_decode("\x1b[<0;1;1M\x1b[<0;2;2m").unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_mixed_chunk_is_rejected() {
        let mut dec = MouseDecoder::default();
        assert!(dec.try_decode("a\x1b[<0;1;1M").is_none());
        assert!(dec.try_decode("\x1b[<0;1;1Mtrailing\x1b[junk").is_none());
    }
}
