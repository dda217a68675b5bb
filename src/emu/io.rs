use std::sync::{
    Arc,
    atomic::{AtomicU16, Ordering},
};

use super::{DISPLAY_ROW_BYTES, DISPLAY_X, DISPLAY_Y, FRAMEBUFFER_SIZE, KEY_DOWN, Opcode};
use crate::u4;

/// Display device driven by the emulator.
///
/// Pixel updates and clears are only recorded by the implementation; the
/// screen is painted when `render_screen` is called once per frame.
pub trait Renderer {
    /// Paint the current frame.
    fn render_screen(&mut self);
    /// Turn every pixel off.
    fn clear_screen(&mut self);
    /// Set a single pixel.
    fn update_pixel(&mut self, x: usize, y: usize, on: bool);
    /// Machine state at the end of the frame, delivered before `render_screen`.
    fn update_status(&mut self, _status: &FrameStatus) {}
}

/// Where the machine stands after a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStatus {
    pub pc: u16,
    /// The instruction at `pc`, if it decodes.
    pub next: Option<Opcode>,
    pub cycles: u64,
}

/// Framebuffer change notification produced by the mapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenEvent {
    Cleared,
    /// One framebuffer byte (eight horizontal pixels) now holds `byte`.
    ByteUpdated { offset: usize, byte: u8 },
}

impl ScreenEvent {
    /// Forward this event to a renderer.
    pub fn apply(self, renderer: &mut dyn Renderer) {
        match self {
            ScreenEvent::Cleared => renderer.clear_screen(),
            ScreenEvent::ByteUpdated { offset, byte } => {
                let y = offset / DISPLAY_ROW_BYTES;
                let x0 = (offset % DISPLAY_ROW_BYTES) * 8;
                for bit in 0..8 {
                    renderer.update_pixel(x0 + bit, y, byte & (0x80 >> bit) != 0);
                }
            }
        }
    }
}

/// Shared keypad latch.
///
/// Holds the (pressed flag, key value) pair in a single atomic word so an
/// input thread and the CPU never observe half of an update. Clones share the
/// same latch.
#[derive(Clone, Debug, Default)]
pub struct Keypad {
    latch: Arc<AtomicU16>,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch `key` as the pressed key, replacing any previous one.
    pub fn press(&self, key: u4) {
        self.latch
            .store(u16::from(KEY_DOWN) << 8 | u16::from(key), Ordering::Release);
    }

    /// Clear the pressed flag. The last key value stays readable.
    pub fn release(&self) {
        self.latch.fetch_and(0x00FF, Ordering::AcqRel);
    }

    pub fn is_pressed(&self) -> bool {
        self.flag_byte() == KEY_DOWN
    }

    pub fn pressed_value(&self) -> Option<u8> {
        let (flag, value) = self.snapshot();
        (flag == KEY_DOWN).then_some(value)
    }

    pub fn is_value_pressed(&self, value: u8) -> bool {
        self.pressed_value() == Some(value)
    }

    pub fn flag_byte(&self) -> u8 {
        self.snapshot().0
    }

    pub fn value_byte(&self) -> u8 {
        self.snapshot().1
    }

    pub(crate) fn write_flag_byte(&self, byte: u8) {
        self.update(|word| u16::from(byte) << 8 | (word & 0x00FF));
    }

    pub(crate) fn write_value_byte(&self, byte: u8) {
        self.update(|word| (word & 0xFF00) | u16::from(byte));
    }

    fn snapshot(&self) -> (u8, u8) {
        let word = self.latch.load(Ordering::Acquire);
        ((word >> 8) as u8, word as u8)
    }

    fn update(&self, f: impl Fn(u16) -> u16) {
        // Infallible: the closure always returns Some.
        self.latch
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| Some(f(word)))
            .ok();
    }
}

/// Memory-mapped screen and keyboard.
///
/// Owns the bit-packed framebuffer (bit 7 of byte 0 is the top-left pixel) and
/// the keypad latch, and queues `ScreenEvent`s for the scheduler to forward.
pub struct IoMapper {
    framebuffer: [u8; FRAMEBUFFER_SIZE],
    keypad: Keypad,
    events: Vec<ScreenEvent>,
    /// Set when the event queue overflowed and was dropped; the next flush
    /// repaints every byte instead.
    needs_full_repaint: bool,
}

impl IoMapper {
    pub fn new(keypad: Keypad) -> Self {
        Self {
            framebuffer: [0; FRAMEBUFFER_SIZE],
            keypad,
            events: Vec::new(),
            needs_full_repaint: false,
        }
    }

    pub fn clear_screen(&mut self) {
        self.framebuffer.fill(0);
        self.events.clear();
        self.needs_full_repaint = false;
        self.events.push(ScreenEvent::Cleared);
    }

    /// XOR-blit `rows` with the top-left corner at (`x`, `y`), wrapping at the
    /// screen edges. Returns true if any lit pixel was turned off.
    pub fn draw_sprite(&mut self, x: u8, y: u8, rows: &[u8]) -> bool {
        let x = x as usize % DISPLAY_X;
        let y = y as usize % DISPLAY_Y;

        let column = x / 8;
        let shift = x % 8;

        let mut erased = false;
        for (n, &sprite) in rows.iter().enumerate() {
            let row_start = (y + n) % DISPLAY_Y * DISPLAY_ROW_BYTES;

            // An unaligned row straddles two bytes:
            //   |10011001|        |  shifted 3 bits right becomes
            //   |   10011|001     |
            let msb = row_start + column;
            erased |= self.xor_byte(msb, sprite >> shift);

            if shift != 0 {
                let lsb = row_start + (column + 1) % DISPLAY_ROW_BYTES;
                erased |= self.xor_byte(lsb, sprite << (8 - shift));
            }
        }

        erased
    }

    pub fn is_key_pressed(&self) -> bool {
        self.keypad.is_pressed()
    }

    pub fn pressed_key_value(&self) -> Option<u8> {
        self.keypad.pressed_value()
    }

    pub fn is_key_value_pressed(&self, value: u8) -> bool {
        self.keypad.is_value_pressed(value)
    }

    pub fn press_key(&self, key: u4) {
        self.keypad.press(key);
    }

    pub fn release_key(&self) {
        self.keypad.release();
    }

    /// Handle to the keypad latch for use from another thread.
    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.framebuffer[y * DISPLAY_ROW_BYTES + x / 8] & (0x80 >> (x % 8)) != 0
    }

    pub fn framebuffer(&self) -> &[u8; FRAMEBUFFER_SIZE] {
        &self.framebuffer
    }

    /// Read a framebuffer byte by offset into the screen region.
    pub(crate) fn read_screen_byte(&self, offset: usize) -> u8 {
        self.framebuffer[offset]
    }

    /// Write a framebuffer byte directly, as a memory store into the screen
    /// region does.
    pub(crate) fn write_screen_byte(&mut self, offset: usize, byte: u8) {
        self.framebuffer[offset] = byte;
        self.push_event(ScreenEvent::ByteUpdated { offset, byte });
    }

    /// Take the queued events without forwarding them anywhere.
    ///
    /// After an overflow this is a `Cleared` followed by one `ByteUpdated`
    /// per framebuffer byte, and queueing resumes.
    pub fn drain_events(&mut self) -> Vec<ScreenEvent> {
        if !std::mem::take(&mut self.needs_full_repaint) {
            return std::mem::take(&mut self.events);
        }

        self.events.clear();
        std::iter::once(ScreenEvent::Cleared)
            .chain(
                self.framebuffer
                    .iter()
                    .enumerate()
                    .map(|(offset, &byte)| ScreenEvent::ByteUpdated { offset, byte }),
            )
            .collect()
    }

    /// Forward queued events to `renderer`.
    pub fn flush_events(&mut self, renderer: &mut dyn Renderer) {
        for event in self.drain_events() {
            event.apply(renderer);
        }
    }

    fn xor_byte(&mut self, offset: usize, bits: u8) -> bool {
        let read = self.framebuffer[offset];
        let written = read ^ bits;
        self.framebuffer[offset] = written;
        self.push_event(ScreenEvent::ByteUpdated {
            offset,
            byte: written,
        });

        // XOR differs from OR exactly when a set bit was cleared
        written != read | bits
    }

    fn push_event(&mut self, event: ScreenEvent) {
        if self.needs_full_repaint {
            return;
        }
        if self.events.len() >= FRAMEBUFFER_SIZE * 2 {
            self.events.clear();
            self.needs_full_repaint = true;
            return;
        }
        self.events.push(event);
    }
}

impl Default for IoMapper {
    fn default() -> Self {
        Self::new(Keypad::new())
    }
}
