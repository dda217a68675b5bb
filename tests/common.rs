#![allow(dead_code)]

use chip8_vm::{Chip8, Chip8Runner, DISPLAY_X, DISPLAY_Y, Renderer, RunnerConfig};

/// Renderer that mirrors pixel updates into a grid and counts calls.
pub struct Screen {
    pub pixels: [[bool; DISPLAY_X]; DISPLAY_Y],
    pub frames: usize,
    pub clears: usize,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            pixels: [[false; DISPLAY_X]; DISPLAY_Y],
            frames: 0,
            clears: 0,
        }
    }
}

impl Renderer for Screen {
    fn render_screen(&mut self) {
        self.frames += 1;
    }

    fn clear_screen(&mut self) {
        self.clears += 1;
        self.pixels = [[false; DISPLAY_X]; DISPLAY_Y];
    }

    fn update_pixel(&mut self, x: usize, y: usize, on: bool) {
        self.pixels[y][x] = on;
    }
}

impl Screen {
    /// One string per row, `#` for lit pixels.
    pub fn lit_rows(&self) -> Vec<String> {
        self.pixels
            .iter()
            .map(|row| row.iter().map(|&on| if on { '#' } else { '.' }).collect())
            .collect()
    }
}

/// Assemble big-endian instruction words into ROM bytes.
pub fn rom(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

pub fn runner(words: &[u16], budget: u64) -> Chip8Runner {
    let mut chip8 = Chip8::new();
    chip8.load(&rom(words)).expect("ROM fits in memory");
    Chip8Runner::new(
        chip8,
        RunnerConfig {
            cycle_budget: Some(budget),
            frame_period: std::time::Duration::ZERO,
            ..RunnerConfig::default()
        },
    )
}
