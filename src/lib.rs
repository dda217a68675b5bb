//! CHIP-8 virtual machine: instruction decoder, CPU, memory-mapped screen and
//! keypad, and a fixed-rate frame scheduler.

pub mod emu;
mod nibble;

pub use emu::{
    Chip8, Chip8Error, Chip8Runner, DISPLAY_X, DISPLAY_Y, FrameStatus, Keypad, Opcode, Renderer,
    RunState, RunnerConfig, StopHandle,
};
pub use nibble::{join, split, u4, u12};
