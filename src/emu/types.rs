/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomLoadError { size: usize, max_size: usize },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: u16 },

    #[error("Stack overflow: call depth exceeded {depth} at address {address:#06X}")]
    StackOverflow { depth: usize, address: u16 },

    #[error("Stack underflow: attempted to return from a subroutine with empty call stack")]
    StackUnderflow,

    #[error("Unknown opcode: {opcode:#06X}")]
    UnknownOpcode { opcode: u16 },
}

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;

/// Number of bytes backing one 64-pixel row of the framebuffer.
pub const DISPLAY_ROW_BYTES: usize = DISPLAY_X / 8;
/// Size of the bit-packed framebuffer (one bit per pixel).
pub const FRAMEBUFFER_SIZE: usize = DISPLAY_X * DISPLAY_Y / 8;

// Memory map. The font sits at the bottom, followed by the memory-mapped
// framebuffer and the two keypad bytes. Programs start at 0x200.
pub const MEMORY_SIZE: usize = 4096;
pub const ROM_START_ADDRESS: usize = 0x200;
pub const FRAMEBUFFER_START_ADDRESS: usize = 0x050;
pub const FRAMEBUFFER_END_ADDRESS: usize = FRAMEBUFFER_START_ADDRESS + FRAMEBUFFER_SIZE;
pub const KEY_PRESSED_ADDRESS: usize = 0x150;
pub const KEY_VALUE_ADDRESS: usize = 0x151;

/// Values stored in the pressed-flag byte.
pub const KEY_DOWN: u8 = 0xFF;
pub const KEY_UP: u8 = 0x00;

/// Slots in the return-address stack.
pub const STACK_SIZE: usize = 16;
/// Deepest nesting `CALL` accepts. Four slots of `STACK_SIZE` stay reserved,
/// as on the classic interpreter.
pub const MAX_CALL_DEPTH: usize = 12;
