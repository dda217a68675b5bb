mod chip8;
mod execute;
mod font;
mod io;
mod memory;
mod opcode;
mod runner;
mod types;

pub use chip8::*;
pub use font::*;
pub use io::*;
pub use memory::*;
pub use opcode::*;
pub use runner::*;
pub use types::*;
