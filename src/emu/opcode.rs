use std::fmt;

use super::Chip8Error;
use crate::{join, split, u4, u12};

/// CHIP-8 instruction opcodes.
///
/// The fields (x, y, n, nn, nnn) correspond to the operands encoded in the opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// 1nnn - Jump to location nnn.
    Jump { nnn: u12 },
    /// Bnnn - Jump to location nnn + V0.
    JumpWithOffset { nnn: u12 },

    /// 2nnn - Call subroutine at nnn.
    Call { nnn: u12 },
    /// 00EE - Return from a subroutine.
    Return,

    /// 3xnn - Skip next instruction if Vx == nn.
    SkipRegEqualImm { x: u4, nn: u8 },
    /// 4xnn - Skip next instruction if Vx != nn.
    SkipRegNotEqualImm { x: u4, nn: u8 },
    /// 5xy0 - Skip next instruction if Vx == Vy.
    SkipRegEqualReg { x: u4, y: u4 },
    /// 9xy0 - Skip next instruction if Vx != Vy.
    SkipRegNotEqualReg { x: u4, y: u4 },

    /// 6xnn - Set Vx = nn.
    SetRegImm { x: u4, nn: u8 },
    /// 7xnn - Set Vx = Vx + nn.
    AddRegImm { x: u4, nn: u8 },
    /// Annn - Set I = nnn.
    SetIndexImm { nnn: u12 },
    /// Fx1E - Set I = I + Vx.
    AddIndexReg { x: u4 },

    /// 8xyN - ALU operations
    ALU { x: u4, y: u4, op: OpcodeALU },
    /// Cxnn - Set Vx = random byte AND nn.
    Random { x: u4, nn: u8 },

    /// 00E0 - Clear the display.
    ClearDisplay,
    /// Dxyn - Display sprite.
    Draw { x: u4, y: u4, n: u4 },

    /// Ex9E - Skip next instruction if key with the value of Vx is pressed.
    SkipIfPressed { x: u4 },
    /// ExA1 - Skip next instruction if key with the value of Vx is not pressed.
    SkipIfNotPressed { x: u4 },
    /// Fx0A - Wait for a key press, store the value of the key in Vx.
    WaitForKey { x: u4 },

    /// Fx07 - Set Vx = delay timer value.
    ReadDelayTimer { x: u4 },
    /// Fx15 - Set delay timer = Vx.
    SetDelayTimer { x: u4 },
    /// Fx18 - Set sound timer = Vx.
    SetSoundTimer { x: u4 },

    /// Fx29 - Set I = location of sprite for digit Vx.
    FontChar { x: u4 },
    /// Fx33 - Store BCD representation of Vx in memory locations I, I+1, and I+2.
    BCD { x: u4 },

    /// Fx55 - Store registers V0 through Vx in memory starting at location I.
    StoreRegs { x: u4 },
    /// Fx65 - Read registers V0 through Vx from memory starting at location I.
    LoadRegs { x: u4 },
}

/// ALU operations for the 8xyN instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpcodeALU {
    /// 8xy0 - Vx = Vy
    Set,
    /// 8xy1 - Vx = Vx OR Vy
    Or,
    /// 8xy2 - Vx = Vx AND Vy
    And,
    /// 8xy3 - Vx = Vx XOR Vy
    Xor,
    /// 8xy4 - Vx = Vx + Vy, VF = carry
    Add,
    /// 8xy5 - Vx = Vx - Vy, VF = NOT borrow
    Sub,
    /// 8xy6 - Vx = Vx SHR 1, VF = old bit 0
    ShiftRight,
    /// 8xy7 - Vx = Vy - Vx, VF = NOT borrow
    SubReverse,
    /// 8xyE - Vx = Vx SHL 1, VF = old bit 7
    ShiftLeft,
}

impl OpcodeALU {
    fn from_nibble(n: u8) -> Option<Self> {
        Some(match n {
            0x0 => OpcodeALU::Set,
            0x1 => OpcodeALU::Or,
            0x2 => OpcodeALU::And,
            0x3 => OpcodeALU::Xor,
            0x4 => OpcodeALU::Add,
            0x5 => OpcodeALU::Sub,
            0x6 => OpcodeALU::ShiftRight,
            0x7 => OpcodeALU::SubReverse,
            0xE => OpcodeALU::ShiftLeft,
            _ => return None,
        })
    }

    fn nibble(self) -> u4 {
        u4::new(match self {
            OpcodeALU::Set => 0x0,
            OpcodeALU::Or => 0x1,
            OpcodeALU::And => 0x2,
            OpcodeALU::Xor => 0x3,
            OpcodeALU::Add => 0x4,
            OpcodeALU::Sub => 0x5,
            OpcodeALU::ShiftRight => 0x6,
            OpcodeALU::SubReverse => 0x7,
            OpcodeALU::ShiftLeft => 0xE,
        })
    }
}

impl Opcode {
    /// Decode a 16-bit raw opcode into an `Opcode` enum variant.
    pub fn decode(opcode: u16) -> Result<Self, Chip8Error> {
        let [a, x, y, n] = split(opcode);
        let nn = (opcode & 0x00FF) as u8;
        let nnn = u12::new(opcode);

        let decoded = match (a.get(), x.get(), y.get(), n.get()) {
            (0x0, 0x0, 0xE, 0x0) => Opcode::ClearDisplay,
            (0x0, 0x0, 0xE, 0xE) => Opcode::Return,
            (0x1, _, _, _) => Opcode::Jump { nnn },
            (0x2, _, _, _) => Opcode::Call { nnn },
            (0x3, _, _, _) => Opcode::SkipRegEqualImm { x, nn },
            (0x4, _, _, _) => Opcode::SkipRegNotEqualImm { x, nn },
            (0x5, _, _, 0x0) => Opcode::SkipRegEqualReg { x, y },
            (0x6, _, _, _) => Opcode::SetRegImm { x, nn },
            (0x7, _, _, _) => Opcode::AddRegImm { x, nn },
            (0x8, _, _, op) => match OpcodeALU::from_nibble(op) {
                Some(op) => Opcode::ALU { x, y, op },
                None => return Err(Chip8Error::UnknownOpcode { opcode }),
            },
            (0x9, _, _, 0x0) => Opcode::SkipRegNotEqualReg { x, y },
            (0xA, _, _, _) => Opcode::SetIndexImm { nnn },
            (0xB, _, _, _) => Opcode::JumpWithOffset { nnn },
            (0xC, _, _, _) => Opcode::Random { x, nn },
            (0xD, _, _, _) => Opcode::Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => Opcode::SkipIfPressed { x },
            (0xE, _, 0xA, 0x1) => Opcode::SkipIfNotPressed { x },
            (0xF, _, 0x0, 0xA) => Opcode::WaitForKey { x },
            (0xF, _, 0x0, 0x7) => Opcode::ReadDelayTimer { x },
            (0xF, _, 0x1, 0x5) => Opcode::SetDelayTimer { x },
            (0xF, _, 0x1, 0x8) => Opcode::SetSoundTimer { x },
            (0xF, _, 0x1, 0xE) => Opcode::AddIndexReg { x },
            (0xF, _, 0x2, 0x9) => Opcode::FontChar { x },
            (0xF, _, 0x3, 0x3) => Opcode::BCD { x },
            (0xF, _, 0x5, 0x5) => Opcode::StoreRegs { x },
            (0xF, _, 0x6, 0x5) => Opcode::LoadRegs { x },

            _ => return Err(Chip8Error::UnknownOpcode { opcode }),
        };

        Ok(decoded)
    }

    /// Encode back into the 16-bit word `decode` accepts.
    pub fn encode(&self) -> u16 {
        let imm = |family: u16, x: u4, nn: u8| family << 12 | u16::from(x) << 8 | nn as u16;
        let reg = |family: u8, x: u4, y: u4, n: u8| join([u4::new(family), x, y, u4::new(n)]);
        let addr = |family: u16, nnn: u12| family << 12 | nnn.get();
        let misc = |family: u8, x: u4, low: u8| {
            join([u4::new(family), x, u4::low(low >> 4), u4::low(low)])
        };

        match *self {
            Opcode::ClearDisplay => 0x00E0,
            Opcode::Return => 0x00EE,
            Opcode::Jump { nnn } => addr(0x1, nnn),
            Opcode::Call { nnn } => addr(0x2, nnn),
            Opcode::SkipRegEqualImm { x, nn } => imm(0x3, x, nn),
            Opcode::SkipRegNotEqualImm { x, nn } => imm(0x4, x, nn),
            Opcode::SkipRegEqualReg { x, y } => reg(0x5, x, y, 0x0),
            Opcode::SetRegImm { x, nn } => imm(0x6, x, nn),
            Opcode::AddRegImm { x, nn } => imm(0x7, x, nn),
            Opcode::ALU { x, y, op } => join([u4::new(0x8), x, y, op.nibble()]),
            Opcode::SkipRegNotEqualReg { x, y } => reg(0x9, x, y, 0x0),
            Opcode::SetIndexImm { nnn } => addr(0xA, nnn),
            Opcode::JumpWithOffset { nnn } => addr(0xB, nnn),
            Opcode::Random { x, nn } => imm(0xC, x, nn),
            Opcode::Draw { x, y, n } => join([u4::new(0xD), x, y, n]),
            Opcode::SkipIfPressed { x } => misc(0xE, x, 0x9E),
            Opcode::SkipIfNotPressed { x } => misc(0xE, x, 0xA1),
            Opcode::WaitForKey { x } => misc(0xF, x, 0x0A),
            Opcode::ReadDelayTimer { x } => misc(0xF, x, 0x07),
            Opcode::SetDelayTimer { x } => misc(0xF, x, 0x15),
            Opcode::SetSoundTimer { x } => misc(0xF, x, 0x18),
            Opcode::AddIndexReg { x } => misc(0xF, x, 0x1E),
            Opcode::FontChar { x } => misc(0xF, x, 0x29),
            Opcode::BCD { x } => misc(0xF, x, 0x33),
            Opcode::StoreRegs { x } => misc(0xF, x, 0x55),
            Opcode::LoadRegs { x } => misc(0xF, x, 0x65),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Opcode::ClearDisplay => write!(f, "CLS"),
            Opcode::Return => write!(f, "RET"),
            Opcode::Jump { nnn } => write!(f, "JP {:#05X}", nnn.get()),
            Opcode::JumpWithOffset { nnn } => write!(f, "JP V0, {:#05X}", nnn.get()),
            Opcode::Call { nnn } => write!(f, "CALL {:#05X}", nnn.get()),
            Opcode::SkipRegEqualImm { x, nn } => write!(f, "SE V{:X}, {nn:#04X}", x.get()),
            Opcode::SkipRegNotEqualImm { x, nn } => write!(f, "SNE V{:X}, {nn:#04X}", x.get()),
            Opcode::SkipRegEqualReg { x, y } => write!(f, "SE V{:X}, V{:X}", x.get(), y.get()),
            Opcode::SkipRegNotEqualReg { x, y } => {
                write!(f, "SNE V{:X}, V{:X}", x.get(), y.get())
            }
            Opcode::SetRegImm { x, nn } => write!(f, "LD V{:X}, {nn:#04X}", x.get()),
            Opcode::AddRegImm { x, nn } => write!(f, "ADD V{:X}, {nn:#04X}", x.get()),
            Opcode::SetIndexImm { nnn } => write!(f, "LD I, {:#05X}", nnn.get()),
            Opcode::AddIndexReg { x } => write!(f, "ADD I, V{:X}", x.get()),
            Opcode::ALU { x, y, op } => {
                let (x, y) = (x.get(), y.get());
                match op {
                    OpcodeALU::Set => write!(f, "LD V{x:X}, V{y:X}"),
                    OpcodeALU::Or => write!(f, "OR V{x:X}, V{y:X}"),
                    OpcodeALU::And => write!(f, "AND V{x:X}, V{y:X}"),
                    OpcodeALU::Xor => write!(f, "XOR V{x:X}, V{y:X}"),
                    OpcodeALU::Add => write!(f, "ADD V{x:X}, V{y:X}"),
                    OpcodeALU::Sub => write!(f, "SUB V{x:X}, V{y:X}"),
                    OpcodeALU::ShiftRight => write!(f, "SHR V{x:X}"),
                    OpcodeALU::SubReverse => write!(f, "SUBN V{x:X}, V{y:X}"),
                    OpcodeALU::ShiftLeft => write!(f, "SHL V{x:X}"),
                }
            }
            Opcode::Random { x, nn } => write!(f, "RND V{:X}, {nn:#04X}", x.get()),
            Opcode::Draw { x, y, n } => {
                write!(f, "DRW V{:X}, V{:X}, {}", x.get(), y.get(), n.get())
            }
            Opcode::SkipIfPressed { x } => write!(f, "SKP V{:X}", x.get()),
            Opcode::SkipIfNotPressed { x } => write!(f, "SKNP V{:X}", x.get()),
            Opcode::WaitForKey { x } => write!(f, "LD V{:X}, K", x.get()),
            Opcode::ReadDelayTimer { x } => write!(f, "LD V{:X}, DT", x.get()),
            Opcode::SetDelayTimer { x } => write!(f, "LD DT, V{:X}", x.get()),
            Opcode::SetSoundTimer { x } => write!(f, "LD ST, V{:X}", x.get()),
            Opcode::FontChar { x } => write!(f, "LD F, V{:X}", x.get()),
            Opcode::BCD { x } => write!(f, "LD B, V{:X}", x.get()),
            Opcode::StoreRegs { x } => write!(f, "LD [I], V{:X}", x.get()),
            Opcode::LoadRegs { x } => write!(f, "LD V{:X}, [I]", x.get()),
        }
    }
}
