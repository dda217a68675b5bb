use super::{Chip8, Chip8Error, MAX_CALL_DEPTH, Opcode, OpcodeALU, glyph_address};
use crate::u4;

impl Chip8 {
    /// Applies one decoded instruction.
    ///
    /// The program counter is expected to already point past the instruction;
    /// only jumps, calls, skips and the key wait touch it here.
    pub fn exec(&mut self, opcode: Opcode) -> Result<(), Chip8Error> {
        match opcode {
            Opcode::ClearDisplay => {
                self.memory.io_mut().clear_screen();
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn.get();
            }
            Opcode::JumpWithOffset { nnn } => {
                self.pc = nnn.get().wrapping_add(self.v[0].into());
            }
            Opcode::Call { nnn } => {
                if self.sp >= MAX_CALL_DEPTH {
                    return Err(Chip8Error::StackOverflow {
                        depth: MAX_CALL_DEPTH,
                        address: self.pc,
                    });
                }
                self.stack[self.sp] = self.pc;
                self.sp += 1;
                self.pc = nnn.get();
            }
            Opcode::Return => {
                self.sp = self.sp.checked_sub(1).ok_or(Chip8Error::StackUnderflow)?;
                self.pc = self.stack[self.sp];
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                self.skip_if(self.v[x] == nn);
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                self.skip_if(self.v[x] != nn);
            }
            Opcode::SkipRegEqualReg { x, y } => {
                self.skip_if(self.v[x] == self.v[y]);
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                self.skip_if(self.v[x] != self.v[y]);
            }
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = rand::random();
                self.v[x] = rand_byte & nn;
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn.get();
            }
            Opcode::AddIndexReg { x } => {
                self.i = self.i.wrapping_add(self.v[x].into());
            }
            Opcode::Draw { x, y, n } => {
                let erased = self
                    .memory
                    .draw_sprite(self.v[x], self.v[y], self.i, n.get())?;
                self.v[0xF] = erased as u8;
            }
            Opcode::SkipIfPressed { x } => {
                self.skip_if(self.memory.io().is_key_value_pressed(self.v[x]));
            }
            Opcode::SkipIfNotPressed { x } => {
                self.skip_if(!self.memory.io().is_key_value_pressed(self.v[x]));
            }
            Opcode::WaitForKey { x } => match self.memory.io().pressed_key_value() {
                Some(key) => self.v[x] = key,
                // Run this instruction again on the next cycle
                None => self.pc = self.pc.wrapping_sub(2),
            },
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer;
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer = self.v[x];
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer = self.v[x];
            }
            Opcode::FontChar { x } => {
                self.i = glyph_address(self.v[x]);
            }
            Opcode::BCD { x } => {
                let value = self.v[x];
                self.memory.write(self.i, value / 100)?;
                self.memory.write(self.i.wrapping_add(1), (value / 10) % 10)?;
                self.memory.write(self.i.wrapping_add(2), value % 10)?;
            }
            Opcode::StoreRegs { x } => {
                for reg_index in 0..=usize::from(x) {
                    self.memory
                        .write(self.i.wrapping_add(reg_index as u16), self.v[reg_index])?;
                }
            }
            Opcode::LoadRegs { x } => {
                for reg_index in 0..=usize::from(x) {
                    self.v[reg_index] = self.memory.read(self.i.wrapping_add(reg_index as u16))?;
                }
            }
        };

        Ok(())
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU) {
        match op {
            OpcodeALU::Set => self.v[x] = self.v[y],
            OpcodeALU::Or => self.v[x] |= self.v[y],
            OpcodeALU::And => self.v[x] &= self.v[y],
            OpcodeALU::Xor => self.v[x] ^= self.v[y],
            OpcodeALU::Add => {
                let (res, overflow) = self.v[x].overflowing_add(self.v[y]);
                self.v[x] = res;
                self.v[0xF] = overflow as u8;
            }
            OpcodeALU::Sub => {
                let (a, b) = (self.v[x], self.v[y]);
                self.v[x] = a.wrapping_sub(b);
                self.v[0xF] = (a > b) as u8;
            }
            OpcodeALU::SubReverse => {
                let (a, b) = (self.v[x], self.v[y]);
                self.v[x] = b.wrapping_sub(a);
                self.v[0xF] = (b > a) as u8;
            }
            // Shifts operate on Vx in place; Vy is ignored
            OpcodeALU::ShiftRight => {
                let lsb = self.v[x] & 1;
                self.v[x] >>= 1;
                self.v[0xF] = lsb;
            }
            OpcodeALU::ShiftLeft => {
                let msb = (self.v[x] >> 7) & 1;
                self.v[x] <<= 1;
                self.v[0xF] = msb;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{emu::FRAMEBUFFER_START_ADDRESS, u12};

    fn r(n: u8) -> u4 {
        u4::new(n)
    }

    fn alu(a: u8, b: u8, op: OpcodeALU) -> (u8, u8) {
        let mut chip8 = Chip8::new();
        chip8.v[1] = a;
        chip8.v[2] = b;
        chip8.exec(Opcode::ALU { x: r(1), y: r(2), op }).unwrap();
        (chip8.v[1], chip8.v[0xF])
    }

    #[test]
    fn jump_sets_pc() {
        let mut chip8 = Chip8::new();
        chip8.exec(Opcode::Jump { nnn: u12::new(0x0FF) }).unwrap();
        assert_eq!(chip8.pc, 0x0FF);
    }

    #[test]
    fn jump_with_offset_adds_v0() {
        let mut chip8 = Chip8::new();
        chip8.v[0] = 0x10;
        chip8.exec(Opcode::JumpWithOffset { nnn: u12::new(0x300) }).unwrap();
        assert_eq!(chip8.pc, 0x310);
    }

    #[test]
    fn nested_calls_push_return_addresses() {
        let mut chip8 = Chip8::new();
        chip8.exec(Opcode::Call { nnn: u12::new(0x2FF) }).unwrap();
        chip8.exec(Opcode::Call { nnn: u12::new(0x4FF) }).unwrap();

        assert_eq!(chip8.stack(), &[0x200u16, 0x2FF]);
        assert_eq!(chip8.pc, 0x4FF);
    }

    #[test]
    fn thirteenth_call_overflows() {
        let mut chip8 = Chip8::new();
        for addr in 0..12 {
            chip8.exec(Opcode::Call { nnn: u12::new(addr) }).unwrap();
        }

        let err = chip8.exec(Opcode::Call { nnn: u12::new(0xFFF) }).unwrap_err();
        assert!(matches!(err, Chip8Error::StackOverflow { depth: 12, .. }));
        assert_eq!(chip8.stack().len(), 12);
        assert_eq!(chip8.pc, 11);
    }

    #[test]
    fn returns_unwind_in_lifo_order() {
        let mut chip8 = Chip8::new();
        let targets = [0x300, 0x400, 0x500];
        let mut expected_returns = Vec::new();
        for target in targets {
            expected_returns.push(chip8.pc);
            chip8.exec(Opcode::Call { nnn: u12::new(target) }).unwrap();
        }

        while let Some(expected) = expected_returns.pop() {
            chip8.exec(Opcode::Return).unwrap();
            assert_eq!(chip8.pc, expected);
        }
        assert!(chip8.stack().is_empty());
    }

    #[test]
    fn return_on_empty_stack_underflows() {
        let mut chip8 = Chip8::new();
        assert_eq!(chip8.exec(Opcode::Return), Err(Chip8Error::StackUnderflow));
    }

    #[test]
    fn skip_if_equal_immediate() {
        let mut chip8 = Chip8::new();
        chip8.v[5] = 0x9;

        chip8.exec(Opcode::SkipRegEqualImm { x: r(4), nn: 0x9 }).unwrap();
        assert_eq!(chip8.pc, 0x200);

        chip8.exec(Opcode::SkipRegEqualImm { x: r(5), nn: 0x0 }).unwrap();
        assert_eq!(chip8.pc, 0x200);

        chip8.exec(Opcode::SkipRegEqualImm { x: r(5), nn: 0x9 }).unwrap();
        assert_eq!(chip8.pc, 0x202);
    }

    #[test]
    fn skip_if_not_equal_immediate() {
        let mut chip8 = Chip8::new();
        chip8.v[5] = 0x9;

        chip8.exec(Opcode::SkipRegNotEqualImm { x: r(5), nn: 0x9 }).unwrap();
        assert_eq!(chip8.pc, 0x200);

        chip8.exec(Opcode::SkipRegNotEqualImm { x: r(5), nn: 0x1 }).unwrap();
        assert_eq!(chip8.pc, 0x202);
    }

    #[test]
    fn skip_on_register_comparison() {
        let mut chip8 = Chip8::new();
        chip8.v[1] = 7;
        chip8.v[2] = 7;
        chip8.v[3] = 8;

        chip8.exec(Opcode::SkipRegEqualReg { x: r(1), y: r(2) }).unwrap();
        assert_eq!(chip8.pc, 0x202);
        chip8.exec(Opcode::SkipRegEqualReg { x: r(1), y: r(3) }).unwrap();
        assert_eq!(chip8.pc, 0x202);
        chip8.exec(Opcode::SkipRegNotEqualReg { x: r(1), y: r(3) }).unwrap();
        assert_eq!(chip8.pc, 0x204);
        chip8.exec(Opcode::SkipRegNotEqualReg { x: r(1), y: r(2) }).unwrap();
        assert_eq!(chip8.pc, 0x204);
    }

    #[test]
    fn add_immediate_wraps_without_flag() {
        let mut chip8 = Chip8::new();
        chip8.v[1] = 0xFF;
        chip8.v[0xF] = 0x42;
        chip8.exec(Opcode::AddRegImm { x: r(1), nn: 0x02 }).unwrap();
        assert_eq!(chip8.v[1], 0x01);
        assert_eq!(chip8.v[0xF], 0x42);
    }

    #[test]
    fn add_sets_carry_exactly_on_overflow() {
        for a in 0..=u8::MAX {
            for b in 0..=u8::MAX {
                let sum = a as u16 + b as u16;
                assert_eq!(
                    alu(a, b, OpcodeALU::Add),
                    ((sum % 256) as u8, (sum > 255) as u8)
                );
            }
        }
    }

    #[test]
    fn sub_flags_no_borrow() {
        for a in 0..=u8::MAX {
            for b in 0..=u8::MAX {
                assert_eq!(alu(a, b, OpcodeALU::Sub), (a.wrapping_sub(b), (a > b) as u8));
                assert_eq!(
                    alu(a, b, OpcodeALU::SubReverse),
                    (b.wrapping_sub(a), (b > a) as u8)
                );
            }
        }
    }

    #[test]
    fn shifts_flag_the_bit_shifted_out() {
        for a in 0..=u8::MAX {
            assert_eq!(alu(a, 0xAA, OpcodeALU::ShiftRight), (a >> 1, a & 1));
            assert_eq!(alu(a, 0xAA, OpcodeALU::ShiftLeft), (a << 1, (a & 0x80) >> 7));
        }
    }

    #[test]
    fn bitwise_ops_leave_flag_alone() {
        let mut chip8 = Chip8::new();
        chip8.v[0xF] = 0x5A;
        chip8.v[1] = 0b1100;
        chip8.v[2] = 0b1010;

        chip8.exec(Opcode::ALU { x: r(1), y: r(2), op: OpcodeALU::Or }).unwrap();
        assert_eq!(chip8.v[1], 0b1110);
        chip8.exec(Opcode::ALU { x: r(1), y: r(2), op: OpcodeALU::And }).unwrap();
        assert_eq!(chip8.v[1], 0b1010);
        chip8.exec(Opcode::ALU { x: r(1), y: r(2), op: OpcodeALU::Xor }).unwrap();
        assert_eq!(chip8.v[1], 0);
        chip8.exec(Opcode::ALU { x: r(3), y: r(2), op: OpcodeALU::Set }).unwrap();
        assert_eq!(chip8.v[3], 0b1010);

        assert_eq!(chip8.v[0xF], 0x5A);
    }

    #[test]
    fn random_is_masked() {
        let mut chip8 = Chip8::new();
        for _ in 0..64 {
            chip8.exec(Opcode::Random { x: r(1), nn: 0x0F }).unwrap();
            assert_eq!(chip8.v[1] & 0xF0, 0);
        }
        chip8.exec(Opcode::Random { x: r(1), nn: 0x00 }).unwrap();
        assert_eq!(chip8.v[1], 0);
    }

    #[test]
    fn index_register_ops() {
        let mut chip8 = Chip8::new();
        chip8.exec(Opcode::SetIndexImm { nnn: u12::new(0xFFE) }).unwrap();
        chip8.v[3] = 0x10;
        chip8.exec(Opcode::AddIndexReg { x: r(3) }).unwrap();
        assert_eq!(chip8.i, 0x100E);
    }

    #[test]
    fn font_char_points_at_glyph() {
        let mut chip8 = Chip8::new();
        chip8.v[2] = 0x1A;
        chip8.exec(Opcode::FontChar { x: r(2) }).unwrap();
        assert_eq!(chip8.i, 0xA * 5);
        assert_eq!(chip8.memory.read(chip8.i), Ok(0xF0));
    }

    #[test]
    fn bcd_writes_decimal_digits() {
        let mut chip8 = Chip8::new();
        chip8.i = 0x300;
        chip8.v[4] = 239;
        chip8.exec(Opcode::BCD { x: r(4) }).unwrap();

        assert_eq!(chip8.memory.read(0x300), Ok(2));
        assert_eq!(chip8.memory.read(0x301), Ok(3));
        assert_eq!(chip8.memory.read(0x302), Ok(9));
    }

    #[test]
    fn store_and_load_register_blocks() {
        let mut chip8 = Chip8::new();
        chip8.i = 0x400;
        for n in 0..16 {
            chip8.v[n] = n as u8 * 3;
        }
        chip8.exec(Opcode::StoreRegs { x: r(3) }).unwrap();

        assert_eq!(chip8.i, 0x400);
        assert_eq!(chip8.memory.read(0x403), Ok(9));
        assert_eq!(chip8.memory.read(0x404), Ok(0));

        chip8.v = [0; 16];
        chip8.exec(Opcode::LoadRegs { x: r(2) }).unwrap();
        assert_eq!(&chip8.v[..4], &[0u8, 3, 6, 0]);
    }

    #[test]
    fn store_into_screen_region_draws() {
        let mut chip8 = Chip8::new();
        chip8.i = FRAMEBUFFER_START_ADDRESS as u16;
        chip8.v[0] = 0x80;
        chip8.exec(Opcode::StoreRegs { x: r(0) }).unwrap();

        assert!(chip8.get_display_pixel(0, 0));
    }

    #[test]
    fn block_store_past_memory_end_fails() {
        let mut chip8 = Chip8::new();
        chip8.i = 0xFFE;
        let err = chip8.exec(Opcode::StoreRegs { x: r(3) }).unwrap_err();
        assert_eq!(err, Chip8Error::MemoryOutOfBounds { address: 0x1000 });
    }

    #[test]
    fn timer_registers_copy() {
        let mut chip8 = Chip8::new();
        chip8.v[1] = 30;
        chip8.v[2] = 40;
        chip8.exec(Opcode::SetDelayTimer { x: r(1) }).unwrap();
        chip8.exec(Opcode::SetSoundTimer { x: r(2) }).unwrap();
        chip8.timers_cycle();
        chip8.exec(Opcode::ReadDelayTimer { x: r(3) }).unwrap();

        assert_eq!(chip8.v[3], 29);
        assert_eq!(chip8.sound_timer, 39);
        assert!(chip8.should_beep());
    }

    #[test]
    fn key_skips_compare_latched_value() {
        let mut chip8 = Chip8::new();
        chip8.v[1] = 0x5;

        chip8.exec(Opcode::SkipIfPressed { x: r(1) }).unwrap();
        assert_eq!(chip8.pc, 0x200);
        chip8.exec(Opcode::SkipIfNotPressed { x: r(1) }).unwrap();
        assert_eq!(chip8.pc, 0x202);

        chip8.press_key(r(0x5));
        chip8.exec(Opcode::SkipIfPressed { x: r(1) }).unwrap();
        assert_eq!(chip8.pc, 0x204);
        chip8.exec(Opcode::SkipIfNotPressed { x: r(1) }).unwrap();
        assert_eq!(chip8.pc, 0x204);

        chip8.press_key(r(0x6));
        chip8.exec(Opcode::SkipIfPressed { x: r(1) }).unwrap();
        assert_eq!(chip8.pc, 0x204);
    }

    #[test]
    fn wait_for_key_rewinds_until_pressed() {
        let mut chip8 = Chip8::new();
        chip8.pc = 0x202;

        chip8.exec(Opcode::WaitForKey { x: r(7) }).unwrap();
        assert_eq!(chip8.pc, 0x200);

        chip8.pc = 0x202;
        chip8.press_key(r(0xB));
        chip8.exec(Opcode::WaitForKey { x: r(7) }).unwrap();
        assert_eq!(chip8.pc, 0x202);
        assert_eq!(chip8.v[7], 0xB);
    }

    #[test]
    fn draw_sets_collision_flag() {
        let mut chip8 = Chip8::new();
        chip8.i = 0; // glyph "0"
        chip8.v[0] = 10;
        chip8.v[1] = 4;

        chip8.exec(Opcode::Draw { x: r(0), y: r(1), n: r(5) }).unwrap();
        assert_eq!(chip8.v[0xF], 0);
        assert!(chip8.get_display_pixel(4, 10));

        chip8.exec(Opcode::Draw { x: r(0), y: r(1), n: r(5) }).unwrap();
        assert_eq!(chip8.v[0xF], 1);
        assert!(chip8.io().framebuffer().iter().all(|&b| b == 0));
    }

    #[test]
    fn clear_display_blanks_framebuffer() {
        let mut chip8 = Chip8::new();
        chip8.exec(Opcode::Draw { x: r(0), y: r(0), n: r(5) }).unwrap();
        chip8.exec(Opcode::ClearDisplay).unwrap();
        assert!(chip8.io().framebuffer().iter().all(|&b| b == 0));
    }
}
