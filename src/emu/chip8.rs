use super::{Chip8Error, IoMapper, Keypad, Memory, Opcode, ROM_START_ADDRESS, STACK_SIZE};
use crate::u4;

/// CHIP-8 virtual machine state
pub struct Chip8 {
    /// 4KB address space, including the memory-mapped screen and keypad
    pub(crate) memory: Memory,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Return addresses for subroutine calls
    pub(crate) stack: [u16; STACK_SIZE],
    /// Number of occupied stack slots
    pub(crate) sp: usize,

    /// Delay timer: decrements once per tick until it reaches 0
    pub(crate) delay_timer: u8,
    /// Sound timer: decrements once per tick, beeps while non-zero
    pub(crate) sound_timer: u8,
}

impl Chip8 {
    /// Creates a machine with zeroed state and the font loaded.
    pub fn new() -> Self {
        Self::with_keypad(Keypad::new())
    }

    /// Like `new`, but sharing an existing keypad latch.
    pub fn with_keypad(keypad: Keypad) -> Self {
        let mut memory = Memory::new(IoMapper::new(keypad));
        memory.load_font();

        Chip8 {
            memory,
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: [0; STACK_SIZE],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
        }
    }

    /// Loads a ROM into program memory and points the program counter at it.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.memory.load_rom(rom)?;
        self.pc = ROM_START_ADDRESS as u16;

        Ok(())
    }

    /// One full cycle: fetch, decode and execute an instruction, then update
    /// the timers.
    pub fn tick(&mut self) -> Result<(), Chip8Error> {
        self.cpu_cycle()?;
        self.timers_cycle();
        Ok(())
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    pub fn cpu_cycle(&mut self) -> Result<(), Chip8Error> {
        let address = self.pc;
        let opcode = self.fetch()?;
        self.pc = self.pc.wrapping_add(2);

        let decoded_opcode = Opcode::decode(opcode)?;
        log::trace!("{address:#05X}: {opcode:04X}  {decoded_opcode}");

        self.exec(decoded_opcode)
    }

    /// Decrements the delay and sound timers.
    pub fn timers_cycle(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer > 0
    }

    /// Set the state of a key on the keypad.
    pub fn press_key(&self, key: u4) {
        self.memory.io().press_key(key);
    }

    pub fn release_key(&self) {
        self.memory.io().release_key();
    }

    /// Shared handle to the keypad latch.
    pub fn keypad(&self) -> Keypad {
        self.memory.io().keypad().clone()
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn get_display_pixel(&self, y: usize, x: usize) -> bool {
        self.memory.io().pixel(x, y)
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn set_i(&mut self, i: u16) {
        self.i = i;
    }

    pub fn v(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn set_v(&mut self, x: u4, value: u8) {
        self.v[x] = value;
    }

    /// Occupied part of the call stack, oldest return address first.
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.sp]
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn io(&self) -> &IoMapper {
        self.memory.io()
    }

    pub fn io_mut(&mut self) -> &mut IoMapper {
        self.memory.io_mut()
    }

    /// Fetches the 16-bit opcode at the program counter.
    /// Decodes the instruction at `pc` without executing it.
    pub fn peek_opcode(&self) -> Result<Opcode, Chip8Error> {
        Opcode::decode(self.fetch()?)
    }

    fn fetch(&self) -> Result<u16, Chip8Error> {
        self.memory.read_word(self.pc)
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
