use super::{
    Chip8Error, FONT, FONT_END_ADDRESS, FONT_START_ADDRESS, FRAMEBUFFER_END_ADDRESS,
    FRAMEBUFFER_START_ADDRESS, IoMapper, KEY_PRESSED_ADDRESS, KEY_VALUE_ADDRESS, MEMORY_SIZE,
    ROM_START_ADDRESS,
};

/// Where a bus address is backed.
enum Region {
    Ram(usize),
    Screen(usize),
    KeyPressed,
    KeyValue,
}

fn region(address: u16) -> Result<Region, Chip8Error> {
    let addr = address as usize;
    Ok(match addr {
        FRAMEBUFFER_START_ADDRESS..FRAMEBUFFER_END_ADDRESS => {
            Region::Screen(addr - FRAMEBUFFER_START_ADDRESS)
        }
        KEY_PRESSED_ADDRESS => Region::KeyPressed,
        KEY_VALUE_ADDRESS => Region::KeyValue,
        _ if addr < MEMORY_SIZE => Region::Ram(addr),
        _ => return Err(Chip8Error::MemoryOutOfBounds { address }),
    })
}

/// 4KB address space.
///
/// Plain RAM everywhere except the framebuffer and keypad bytes, which are
/// forwarded to the `IoMapper` so program loads and stores still see them.
pub struct Memory {
    ram: [u8; MEMORY_SIZE],
    io: IoMapper,
}

impl Memory {
    pub fn new(io: IoMapper) -> Self {
        Self {
            ram: [0; MEMORY_SIZE],
            io,
        }
    }

    pub fn read(&self, address: u16) -> Result<u8, Chip8Error> {
        Ok(match region(address)? {
            Region::Ram(addr) => self.ram[addr],
            Region::Screen(offset) => self.io.read_screen_byte(offset),
            Region::KeyPressed => self.io.keypad().flag_byte(),
            Region::KeyValue => self.io.keypad().value_byte(),
        })
    }

    pub fn write(&mut self, address: u16, byte: u8) -> Result<(), Chip8Error> {
        match region(address)? {
            Region::Ram(addr) => self.ram[addr] = byte,
            Region::Screen(offset) => self.io.write_screen_byte(offset, byte),
            Region::KeyPressed => self.io.keypad().write_flag_byte(byte),
            Region::KeyValue => self.io.keypad().write_value_byte(byte),
        }
        Ok(())
    }

    /// Big-endian 16-bit word at `address`.
    pub fn read_word(&self, address: u16) -> Result<u16, Chip8Error> {
        let high = self.read(address)?;
        let low = self.read(address.wrapping_add(1))?;

        Ok(u16::from_be_bytes([high, low]))
    }

    pub fn load_font(&mut self) {
        self.ram[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);
    }

    /// Copies a ROM image into program memory at 0x200.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let rom_end = ROM_START_ADDRESS + rom.len();
        self.ram
            .get_mut(ROM_START_ADDRESS..rom_end)
            .ok_or(Chip8Error::RomLoadError {
                size: rom.len(),
                max_size: MEMORY_SIZE - ROM_START_ADDRESS,
            })?
            .copy_from_slice(rom);

        log::debug!("loaded {} byte ROM at {:#05X}", rom.len(), ROM_START_ADDRESS);
        Ok(())
    }

    /// Blit `height` rows read from `address` at (`x`, `y`). Returns the
    /// collision flag.
    pub fn draw_sprite(
        &mut self,
        x: u8,
        y: u8,
        address: u16,
        height: u8,
    ) -> Result<bool, Chip8Error> {
        let mut rows = [0u8; 16];
        for (row, slot) in rows.iter_mut().enumerate().take(height as usize) {
            *slot = self.read(address.wrapping_add(row as u16))?;
        }

        Ok(self.io.draw_sprite(x, y, &rows[..height as usize]))
    }

    pub fn io(&self) -> &IoMapper {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IoMapper {
        &mut self.io
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(IoMapper::default())
    }
}
