use crate::{cartridge::Cartridge, cpu::Cpu, mmu::Mmu};

/// 4.194304 MHz / 59.7275 Hz: one LCD frame worth of CPU cycles.
pub const CYCLES_PER_FRAME: u32 = 70_224;

/// LCD refresh rate of the original hardware.
pub const FRAME_RATE: f64 = 59.7275;

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
}

impl GameBoy {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(),
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.mmu.load_cart(cart);
    }

    /// Reset to the post-boot power-on state, preserving the loaded
    /// cartridge.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        self.cpu = Cpu::new();
        self.mmu = Mmu::new();
        if let Some(c) = cart {
            self.mmu.load_cart(c);
        }
    }

    /// Execute one CPU instruction and advance every other unit by the
    /// cycles it consumed. Returns that cycle count.
    pub fn step(&mut self) -> u32 {
        let cycles = self.cpu.step(&mut self.mmu);
        self.mmu.ppu.step(cycles, &mut self.mmu.if_reg);
        self.mmu.apu.step(cycles);
        self.mmu.tick_timer(cycles);
        self.mmu.tick_dma(cycles);
        cycles
    }

    /// Run one frame's worth of emulation (70,224 cycles). The PPU's
    /// frame-ready flag tells the caller when the framebuffer is complete.
    pub fn step_frame(&mut self) {
        let mut cycles_this_frame = 0;
        while cycles_this_frame < CYCLES_PER_FRAME {
            cycles_this_frame += self.step();
        }
    }

    /// Push the host's joypad state: two active-low nibbles, buttons
    /// (A, B, Select, Start) and d-pad (Right, Left, Up, Down).
    pub fn set_buttons(&mut self, buttons: u8, dpad: u8) {
        self.mmu.input.set_state(buttons, dpad, &mut self.mmu.if_reg);
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
