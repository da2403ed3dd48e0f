mod common;

use common::boot_with;
use dotmatrix_core::gameboy::CYCLES_PER_FRAME;

#[test]
fn frame_budget_runs_to_the_cycle_count() {
    // NOP; JP 0x0100
    let mut gb = boot_with(&[0x00, 0xC3, 0x00, 0x01]);
    gb.step_frame();
    let cycles = gb.cpu.cycles;
    assert!(cycles >= CYCLES_PER_FRAME as u64);
    // The budget overshoots by at most one instruction.
    assert!(cycles < CYCLES_PER_FRAME as u64 + 24);
}

#[test]
fn frame_ready_after_one_frame() {
    let mut gb = boot_with(&[0x00, 0xC3, 0x00, 0x01]);
    gb.step_frame();
    assert!(gb.mmu.ppu.frame_ready());
    gb.mmu.ppu.clear_frame_flag();

    gb.step_frame();
    assert!(gb.mmu.ppu.frame_ready(), "one frame per budget");
}

#[test]
fn vblank_interrupt_dispatches_through_the_harness() {
    // Entry spins; the VBlank vector (0x40) increments A then spins.
    let mut gb = boot_with(&[0xC3, 0x00, 0x01]);
    {
        let cart = gb.mmu.cart.as_mut().unwrap();
        cart.rom[0x40] = 0x3C; // INC A
        cart.rom[0x41] = 0xC3; // JP 0x0040
        cart.rom[0x42] = 0x40;
        cart.rom[0x43] = 0x00;
    }
    gb.cpu.ime = true;
    gb.mmu.ie_reg = 0x01;
    gb.mmu.if_reg &= !0x1F;
    let a_before = gb.cpu.a;

    gb.step_frame();
    assert_eq!(gb.cpu.a, a_before + 1, "VBlank handler ran once");
    assert!(!gb.cpu.ime, "dispatch cleared IME");
}

#[test]
fn joypad_press_raises_interrupt_flag() {
    let mut gb = boot_with(&[0x00]);
    gb.mmu.if_reg &= !0x10;
    gb.set_buttons(0x0F, 0x0F);
    assert_eq!(gb.mmu.if_reg & 0x10, 0, "no change without a press");

    gb.set_buttons(0x0E, 0x0F); // A pressed
    assert_ne!(gb.mmu.if_reg & 0x10, 0);

    // Holding the key does not re-trigger.
    gb.mmu.if_reg &= !0x10;
    gb.set_buttons(0x0E, 0x0F);
    assert_eq!(gb.mmu.if_reg & 0x10, 0);
}

#[test]
fn timer_interrupt_fires_during_a_frame() {
    // Spin loop with the timer at the fastest rate.
    let mut gb = boot_with(&[0xC3, 0x00, 0x01]);
    gb.mmu.write_byte(0xFF07, 0x05);
    gb.mmu.if_reg &= !0x04;

    gb.step_frame();
    assert_ne!(gb.mmu.if_reg & 0x04, 0);
}

#[test]
fn reset_preserves_the_cartridge() {
    let mut gb = boot_with(&[0x3C]); // INC A
    gb.cpu.step(&mut gb.mmu);
    assert_eq!(gb.cpu.a, 0x02);

    gb.reset();
    assert_eq!(gb.cpu.a, 0x01);
    assert_eq!(gb.cpu.pc, 0x0100);
    // The same program is still mapped.
    assert_eq!(gb.mmu.read_byte(0x0100), 0x3C);
}
