mod audio;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use dotmatrix_core::cartridge::Cartridge;
use dotmatrix_core::gameboy::{GameBoy, FRAME_RATE};
use dotmatrix_core::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use log::{error, info};
use pixels::{Pixels, SurfaceTexture};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::Window;

const SCALE: u32 = 3;
const FRAME_TIME: Duration = Duration::from_nanos((1e9_f64 / FRAME_RATE) as u64);

#[derive(Parser)]
struct Args {
    /// Path to ROM file
    rom: std::path::PathBuf,

    /// Run without opening a window
    #[arg(long)]
    headless: bool,

    /// Number of frames to run in headless mode
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// Periodically log CPU state
    #[arg(long)]
    debug: bool,
}

/// Host key to joypad bit. Buttons use the low nibble A/B/Select/Start,
/// d-pad Right/Left/Up/Down; all active low.
fn joypad_bit(code: KeyCode) -> Option<(bool, u8)> {
    match code {
        KeyCode::KeyZ => Some((true, 0x01)),
        KeyCode::KeyX => Some((true, 0x02)),
        KeyCode::Backspace => Some((true, 0x04)),
        KeyCode::Enter => Some((true, 0x08)),
        KeyCode::ArrowRight => Some((false, 0x01)),
        KeyCode::ArrowLeft => Some((false, 0x02)),
        KeyCode::ArrowUp => Some((false, 0x04)),
        KeyCode::ArrowDown => Some((false, 0x08)),
        _ => None,
    }
}

fn draw_frame(pixels: &mut Pixels, frame: &[u32]) {
    for (dst, &src) in pixels.frame_mut().chunks_exact_mut(4).zip(frame.iter()) {
        dst[0] = ((src >> 16) & 0xFF) as u8;
        dst[1] = ((src >> 8) & 0xFF) as u8;
        dst[2] = (src & 0xFF) as u8;
        dst[3] = 0xFF;
    }
}

fn run_headless(mut gb: GameBoy, args: &Args) {
    for frame in 0..args.frames {
        gb.step_frame();
        gb.mmu.ppu.clear_frame_flag();
        if args.debug && frame % 60 == 0 {
            info!("{}", gb.cpu.debug_state());
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let cart = match Cartridge::from_file(&args.rom) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load ROM {}: {e}", args.rom.display());
            return ExitCode::FAILURE;
        }
    };

    let mut gb = GameBoy::new();
    gb.load_cart(cart);

    if args.headless {
        run_headless(gb, &args);
        return ExitCode::SUCCESS;
    }

    let event_loop = match EventLoop::new() {
        Ok(el) => el,
        Err(e) => {
            error!("failed to create event loop: {e}");
            return ExitCode::FAILURE;
        }
    };

    let attrs = Window::default_attributes()
        .with_title("dotmatrix")
        .with_inner_size(LogicalSize::new(
            (SCREEN_WIDTH as u32 * SCALE) as f64,
            (SCREEN_HEIGHT as u32 * SCALE) as f64,
        ));
    #[allow(deprecated)]
    let window = match event_loop.create_window(attrs) {
        Ok(w) => Arc::new(w),
        Err(e) => {
            error!("failed to create window: {e}");
            return ExitCode::FAILURE;
        }
    };

    let size = window.inner_size();
    let surface = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
    let mut pixels = match Pixels::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, surface) {
        Ok(p) => p,
        Err(e) => {
            error!("failed to create render surface: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Keep the stream alive for the lifetime of the event loop.
    let _stream = audio::start_stream(&mut gb.mmu.apu);

    let mut frame = vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT];
    let mut frame_count = 0u64;
    let mut buttons = 0x0Fu8;
    let mut dpad = 0x0Fu8;
    let mut next_frame = Instant::now() + FRAME_TIME;

    #[allow(deprecated)]
    let result = event_loop.run(move |event, target| {
        target.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => target.exit(),
                WindowEvent::Resized(size) => {
                    if pixels.resize_surface(size.width, size.height).is_err() {
                        target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        let pressed = event.state == ElementState::Pressed;
                        if code == KeyCode::Escape && pressed {
                            target.exit();
                            return;
                        }
                        if let Some((is_button, mask)) = joypad_bit(code) {
                            let nibble = if is_button { &mut buttons } else { &mut dpad };
                            if pressed {
                                *nibble &= !mask;
                            } else {
                                *nibble |= mask;
                            }
                            gb.set_buttons(buttons, dpad);
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    draw_frame(&mut pixels, &frame);
                    if pixels.render().is_err() {
                        target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                gb.step_frame();
                if gb.mmu.ppu.frame_ready() {
                    frame.copy_from_slice(gb.mmu.ppu.framebuffer());
                    gb.mmu.ppu.clear_frame_flag();
                    window.request_redraw();
                }

                if args.debug && frame_count % 60 == 0 {
                    info!("{}", gb.cpu.debug_state());
                }
                frame_count += 1;

                // Pace emulation to the hardware refresh rate.
                let now = Instant::now();
                if now < next_frame {
                    std::thread::sleep(next_frame - now);
                    next_frame += FRAME_TIME;
                } else {
                    next_frame = now + FRAME_TIME;
                }
            }
            _ => {}
        }
    });

    if let Err(e) = result {
        error!("event loop error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
