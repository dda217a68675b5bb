use std::{
    io,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, anyhow};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    DefaultTerminal,
    layout::{Alignment, Constraint, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use chip8_vm::{
    Chip8, Chip8Runner, DISPLAY_X, DISPLAY_Y, FrameStatus, Keypad, Renderer, RunnerConfig,
    StopHandle, u4,
};

const KEY_MAP: [KeyCode; 16] = [
    KeyCode::Char('x'), // 0x0
    KeyCode::Char('1'), // 0x1
    KeyCode::Char('2'), // 0x2
    KeyCode::Char('3'), // 0x3
    KeyCode::Char('q'), // 0x4
    KeyCode::Char('w'), // 0x5
    KeyCode::Char('e'), // 0x6
    KeyCode::Char('a'), // 0x7
    KeyCode::Char('s'), // 0x8
    KeyCode::Char('d'), // 0x9
    KeyCode::Char('z'), // 0xA
    KeyCode::Char('c'), // 0xB
    KeyCode::Char('4'), // 0xC
    KeyCode::Char('r'), // 0xD
    KeyCode::Char('f'), // 0xE
    KeyCode::Char('v'), // 0xF
];

// Key release events are not fired in terminals on Linux.
// To handle this, we implement a timeout after which we consider a key released.
const KEY_RELEASE_TIMEOUT: Duration = Duration::from_millis(100);

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Paints the framebuffer into the terminal, two cells per pixel, with a
/// status line below it.
struct TerminalRenderer {
    terminal: DefaultTerminal,
    pixels: [[bool; DISPLAY_X]; DISPLAY_Y],
    status: Option<FrameStatus>,
    stop: StopHandle,
    error: Option<io::Error>,
}

impl TerminalRenderer {
    fn new(terminal: DefaultTerminal, stop: StopHandle) -> Self {
        Self {
            terminal,
            pixels: [[false; DISPLAY_X]; DISPLAY_Y],
            status: None,
            stop,
            error: None,
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render_screen(&mut self) {
        let pixels = &self.pixels;
        let status = status_line(self.status.as_ref());
        let result = self.terminal.draw(|frame| {
            let area = frame.area().centered(
                Constraint::Length(DISPLAY_X as u16 * 2 + 2),
                Constraint::Length(DISPLAY_Y as u16 + 3),
            );
            let [screen_area, status_area] = Layout::vertical([
                Constraint::Length(DISPLAY_Y as u16 + 2),
                Constraint::Length(1),
            ])
            .areas(area);

            let text: Vec<Line> = pixels
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|&on| {
                            Span::styled(
                                if on { "██" } else { "  " },
                                Style::default().fg(Color::Green),
                            )
                        })
                        .collect()
                })
                .collect();

            frame.render_widget(
                Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .block(Block::bordered().title(" CHIP-8 ")),
                screen_area,
            );
            frame.render_widget(Paragraph::new(status), status_area);
        });

        if let Err(e) = result {
            self.error.get_or_insert(e);
            self.stop.stop();
        }
    }

    fn clear_screen(&mut self) {
        self.pixels = [[false; DISPLAY_X]; DISPLAY_Y];
    }

    fn update_pixel(&mut self, x: usize, y: usize, on: bool) {
        self.pixels[y][x] = on;
    }

    fn update_status(&mut self, status: &FrameStatus) {
        self.status = Some(*status);
    }
}

fn status_line(status: Option<&FrameStatus>) -> Line<'static> {
    let Some(status) = status else {
        return Line::default();
    };
    let next = match status.next {
        Some(opcode) => opcode.to_string(),
        None => "???".to_string(),
    };

    Line::from(vec![
        Span::styled(
            format!(" {:#05X} ", status.pc),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(format!("{next:<16}")),
        Span::styled(
            format!("{} cycles", status.cycles),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

/// Forwards terminal key events to the keypad latch until `stop` is set.
/// Stops the runner on every exit, including terminal errors.
fn run_input(keypad: Keypad, stop: StopHandle) -> io::Result<()> {
    stop_after(&stop, || poll_keys(&keypad, &stop))
}

fn stop_after<T>(stop: &StopHandle, f: impl FnOnce() -> T) -> T {
    let result = f();
    stop.stop();
    result
}

/// A key stays pressed until `KEY_RELEASE_TIMEOUT` passes without it being
/// repeated, or another key is pressed.
fn poll_keys(keypad: &Keypad, stop: &StopHandle) -> io::Result<()> {
    let mut pressed_at: Option<Instant> = None;

    while !stop.is_stopped() {
        if let Some(time) = pressed_at
            && time.elapsed() > KEY_RELEASE_TIMEOUT
        {
            pressed_at = None;
            keypad.release();
        }

        if !event::poll(INPUT_POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        let quit = key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
        if quit {
            break;
        }

        match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                if let Some(idx) = KEY_MAP.iter().position(|&k| k == key.code) {
                    keypad.press(u4::new(idx as u8));
                    pressed_at = Some(Instant::now());
                }
            }
            KeyEventKind::Release => {
                if KEY_MAP.contains(&key.code) {
                    pressed_at = None;
                    keypad.release();
                }
            }
        }
    }

    Ok(())
}

/// CHIP-8 emulator for the terminal.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
/// Escape is used to exit the emulator.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    /// Instructions executed between two rendered frames
    #[arg(long, default_value_t = 10)]
    cycles_per_frame: u32,

    /// Milliseconds between frames
    #[arg(long, default_value_t = 15)]
    frame_ms: u64,

    /// Stop after executing this many instructions
    #[arg(long)]
    max_cycles: Option<u64>,
}

impl Args {
    fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            cycles_per_frame: self.cycles_per_frame,
            frame_period: Duration::from_millis(self.frame_ms),
            cycle_budget: self.max_cycles,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Logging is off unless RUST_LOG asks for it, so it doesn't tear the screen.
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Off)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let rom = std::fs::read(&args.rom_path).context("Failed to read ROM file")?;

    let mut chip8 = Chip8::new();
    chip8
        .load(&rom)
        .context("Failed to load ROM into CHIP-8 memory")?;
    let mut runner = Chip8Runner::new(chip8, args.runner_config());

    let stop = runner.stop_handle();
    let input = {
        let (keypad, stop) = (runner.keypad(), stop.clone());
        thread::spawn(move || run_input(keypad, stop))
    };

    let mut renderer = TerminalRenderer::new(ratatui::init(), stop.clone());
    let run_result = runner.run(&mut renderer);
    stop.stop();
    ratatui::restore();

    let input_result = input
        .join()
        .map_err(|_| anyhow!("Input thread panicked"))?;

    run_result.context("Chip8 Execution error")?;
    if let Some(e) = renderer.error {
        return Err(e).context("Failed to draw to terminal");
    }
    input_result.context("Failed to read terminal input")?;

    Ok(())
}
