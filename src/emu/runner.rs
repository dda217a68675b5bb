use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use super::{Chip8, Chip8Error, FrameStatus, Keypad, Renderer};

/// Timing parameters for the frame loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Instructions executed per frame.
    pub cycles_per_frame: u32,
    /// Wall-clock time between frames.
    pub frame_period: Duration,
    /// Stop after this many instructions. Mostly useful for deterministic tests.
    pub cycle_budget: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cycles_per_frame: 10,
            frame_period: Duration::from_millis(15),
            cycle_budget: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// A stop was requested or the cycle budget is spent.
    Finished,
}

/// Requests the runner to stop at the next tick boundary. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fixed-rate scheduler driving a `Chip8` and presenting frames to a renderer.
pub struct Chip8Runner {
    chip8: Chip8,
    config: RunnerConfig,
    cycles: u64,
    stop: StopHandle,
}

impl Chip8Runner {
    pub fn new(chip8: Chip8, config: RunnerConfig) -> Self {
        Self {
            chip8,
            config,
            cycles: 0,
            stop: StopHandle::default(),
        }
    }

    /// Run one batch of cycles, then forward screen changes and render a frame.
    ///
    /// A failing instruction aborts the batch; the machine is left as it was
    /// when the fault occurred.
    pub fn run_frame(&mut self, renderer: &mut dyn Renderer) -> Result<RunState, Chip8Error> {
        let mut result = Ok(RunState::Running);

        for _ in 0..self.config.cycles_per_frame {
            if self.is_finished() {
                break;
            }
            if let Err(e) = self.chip8.tick() {
                log::error!(
                    "halted at {:#05X} after {} cycles: {e}",
                    self.chip8.pc,
                    self.cycles
                );
                result = Err(e);
                break;
            }
            self.cycles += 1;
        }

        self.chip8.io_mut().flush_events(renderer);
        renderer.update_status(&self.status());
        renderer.render_screen();

        match result {
            Ok(_) if self.is_finished() => Ok(RunState::Finished),
            other => other,
        }
    }

    /// Run frames on the configured period until stopped, out of budget, or
    /// an instruction fails.
    pub fn run(&mut self, renderer: &mut dyn Renderer) -> Result<(), Chip8Error> {
        log::debug!("starting run loop with {:?}", self.config);

        loop {
            let frame_start = Instant::now();
            if self.run_frame(renderer)? == RunState::Finished {
                break;
            }
            thread::sleep(self.config.frame_period.saturating_sub(frame_start.elapsed()));
        }

        log::debug!("run loop finished after {} cycles", self.cycles);
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Keypad latch shared with the machine, for input threads.
    pub fn keypad(&self) -> Keypad {
        self.chip8.keypad()
    }

    /// Number of instructions executed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn status(&self) -> FrameStatus {
        FrameStatus {
            pc: self.chip8.pc,
            next: self.chip8.peek_opcode().ok(),
            cycles: self.cycles,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }

    fn is_finished(&self) -> bool {
        self.stop.is_stopped()
            || self
                .config
                .cycle_budget
                .is_some_and(|budget| self.cycles >= budget)
    }
}
