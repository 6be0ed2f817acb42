use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::app::{Action, App};
use crate::chart::BarChart;
use crate::config::DashboardConfig;
use crate::driver::{CrosstermDriver, TerminalDriver};
use crate::input::{CrosstermEvents, EventSource, KeyboardInputReader};
use crate::network::{DetectionResult, Sampler};
use crate::signals::{InterruptFlag, ResizeWatcher, SignalSuspender};
use crate::surface::{SurfaceHandle, TerminalSurface};
use crate::terminal_mode::TerminalModes;
use crate::window::{TerminalWindow, WindowHandle};

/// Takes over the terminal and runs until the user quits or an interrupt
/// arrives. The terminal is restored on every way out of here.
pub fn run(config: &DashboardConfig, detection: DetectionResult, interrupt: InterruptFlag) -> Result<()> {
    let mut modes = TerminalModes::enable(SignalSuspender::resize()).context("Failed to enter raw mode")?;

    let window = TerminalWindow::new(CrosstermDriver::new())
        .context("Failed to query the terminal")?
        .into_handle();
    let watcher = ResizeWatcher::install(Rc::clone(&window), SignalSuspender::resize())?;
    let input = KeyboardInputReader::new(CrosstermEvents, config.input_quantum).with_interrupt(interrupt);

    let mut dashboard = Dashboard::new(config, detection, Rc::clone(&window), input)?;
    let result = dashboard.run_loop(&watcher);

    // the prompt goes below the chart, not over it
    if let Err(e) = dashboard.finish() {
        tracing::warn!("Failed to park the cursor: {}", e);
    }
    drop(watcher);
    modes.undo();

    result
}

pub struct Dashboard<D, E> {
    app: App,
    sampler: Box<dyn Sampler>,
    interface: String,
    window: WindowHandle<D>,
    surface: SurfaceHandle<D>,
    chart: BarChart<D>,
    input: KeyboardInputReader<E>,
    tick: Duration,
}

impl<D: TerminalDriver + 'static, E: EventSource> Dashboard<D, E> {
    pub fn new(
        config: &DashboardConfig,
        detection: DetectionResult,
        window: WindowHandle<D>,
        input: KeyboardInputReader<E>,
    ) -> Result<Self> {
        let surface = TerminalSurface::create(Rc::clone(&window), config.surface_lines, config.min_surface_lines)
            .context("Failed to set up the drawing area")?;
        let chart = BarChart::new(Rc::clone(&surface));

        tracing::info!(
            interface = %config.interface,
            sampler = detection.sampler.name(),
            lines = surface.borrow().size().height,
            "dashboard started"
        );

        Ok(Self {
            app: App::new(&config.interface, detection.sample, &config.windows, config.policy),
            sampler: detection.sampler,
            interface: config.interface.clone(),
            window,
            surface,
            chart,
            input,
            tick: config.tick,
        })
    }

    fn run_loop(&mut self, watcher: &ResizeWatcher<D>) -> Result<()> {
        loop {
            let deadline = Instant::now() + self.tick;

            watcher.dispatch().context("Failed to follow the terminal size")?;
            self.sample()?;
            self.render()?;

            if !self.wait_for_input(deadline, Some(watcher))? {
                return Ok(());
            }
        }
    }

    /// Takes one sample and feeds it to the app. A sampler that worked at
    /// startup and fails now is fatal.
    pub fn sample(&mut self) -> Result<()> {
        let sample = self
            .sampler
            .get_sample(&self.interface)
            .with_context(|| format!("Failed to sample {} via {}", self.interface, self.sampler.name()))?;

        if let Err(e) = self.app.on_sample(sample) {
            // only a wall clock jump can get here
            tracing::warn!("Dropped sample: {}", e);
        }
        Ok(())
    }

    pub fn render(&self) -> Result<()> {
        let slice = self.app.current_slice(usize::from(self.chart.width()))?;
        self.chart
            .draw_bars_from_right(
                &self.app.iface_label(),
                &self.app.title(),
                &slice,
                self.app.scale(),
                self.app.stat(),
            )
            .context("Failed to draw the chart")?;
        Ok(())
    }

    /// Reads and handles keys until `deadline`. Returns `false` once the
    /// user asked to quit.
    pub fn wait_for_input(&mut self, deadline: Instant, watcher: Option<&ResizeWatcher<D>>) -> Result<bool> {
        loop {
            let budget = deadline.saturating_duration_since(Instant::now());
            if budget.is_zero() {
                return Ok(true);
            }

            let key = self.input.read_nonblocking(budget)?;
            match self.app.handle_key(key) {
                Action::Continue => {}
                Action::Quit => {
                    tracing::info!("quit requested");
                    return Ok(false);
                }
                Action::Redraw => self.render()?,
                Action::CarriageReturn => {
                    self.surface.borrow_mut().on_carriage_return()?;
                    self.render()?;
                }
                Action::Resize => {
                    if let Some(watcher) = watcher {
                        watcher.notify();
                        watcher.dispatch()?;
                    }
                    self.render()?;
                }
            }
        }
    }

    /// Leaves the cursor on a fresh line below the surface.
    pub fn finish(&mut self) -> Result<()> {
        self.surface.borrow_mut().flush()?;
        let mut win = self.window.borrow_mut();
        win.put_string("\r\n")?;
        win.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn app(&self) -> &App {
        &self.app
    }
}
