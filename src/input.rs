//! Keyboard input, read in small slices of a time budget so the dashboard
//! stays responsive between samples.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::error::TerminalError;
use crate::signals::InterruptFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Nothing,
    CarriageReturn,
    LetterR,
    LetterT,
    LetterC,
    LetterS,
    Quit,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// The terminal reported a size change through the input stream.
    Resize,
}

/// Where terminal events come from. Lets the budgeted reader run against a
/// script in tests.
pub trait EventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool, TerminalError>;
    fn read(&mut self) -> Result<Event, TerminalError>;
}

#[derive(Debug, Default)]
pub struct CrosstermEvents;

impl EventSource for CrosstermEvents {
    fn poll(&mut self, timeout: Duration) -> Result<bool, TerminalError> {
        Ok(event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event, TerminalError> {
        Ok(event::read()?)
    }
}

pub fn decode(event: &Event) -> KeyPress {
    match event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) if *kind != KeyEventKind::Release => match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => KeyPress::Quit,
            KeyCode::Enter => KeyPress::CarriageReturn,
            KeyCode::Char('r') => KeyPress::LetterR,
            KeyCode::Char('t') => KeyPress::LetterT,
            KeyCode::Char('c') => KeyPress::LetterC,
            KeyCode::Char('s') => KeyPress::LetterS,
            KeyCode::Char('q') => KeyPress::Quit,
            KeyCode::Up => KeyPress::ArrowUp,
            KeyCode::Down => KeyPress::ArrowDown,
            KeyCode::Left => KeyPress::ArrowLeft,
            KeyCode::Right => KeyPress::ArrowRight,
            _ => KeyPress::Nothing,
        },
        Event::Resize(..) => KeyPress::Resize,
        _ => KeyPress::Nothing,
    }
}

pub struct KeyboardInputReader<E> {
    events: E,
    quantum: Duration,
    interrupt: InterruptFlag,
}

impl<E: EventSource> KeyboardInputReader<E> {
    pub fn new(events: E, quantum: Duration) -> Self {
        Self {
            events,
            quantum: quantum.max(Duration::from_millis(1)),
            interrupt: InterruptFlag::default(),
        }
    }

    /// A raised interrupt ends the wait early and reads as `KeyPress::Quit`.
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Waits at most `budget` for a key press and returns the first one
    /// seen, or `KeyPress::Nothing`.
    ///
    /// The budget is split into `budget / quantum` polls of one quantum
    /// each, plus one poll for the remainder which goes first.
    pub fn read_nonblocking(&mut self, budget: Duration) -> Result<KeyPress, TerminalError> {
        let num_loops = (budget.as_nanos() / self.quantum.as_nanos()) as u32;
        let remainder = budget.saturating_sub(self.quantum * num_loops);

        for i in 0..=num_loops {
            if self.interrupt.is_raised() {
                return Ok(KeyPress::Quit);
            }
            let timeout = if i == 0 { remainder } else { self.quantum };
            let key = self.read_keypress(timeout)?;
            if key != KeyPress::Nothing {
                return Ok(key);
            }
        }

        Ok(KeyPress::Nothing)
    }

    fn read_keypress(&mut self, timeout: Duration) -> Result<KeyPress, TerminalError> {
        if !self.events.poll(timeout)? {
            return Ok(KeyPress::Nothing);
        }

        let event = self.events.read()?;
        let key = decode(&event);
        tracing::trace!(?event, ?key, "input event");
        Ok(key)
    }
}
