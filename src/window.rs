//! The whole terminal screen: its size, the last cursor position we put
//! there, and the one receiver interested in size changes.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::driver::TerminalDriver;
use crate::error::TerminalError;
use crate::geometry::{Dimensions, Point};

/// Shared handle to the window. The orchestrator owns one, surfaces and the
/// resize watcher hold clones.
pub type WindowHandle<D> = Rc<RefCell<TerminalWindow<D>>>;

/// Something laid out relative to the window that has to follow its size.
pub trait WindowResizeReceiver {
    fn on_window_resize(&mut self, old: Dimensions, new: Dimensions) -> Result<(), TerminalError>;
}

pub struct TerminalWindow<D> {
    driver: D,
    dim: Dimensions,
    cursor: Point,
    resize_receiver: Option<Weak<RefCell<dyn WindowResizeReceiver>>>,
}

impl<D: TerminalDriver> TerminalWindow<D> {
    pub fn new(mut driver: D) -> Result<Self, TerminalError> {
        let dim = driver.get_terminal_size()?;
        let cursor = driver.get_cursor_position()?;
        tracing::info!(%dim, %cursor, "terminal window attached");

        Ok(Self {
            driver,
            dim,
            cursor,
            resize_receiver: None,
        })
    }

    pub fn into_handle(self) -> WindowHandle<D> {
        Rc::new(RefCell::new(self))
    }

    /// Re-reads the terminal size and tells the registered receiver about the
    /// change.
    ///
    /// Order: the new size is stored first and the receiver is notified
    /// after, not the other way round. The receiver redraws through this
    /// window and cursor moves are validated against the stored size, so
    /// notifying first would reject the redraw on a shrink. The receiver
    /// still gets both old and new. Callers must hold the resize signal
    /// suspended.
    pub fn on_resize(handle: &WindowHandle<D>) -> Result<(), TerminalError> {
        let (old, new, receiver) = {
            let mut win = handle.borrow_mut();
            let new = win.driver.get_terminal_size()?;
            let old = std::mem::replace(&mut win.dim, new);
            win.cursor = Point::new(win.cursor.x.min(new.width), win.cursor.y.min(new.height));
            let receiver = win.resize_receiver.as_ref().and_then(Weak::upgrade);
            (old, new, receiver)
        };

        tracing::debug!(%old, %new, "terminal window resized");

        if let Some(receiver) = receiver {
            receiver.borrow_mut().on_window_resize(old, new)?;
        }

        Ok(())
    }

    /// At most one live receiver may be registered at a time.
    pub fn register_resize_receiver(
        &mut self,
        receiver: Weak<RefCell<dyn WindowResizeReceiver>>,
    ) -> Result<(), TerminalError> {
        let occupied = self
            .resize_receiver
            .as_ref()
            .is_some_and(|existing| existing.strong_count() > 0);
        if occupied {
            return Err(TerminalError::ReceiverAlreadyRegistered);
        }

        self.resize_receiver = Some(receiver);
        Ok(())
    }

    pub fn size(&self) -> Dimensions {
        self.dim
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn set_cursor(&mut self, point: Point) -> Result<(), TerminalError> {
        if !self.dim.contains(point) {
            return Err(TerminalError::CursorOutsideWindow {
                point,
                dim: self.dim,
            });
        }

        self.driver.set_cursor_position(point)?;
        self.cursor = point;
        Ok(())
    }

    pub fn put_char(&mut self, ch: char) -> Result<(), TerminalError> {
        self.driver.put_char(ch)
    }

    pub fn put_uchar(&mut self, glyph: &str) -> Result<(), TerminalError> {
        self.driver.put_uchar(glyph)
    }

    pub fn put_string(&mut self, text: &str) -> Result<(), TerminalError> {
        self.driver.put_uchar(text)
    }

    pub fn set_reverse_video(&mut self, on: bool) -> Result<(), TerminalError> {
        self.driver.set_reverse_video(on)
    }

    pub fn flush(&mut self) -> Result<(), TerminalError> {
        self.driver.flush()
    }

    /// Overwrites every cell of the screen and parks the cursor top left.
    pub fn clear_screen(&mut self, fill: char) -> Result<(), TerminalError> {
        let line: String = std::iter::repeat(fill).take(self.dim.width as usize).collect();

        for y in 1..=self.dim.height {
            self.set_cursor(Point::new(1, y))?;
            self.driver.put_uchar(&line)?;
        }

        self.set_cursor(Point::new(1, 1))?;
        self.flush()
    }

    #[cfg(test)]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[cfg(test)]
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
