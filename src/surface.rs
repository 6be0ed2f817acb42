//! A full-width band of lines inside the terminal window that the dashboard
//! owns. Everything above it (shell prompt, scrollback) is left untouched.

use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::BACKGROUND_CHAR;
use crate::driver::TerminalDriver;
use crate::error::TerminalError;
use crate::geometry::{Dimensions, Point};
use crate::window::{WindowHandle, WindowResizeReceiver};

pub type SurfaceHandle<D> = Rc<RefCell<TerminalSurface<D>>>;

pub struct TerminalSurface<D> {
    window: WindowHandle<D>,
    min_lines: u16,
    num_lines: u16,
    bg_char: char,

    dim: Dimensions,
    upper_left: Point,
    lower_left: Point,
}

impl<D: TerminalDriver + 'static> TerminalSurface<D> {
    /// Claims `num_lines` lines starting at the current cursor row, scrolling
    /// the terminal if they do not fit below it, and registers the surface
    /// as the window's resize receiver.
    pub fn create(window: WindowHandle<D>, num_lines: u16, min_lines: u16) -> Result<SurfaceHandle<D>, TerminalError> {
        let mut surface = Self {
            window: Rc::clone(&window),
            min_lines,
            num_lines: num_lines.max(min_lines),
            bg_char: BACKGROUND_CHAR,
            dim: Dimensions::default(),
            upper_left: Point::new(1, 1),
            lower_left: Point::new(1, 1),
        };
        surface.on_startup()?;

        let handle = Rc::new(RefCell::new(surface));
        let receiver: Rc<RefCell<dyn WindowResizeReceiver>> = handle.clone();
        window
            .borrow_mut()
            .register_resize_receiver(Rc::downgrade(&receiver))?;

        Ok(handle)
    }

    fn on_startup(&mut self) -> Result<(), TerminalError> {
        let (win_dim, win_cur) = {
            let win = self.window.borrow();
            (win.size(), win.cursor())
        };

        self.check_surface_fits(win_dim)?;
        self.num_lines = self.num_lines.min(win_dim.height);

        // If the bottom of the surface would extend past the bottom of the
        // terminal, scroll the terminal by that many lines first.
        let overshoot = i32::from(win_cur.y) + i32::from(self.num_lines) - i32::from(win_dim.height);
        let upper_left_y = if overshoot > 0 {
            self.force_scroll(win_dim, overshoot as u16)?;
            i32::from(win_cur.y) - overshoot + 1
        } else {
            i32::from(win_cur.y)
        };

        self.upper_left = Point::new(1, upper_left_y.max(1) as u16);
        self.recompute_geometry(win_dim);

        tracing::debug!(
            overshoot,
            upper_left = %self.upper_left,
            lower_left = %self.lower_left,
            "surface positioned"
        );

        self.clear_surface()
    }

    /// Takes an Enter key press as a cue to grow the surface by one line.
    /// When the surface already sits on the bottom row the terminal is
    /// scrolled to make room; does nothing once the whole window is used.
    pub fn on_carriage_return(&mut self) -> Result<(), TerminalError> {
        let win_dim = self.window.borrow().size();
        if self.num_lines >= win_dim.height {
            return Ok(());
        }

        if self.lower_left.y >= win_dim.height {
            let mut win = self.window.borrow_mut();
            win.set_cursor(self.lower_left)?;
            win.put_char('\n')?;
            win.flush()?;
            self.upper_left.y -= 1;
        }

        self.num_lines += 1;
        self.recompute_geometry(win_dim);

        tracing::debug!(num_lines = self.num_lines, "surface grown by one line");
        Ok(())
    }

    /// Blanks the whole surface. Leaves the cursor on the lower left corner.
    pub fn clear_surface(&mut self) -> Result<(), TerminalError> {
        let line: String = std::iter::repeat(self.bg_char)
            .take(self.dim.width as usize)
            .collect();

        let mut win = self.window.borrow_mut();
        for y in self.upper_left.y..=self.lower_left.y {
            win.set_cursor(Point::new(self.upper_left.x, y))?;
            win.put_string(&line)?;
        }

        win.set_cursor(self.lower_left)?;
        win.flush()
    }

    pub fn put_char(&mut self, point: Point, ch: char) -> Result<(), TerminalError> {
        let point_win = self.translate_point(point)?;
        let mut win = self.window.borrow_mut();
        win.set_cursor(point_win)?;
        win.put_char(ch)
    }

    pub fn put_uchar(&mut self, point: Point, glyph: &str) -> Result<(), TerminalError> {
        let point_win = self.translate_point(point)?;
        let mut win = self.window.borrow_mut();
        win.set_cursor(point_win)?;
        win.put_uchar(glyph)
    }

    /// Writes `text` starting at `point`, cut off at the right edge.
    pub fn put_string(&mut self, point: Point, text: &str) -> Result<(), TerminalError> {
        let point_win = self.translate_point(point)?;
        let room = usize::from(self.dim.width - point.x + 1);
        let clipped: String = text.chars().take(room).collect();

        let mut win = self.window.borrow_mut();
        win.set_cursor(point_win)?;
        win.put_string(&clipped)
    }

    pub fn set_reverse_video(&mut self, on: bool) -> Result<(), TerminalError> {
        self.window.borrow_mut().set_reverse_video(on)
    }

    pub fn flush(&mut self) -> Result<(), TerminalError> {
        let mut win = self.window.borrow_mut();
        win.set_cursor(self.lower_left)?;
        win.flush()
    }

    /// Maps a surface point (origin at the surface's own upper left) to
    /// window coordinates.
    pub fn translate_point(&self, point: Point) -> Result<Point, TerminalError> {
        if !self.dim.contains(point) {
            return Err(TerminalError::PointOutsideSurface { point, dim: self.dim });
        }

        Ok(Point::new(
            self.upper_left.x + point.x - 1,
            self.upper_left.y + point.y - 1,
        ))
    }

    pub fn size(&self) -> Dimensions {
        self.dim
    }

    pub fn upper_left(&self) -> Point {
        self.upper_left
    }

    pub fn lower_left(&self) -> Point {
        self.lower_left
    }

    fn check_surface_fits(&self, win_dim: Dimensions) -> Result<(), TerminalError> {
        if win_dim.height < self.min_lines {
            // leave a clean screen so the error message is readable
            self.window.borrow_mut().clear_screen(' ')?;
            return Err(TerminalError::WindowTooSmall {
                height: win_dim.height,
                min_lines: self.min_lines,
            });
        }
        Ok(())
    }

    fn force_scroll(&mut self, win_dim: Dimensions, lines: u16) -> Result<(), TerminalError> {
        let mut win = self.window.borrow_mut();
        win.set_cursor(Point::new(1, win_dim.height))?;
        for _ in 0..lines {
            win.put_char('\n')?;
        }
        win.flush()
    }

    fn recompute_geometry(&mut self, win_dim: Dimensions) {
        self.dim = Dimensions::new(win_dim.width, self.num_lines);
        self.lower_left = Point::new(self.upper_left.x, self.upper_left.y + self.num_lines - 1);
    }
}

impl<D: TerminalDriver + 'static> WindowResizeReceiver for TerminalSurface<D> {
    fn on_window_resize(&mut self, old: Dimensions, new: Dimensions) -> Result<(), TerminalError> {
        self.check_surface_fits(new)?;

        let delta = i32::from(new.height) - i32::from(old.height);
        if delta > 0 {
            // claim the new space below
            self.num_lines = self.num_lines.saturating_add(delta as u16);
        } else if delta < 0 {
            // the terminal pushed everything up; follow it, but not past the top
            let upper_left_y = (i32::from(self.upper_left.y) + delta).max(1);
            self.upper_left.y = upper_left_y as u16;
        }

        let room = new.height - self.upper_left.y + 1;
        self.num_lines = self.num_lines.min(room);
        self.recompute_geometry(new);

        tracing::debug!(
            %old,
            %new,
            upper_left = %self.upper_left,
            num_lines = self.num_lines,
            "surface followed window resize"
        );

        self.clear_surface()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testing::GridDriver;
    use crate::window::TerminalWindow;

    fn window(width: u16, height: u16, cursor_y: u16) -> WindowHandle<GridDriver> {
        let driver = GridDriver::new(Dimensions::new(width, height), Point::new(1, cursor_y));
        TerminalWindow::new(driver).unwrap().into_handle()
    }

    fn assert_invariants(surface: &TerminalSurface<GridDriver>, win_height: u16) {
        let upper = surface.upper_left();
        let lower = surface.lower_left();
        assert_eq!(upper.x, 1);
        assert!(upper.y >= 1);
        assert_eq!(lower.y, upper.y + surface.size().height - 1);
        assert!(lower.y <= win_height);
    }

    #[test]
    fn startup_with_overshoot_scrolls_and_bottom_aligns() {
        let win = window(30, 20, 15);
        let surface = TerminalSurface::create(Rc::clone(&win), 12, 6).unwrap();
        let surface = surface.borrow();

        assert_eq!(win.borrow().driver().scrolled_lines, 7);
        assert_eq!(surface.upper_left(), Point::new(1, 9));
        assert_eq!(surface.lower_left(), Point::new(1, 20));
        assert_eq!(surface.size(), Dimensions::new(30, 12));
        assert_invariants(&surface, 20);
    }

    #[test]
    fn startup_without_overshoot_starts_at_the_cursor() {
        let win = window(30, 20, 3);
        let surface = TerminalSurface::create(Rc::clone(&win), 6, 6).unwrap();
        let surface = surface.borrow();

        assert_eq!(win.borrow().driver().scrolled_lines, 0);
        assert_eq!(surface.upper_left(), Point::new(1, 3));
        assert_eq!(surface.lower_left(), Point::new(1, 8));

        // cleared to background, cursor parked at the lower left
        let win = win.borrow();
        assert_eq!(win.driver().row(3), " ".repeat(30));
        assert_eq!(win.driver().row(2), ".".repeat(30));
        assert_eq!(win.cursor(), Point::new(1, 8));
    }

    #[test]
    fn surface_taller_than_window_is_cut_to_fit() {
        let win = window(30, 8, 5);
        let surface = TerminalSurface::create(win, 12, 6).unwrap();
        let surface = surface.borrow();

        assert_eq!(surface.upper_left(), Point::new(1, 1));
        assert_eq!(surface.size().height, 8);
        assert_invariants(&surface, 8);
    }

    #[test]
    fn window_shorter_than_minimum_fails() {
        let win = window(30, 5, 1);
        let err = TerminalSurface::create(win, 12, 6).err().unwrap();
        assert!(matches!(
            err,
            TerminalError::WindowTooSmall {
                height: 5,
                min_lines: 6
            }
        ));
    }

    #[test]
    fn shrink_moves_the_surface_up() {
        let win = window(30, 20, 15);
        let surface = TerminalSurface::create(Rc::clone(&win), 12, 6).unwrap();

        win.borrow_mut().driver_mut().resize(Dimensions::new(30, 15));
        TerminalWindow::on_resize(&win).unwrap();

        let surface = surface.borrow();
        assert_eq!(surface.upper_left(), Point::new(1, 4));
        assert_eq!(surface.size().height, 12);
        assert_invariants(&surface, 15);
    }

    #[test]
    fn large_shrink_pins_to_the_top_and_shrinks_to_fit() {
        let win = window(30, 20, 15);
        let surface = TerminalSurface::create(Rc::clone(&win), 12, 6).unwrap();

        win.borrow_mut().driver_mut().resize(Dimensions::new(30, 7));
        TerminalWindow::on_resize(&win).unwrap();

        let surface = surface.borrow();
        assert_eq!(surface.upper_left(), Point::new(1, 1));
        assert_eq!(surface.size().height, 7);
        assert_invariants(&surface, 7);
    }

    #[test]
    fn shrink_below_minimum_fails() {
        let win = window(30, 20, 15);
        let _surface = TerminalSurface::create(Rc::clone(&win), 12, 6).unwrap();

        win.borrow_mut().driver_mut().resize(Dimensions::new(30, 4));
        assert!(matches!(
            TerminalWindow::on_resize(&win),
            Err(TerminalError::WindowTooSmall { .. })
        ));
    }

    #[test]
    fn growth_is_claimed_by_the_surface() {
        let win = window(30, 20, 15);
        let surface = TerminalSurface::create(Rc::clone(&win), 12, 6).unwrap();

        win.borrow_mut().driver_mut().resize(Dimensions::new(40, 25));
        TerminalWindow::on_resize(&win).unwrap();

        let surface = surface.borrow();
        assert_eq!(surface.size(), Dimensions::new(40, 17));
        assert_eq!(surface.upper_left(), Point::new(1, 9));
        assert_invariants(&surface, 25);
    }

    #[test]
    fn carriage_return_at_the_bottom_scrolls_and_grows() {
        let win = window(30, 20, 15);
        let surface = TerminalSurface::create(Rc::clone(&win), 12, 6).unwrap();
        surface.borrow_mut().on_carriage_return().unwrap();

        let surface = surface.borrow();
        assert_eq!(win.borrow().driver().scrolled_lines, 8);
        assert_eq!(surface.upper_left(), Point::new(1, 8));
        assert_eq!(surface.size().height, 13);
        assert_invariants(&surface, 20);
    }

    #[test]
    fn carriage_return_above_the_bottom_grows_downwards() {
        let win = window(30, 20, 2);
        let surface = TerminalSurface::create(Rc::clone(&win), 6, 6).unwrap();
        surface.borrow_mut().on_carriage_return().unwrap();

        let surface = surface.borrow();
        assert_eq!(win.borrow().driver().scrolled_lines, 0);
        assert_eq!(surface.upper_left(), Point::new(1, 2));
        assert_eq!(surface.size().height, 7);
    }

    #[test]
    fn carriage_return_is_a_noop_at_full_height() {
        let win = window(30, 8, 1);
        let surface = TerminalSurface::create(Rc::clone(&win), 8, 6).unwrap();
        surface.borrow_mut().on_carriage_return().unwrap();

        assert_eq!(surface.borrow().size().height, 8);
        assert_eq!(surface.borrow().upper_left(), Point::new(1, 1));
    }

    #[test]
    fn writes_are_translated_to_window_coordinates() {
        let win = window(30, 20, 15);
        let surface = TerminalSurface::create(Rc::clone(&win), 12, 6).unwrap();

        surface.borrow_mut().put_char(Point::new(1, 1), 'a').unwrap();
        surface.borrow_mut().put_uchar(Point::new(30, 12), "█").unwrap();
        surface
            .borrow_mut()
            .put_string(Point::new(28, 2), "hello")
            .unwrap();

        let win = win.borrow();
        assert_eq!(win.driver().cell(Point::new(1, 9)), 'a');
        assert_eq!(win.driver().cell(Point::new(30, 20)), '█');
        assert_eq!(&win.driver().row(10)[27..], "hel");
    }

    #[test]
    fn points_outside_the_surface_are_rejected() {
        let win = window(30, 20, 15);
        let surface = TerminalSurface::create(win, 12, 6).unwrap();
        let mut surface = surface.borrow_mut();

        assert!(matches!(
            surface.put_char(Point::new(31, 1), 'x'),
            Err(TerminalError::PointOutsideSurface { .. })
        ));
        assert!(surface.put_char(Point::new(1, 13), 'x').is_err());
        assert!(surface.put_char(Point::new(0, 1), 'x').is_err());
        assert_eq!(surface.translate_point(Point::new(5, 12)).unwrap(), Point::new(5, 20));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any window at least `min_lines` tall fits; any shorter one fails
            #[test]
            fn surface_fit(
                height in 1u16..40,
                cursor_y in 1u16..40,
                lines in 1u16..30,
                new_height in 1u16..40,
            ) {
                let cursor_y = cursor_y.min(height);
                let win = window(20, height, cursor_y);
                let created = TerminalSurface::create(Rc::clone(&win), lines, 6);

                if height < 6 {
                    prop_assert!(created.is_err());
                    return Ok(());
                }
                let surface = created.unwrap();
                assert_invariants(&surface.borrow(), height);

                win.borrow_mut().driver_mut().resize(Dimensions::new(20, new_height));
                let resized = TerminalWindow::on_resize(&win);
                if new_height < 6 {
                    prop_assert!(resized.is_err());
                } else {
                    prop_assert!(resized.is_ok());
                    assert_invariants(&surface.borrow(), new_height);
                }
            }
        }
    }
}
