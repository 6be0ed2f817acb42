//! Bar chart drawn into a `TerminalSurface`.
//!
//! Layout, top to bottom: title, bars, x-axis labels, menu. The leftmost
//! `scale_width` columns hold the y-axis tick labels; bars fill the rest
//! from the right edge, newest bucket rightmost.

use crate::aggregation::Statistic;
use crate::constants::{CHART_OFFSET, SCALE_WIDTH};
use crate::driver::TerminalDriver;
use crate::error::TerminalError;
use crate::geometry::{Dimensions, Point};
use crate::surface::{SurfaceHandle, TerminalSurface};
use crate::time_series::TimeSeriesSlice;
use crate::util::{format_num_bytes, format_num_bytes_rate, format_xaxis, UnitBase};

const BAR: &str = "█";
const BASELINE: &str = "▁";
const MENU: &str = " (q)uit (r)x (t)x s(c)ale (s)tat (up/down) res (left/right) scroll";

/// How bar heights relate to values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayScale {
    #[default]
    Linear,
    Log10,
    Log2,
}

impl DisplayScale {
    /// Cycles Linear, Log10, Log2 and back to Linear.
    pub fn next(self) -> Self {
        match self {
            DisplayScale::Linear => DisplayScale::Log10,
            DisplayScale::Log10 => DisplayScale::Log2,
            DisplayScale::Log2 => DisplayScale::Linear,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayScale::Linear => "linear",
            DisplayScale::Log10 => "log10",
            DisplayScale::Log2 => "log2",
        }
    }

    /// Bar height in rows for `value`, at most `rows`.
    pub fn magnitude(self, value: u64, max_value: u64, rows: u16) -> u16 {
        let magnitude = match self {
            DisplayScale::Linear if max_value == 0 => 0,
            DisplayScale::Linear => (value as f64 / max_value as f64 * f64::from(rows)) as u64,
            _ if value == 0 => 0,
            DisplayScale::Log10 => u64::from(value.ilog10()) + 1,
            DisplayScale::Log2 => u64::from(value.ilog2()) + 1,
        };

        magnitude.min(u64::from(rows)) as u16
    }

    /// Value at which a bar reaches `row` (1 = the bottom row).
    fn tick(self, row: u16, max_value: u64, rows: u16) -> Option<u64> {
        match self {
            DisplayScale::Linear => Some((max_value as u128 * u128::from(row) / u128::from(rows.max(1))) as u64),
            DisplayScale::Log10 => 10u64.checked_pow(u32::from(row) - 1),
            DisplayScale::Log2 => 2u64.checked_pow(u32::from(row) - 1),
        }
    }

    fn unit_base(self) -> UnitBase {
        match self {
            DisplayScale::Log10 => UnitBase::Decimal,
            _ => UnitBase::Binary,
        }
    }
}

pub struct BarChart<D> {
    surface: SurfaceHandle<D>,
    scale_width: u16,
    chart_offset: u16,
}

impl<D: TerminalDriver + 'static> BarChart<D> {
    pub fn new(surface: SurfaceHandle<D>) -> Self {
        Self {
            surface,
            scale_width: SCALE_WIDTH,
            chart_offset: CHART_OFFSET,
        }
    }

    /// Number of bars that fit next to the y-axis labels.
    pub fn width(&self) -> u16 {
        self.surface.borrow().size().width.saturating_sub(self.scale_width)
    }

    /// Redraws the whole surface. `iface_label` goes at the right end of
    /// the menu line, `title` into the heading.
    pub fn draw_bars_from_right(
        &self,
        iface_label: &str,
        title: &str,
        slice: &TimeSeriesSlice,
        scale: DisplayScale,
        stat: Statistic,
    ) -> Result<(), TerminalError> {
        let mut surface = self.surface.borrow_mut();
        let dim = surface.size();

        surface.clear_surface()?;

        let bottom_edge = dim.height - self.chart_offset;
        // the title owns the first row
        let rows = bottom_edge.saturating_sub(1);
        let max_value = slice.max_value();

        let bars = usize::from(dim.width.saturating_sub(self.scale_width));
        let skip = slice.len().saturating_sub(bars);
        for (i, &value) in slice.values[skip..].iter().rev().enumerate() {
            let col = dim.width - i as u16;
            let magnitude = scale.magnitude(value, max_value, rows);

            if magnitude == 0 {
                surface.put_uchar(Point::new(col, bottom_edge), BASELINE)?;
            }
            for j in 0..magnitude {
                surface.put_uchar(Point::new(col, bottom_edge - j), BAR)?;
            }
        }

        self.draw_yaxis(&mut surface, dim, rows, max_value, scale, stat)?;
        self.draw_xaxis(&mut surface, dim, slice, skip)?;
        self.draw_yaxis_label(&mut surface, dim, scale)?;
        draw_title(&mut surface, dim, title, slice, stat)?;
        draw_menu(&mut surface, dim, iface_label)?;

        surface.flush()
    }

    fn draw_yaxis(
        &self,
        surface: &mut TerminalSurface<D>,
        dim: Dimensions,
        rows: u16,
        max_value: u64,
        scale: DisplayScale,
        stat: Statistic,
    ) -> Result<(), TerminalError> {
        let bottom_edge = dim.height - self.chart_offset;
        let base = scale.unit_base();

        for row in 1..=rows {
            let Some(tick) = scale.tick(row, max_value, rows) else {
                break;
            };
            let label = match stat {
                Statistic::Average => format_num_bytes_rate(base, tick, "s"),
                Statistic::Sum => format_num_bytes(base, tick),
            };
            let label: String = label.chars().take(usize::from(self.scale_width)).collect();
            surface.put_string(Point::new(1, bottom_edge - row + 1), &label)?;
        }

        Ok(())
    }

    fn draw_xaxis(
        &self,
        surface: &mut TerminalSurface<D>,
        dim: Dimensions,
        slice: &TimeSeriesSlice,
        skip: usize,
    ) -> Result<(), TerminalError> {
        let axis = format_xaxis(slice.window, &slice.time_points[skip..]);
        let len = axis.chars().count() as u16;
        if len == 0 {
            return Ok(());
        }

        let y = dim.height - self.chart_offset + 1;
        surface.put_string(Point::new(dim.width - len + 1, y), &axis)
    }

    fn draw_yaxis_label(
        &self,
        surface: &mut TerminalSurface<D>,
        dim: Dimensions,
        scale: DisplayScale,
    ) -> Result<(), TerminalError> {
        let label = format!("<{}>", scale.label());
        let col = (self.scale_width / 2).saturating_sub(label.len() as u16 / 2).max(1);
        surface.put_string(Point::new(col, dim.height - 1), &label)
    }
}

fn draw_title<D: TerminalDriver + 'static>(
    surface: &mut TerminalSurface<D>,
    dim: Dimensions,
    title: &str,
    slice: &TimeSeriesSlice,
    stat: Statistic,
) -> Result<(), TerminalError> {
    let heading = format!("[{} {}/{}]", stat.label(), title, slice.window.label());
    let col = (dim.width / 2)
        .saturating_sub(heading.chars().count() as u16 / 2)
        .max(1);
    surface.put_string(Point::new(col, 1), &heading)
}

fn draw_menu<D: TerminalDriver + 'static>(
    surface: &mut TerminalSurface<D>,
    dim: Dimensions,
    iface_label: &str,
) -> Result<(), TerminalError> {
    let line = menu_line(dim.width, iface_label);

    surface.set_reverse_video(true)?;
    let written = surface.put_string(Point::new(1, dim.height), &line);
    surface.set_reverse_video(false)?;
    written
}

/// The menu padded to `width`, with `[iface_label]` at its right end.
fn menu_line(width: u16, iface_label: &str) -> String {
    let width = usize::from(width);
    let label = format!("[{}]", iface_label);
    let label_len = label.chars().count().min(width);

    let mut line: String = MENU.chars().chain(std::iter::repeat(' ')).take(width - label_len).collect();
    line.extend(label.chars().take(label_len));
    line
}
