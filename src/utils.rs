//! Utility functions and geometry helpers for Lodestar

#[cfg(windows)]
use std::ffi::OsStr;
#[cfg(windows)]
use std::os::windows::ffi::OsStrExt;

/// Logical width of the main window at 96 DPI
pub const DEFAULT_WINDOW_WIDTH: i32 = 1200;
/// Logical height of the main window at 96 DPI
pub const DEFAULT_WINDOW_HEIGHT: i32 = 676;
/// Physical pixels the window may drift from its default size before `show` re-centres it
pub const RESIZE_TOLERANCE: f64 = 10.0;
/// Logical height of the tall title bar drawn into the client area
pub const TITLE_BAR_HEIGHT: i32 = 48;

/// Convert a Rust string to a wide string for Windows API
#[cfg(windows)]
pub fn to_wide_string(s: &str) -> Vec<u16> {
    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// Calculate DPI scaling factor
pub fn get_dpi_scale(dpi: u32) -> f64 {
    dpi as f64 / 96.0
}

/// Scale a logical value by a DPI factor
pub fn scale_by(value: i32, scale: f64) -> i32 {
    (value as f64 * scale) as i32
}

/// Rectangle structure for layout calculations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center_x(&self) -> i32 {
        self.x + self.width / 2
    }

    pub fn center_y(&self) -> i32 {
        self.y + self.height / 2
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x(), self.center_y())
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// No area to place anything in
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Point structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Size structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Compute the window rectangle centred on `work_area`.
///
/// Requested dimensions are logical and get multiplied by `scale`; a missing
/// or non-positive dimension keeps the matching side of `current`.
pub fn centered_rect(
    work_area: Rect,
    current: Size,
    width: Option<i32>,
    height: Option<i32>,
    scale: f64,
) -> Rect {
    let w = width
        .filter(|w| *w > 0)
        .map(|w| scale_by(w, scale))
        .unwrap_or(current.width);
    let h = height
        .filter(|h| *h > 0)
        .map(|h| scale_by(h, scale))
        .unwrap_or(current.height);

    Rect {
        x: work_area.x + (work_area.width - w) / 2,
        y: work_area.y + (work_area.height - h) / 2,
        width: w,
        height: h,
    }
}

/// Whether the window has drifted far enough from its default size to be re-centred
pub fn needs_recenter(current: Size, scale: f64) -> bool {
    let target_w = DEFAULT_WINDOW_WIDTH as f64 * scale;
    let target_h = DEFAULT_WINDOW_HEIGHT as f64 * scale;
    (current.width as f64 - target_w).abs() > RESIZE_TOLERANCE
        || (current.height as f64 - target_h).abs() > RESIZE_TOLERANCE
}

/// Whether a client-area point lies in the title bar drag region
pub fn in_drag_region(client_y: i32, scale: f64) -> bool {
    client_y >= 0 && client_y < scale_by(TITLE_BAR_HEIGHT, scale)
}

/// Get the low-order word of a message parameter
pub fn loword(value: usize) -> u32 {
    (value & 0xFFFF) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_center_matches_work_area() {
        let areas = [
            Rect::new(0, 0, 1920, 1040),
            Rect::new(1920, 0, 2560, 1400),
            Rect::new(-1280, 200, 1280, 984),
        ];
        let scales = [1.0, 1.25, 1.5, 2.0];
        let sizes = [(1200, 676), (800, 600), (333, 111), (1, 1)];

        for area in areas {
            for scale in scales {
                for (w, h) in sizes {
                    let r = centered_rect(area, Size::new(10, 10), Some(w), Some(h), scale);
                    assert_eq!(r.width, scale_by(w, scale));
                    assert_eq!(r.height, scale_by(h, scale));
                    // rounding of the halves can shift the centre by one pixel
                    let cx2 = 2 * r.x + r.width;
                    let cy2 = 2 * r.y + r.height;
                    assert!((cx2 - (2 * area.x + area.width)).abs() <= 1);
                    assert!((cy2 - (2 * area.y + area.height)).abs() <= 1);
                }
            }
        }
    }

    #[test]
    fn missing_dimensions_keep_current_size() {
        let area = Rect::new(0, 0, 1000, 1000);
        let current = Size::new(400, 300);

        let r = centered_rect(area, current, None, None, 2.0);
        assert_eq!(r, Rect::new(300, 350, 400, 300));

        let r = centered_rect(area, current, Some(0), Some(-5), 1.5);
        assert_eq!(r.size(), current);

        let r = centered_rect(area, current, Some(100), None, 1.5);
        assert_eq!(r.size(), Size::new(150, 300));
    }

    #[test]
    fn recenter_only_outside_tolerance() {
        assert!(!needs_recenter(Size::new(1200, 676), 1.0));
        assert!(!needs_recenter(Size::new(1210, 666), 1.0));
        assert!(needs_recenter(Size::new(1211, 676), 1.0));
        assert!(needs_recenter(Size::new(1200, 665), 1.0));

        assert!(!needs_recenter(Size::new(1800, 1014), 1.5));
        assert!(!needs_recenter(Size::new(1795, 1020), 1.5));
        assert!(needs_recenter(Size::new(1200, 676), 1.5));
    }

    #[test]
    fn drag_region_scales_with_dpi() {
        assert!(in_drag_region(0, 1.0));
        assert!(in_drag_region(47, 1.0));
        assert!(!in_drag_region(48, 1.0));
        assert!(in_drag_region(71, 1.5));
        assert!(!in_drag_region(72, 1.5));
        assert!(!in_drag_region(-1, 1.0));
    }

    #[test]
    fn empty_rects() {
        assert!(Rect::default().is_empty());
        assert!(Rect::new(10, 10, 0, 500).is_empty());
        assert!(Rect::new(0, 0, 1920, -1).is_empty());
        assert!(!Rect::new(-1920, 0, 1920, 1040).is_empty());
    }

    #[test]
    fn dpi_scale() {
        assert_eq!(get_dpi_scale(96), 1.0);
        assert_eq!(get_dpi_scale(144), 1.5);
        assert_eq!(scale_by(48, 1.25), 60);
    }
}
