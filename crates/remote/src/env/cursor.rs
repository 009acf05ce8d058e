use image::RgbImage;

/// Minecraft's fixed cursor-to-view mapping at the default mouse sensitivity
/// (0.5). See `Mouse.updateMouse()` and `Entity.changeLookDirection()` in the
/// yarn mappings.
pub const DEGREES_PER_PIXEL: f64 = 0.15;
pub const PIXELS_PER_DEGREE: f64 = 1.0 / DEGREES_PER_PIXEL;

/// Converts changes in view degrees to the absolute pixel cursor positions
/// Minecraft ingests.
///
/// Yaw wraps and pitch is clamped to ±90° inside the game, so the mapper
/// does not clamp; excess pixels are simply ignored game-side. Call
/// [`set`](Self::set) with the cursor position the mod last reported to keep
/// the mapping anchored to what was actually applied.
#[derive(Debug, Clone, Default)]
pub struct DegreesToPixels {
    x: f64,
    y: f64,
}

impl DegreesToPixels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply view deltas in degrees and return the new absolute cursor
    /// position in pixels.
    pub fn update(&mut self, yaw_delta: f64, pitch_delta: f64) -> (f64, f64) {
        self.x += yaw_delta * PIXELS_PER_DEGREE;
        self.y += pitch_delta * PIXELS_PER_DEGREE;
        (self.x, self.y)
    }

    /// Overwrite the absolute cursor position.
    pub fn set(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

const CURSOR_COLOR: image::Rgb<u8> = image::Rgb([255, 0, 0]);
const CURSOR_ARM_LENGTH: i32 = 5;

/// Draw a small crosshair cursor onto a frame. Frames from Minecraft do not
/// include the cursor (the OS draws it), so when the cursor is visible the
/// environment adds one back. Out-of-frame positions are ignored.
pub fn draw_crosshair(frame: &mut RgbImage, pos: (i32, i32)) {
    let (x, y) = pos;
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    if x < 0 || x >= w || y < 0 || y >= h {
        return;
    }

    let x_min = (x - CURSOR_ARM_LENGTH).max(0);
    let x_max = (x + CURSOR_ARM_LENGTH).min(w - 1);
    for px in x_min..=x_max {
        frame.put_pixel(px as u32, y as u32, CURSOR_COLOR);
    }
    let y_min = (y - CURSOR_ARM_LENGTH).max(0);
    let y_max = (y + CURSOR_ARM_LENGTH).min(h - 1);
    for py in y_min..=y_max {
        frame.put_pixel(x as u32, py as u32, CURSOR_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deltas_accumulate() {
        let mut map = DegreesToPixels::new();
        map.update(30.0, -10.0);
        let (x, y) = map.update(-30.0, 10.0);
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_sum_of_deltas_scales_by_pixels_per_degree() {
        let mut map = DegreesToPixels::new();
        let deltas = [(15.0, 3.0), (-4.5, 0.0), (90.0, -45.0)];
        for (yaw, pitch) in deltas {
            map.update(yaw, pitch);
        }
        let yaw_sum: f64 = deltas.iter().map(|d| d.0).sum();
        let pitch_sum: f64 = deltas.iter().map(|d| d.1).sum();
        let (x, y) = map.position();
        assert!((x - yaw_sum * PIXELS_PER_DEGREE).abs() < 1e-9);
        assert!((y - pitch_sum * PIXELS_PER_DEGREE).abs() < 1e-9);
    }

    #[test]
    fn test_set_reanchors() {
        let mut map = DegreesToPixels::new();
        map.update(90.0, 0.0);
        map.set(10.0, 20.0);
        let (x, y) = map.update(0.15, 0.15);
        assert!((x - 11.0).abs() < 1e-9);
        assert!((y - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_turn_is_1200_pixels() {
        let mut map = DegreesToPixels::new();
        let (x, _) = map.update(180.0, 0.0);
        assert!((x - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_draw_crosshair_clips_at_edges() {
        let mut frame = RgbImage::new(16, 16);
        draw_crosshair(&mut frame, (0, 0));
        assert_eq!(frame.get_pixel(0, 0), &CURSOR_COLOR);
        assert_eq!(frame.get_pixel(5, 0), &CURSOR_COLOR);
        assert_eq!(frame.get_pixel(6, 0), &image::Rgb([0, 0, 0]));

        // Off-frame cursor leaves the image untouched.
        let mut frame = RgbImage::new(16, 16);
        draw_crosshair(&mut frame, (-1, 8));
        assert!(frame.pixels().all(|p| p == &image::Rgb([0, 0, 0])));
    }
}
