// Height-map paint canvas: one alpha byte per top-plane vertex.
// Strokes composite a soft radial brush over the existing alpha, like a 2D
// canvas filled with a transparent radial gradient.

use glam::Vec2;

use super::grid::Grid;

// ============================================================================
// BRUSH
// ============================================================================

pub const MIN_BRUSH_RADIUS: f32 = 1.0;
pub const MAX_BRUSH_RADIUS: f32 = 21.0;
pub const DEFAULT_BRUSH_RADIUS: f32 = 10.0;
/// Alpha deposited at the brush core by a single dab.
pub const BRUSH_PEAK_ALPHA: u8 = 0x10;
/// Fraction of the radius painted at full peak alpha.
pub const BRUSH_CORE_FRACTION: f32 = 0.25;
/// Preview colour of painted pixels (#101010).
pub const INK_RGB: [u8; 3] = [0x10, 0x10, 0x10];

/// Soft round brush, radius in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    radius: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Self { radius: DEFAULT_BRUSH_RADIUS }
    }
}

impl Brush {
    pub fn new(radius: f32) -> Self {
        let mut brush = Self::default();
        brush.set_radius(radius);
        brush
    }

    pub fn radius(&self) -> f32 { self.radius }

    /// Set the radius, clamped to [MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS].
    pub fn set_radius(&mut self, radius: f32) {
        if radius.is_finite() {
            self.radius = radius.clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS);
        }
    }

    /// Grow (positive) or shrink (negative) by whole pixels. Used by the wheel.
    pub fn nudge(&mut self, steps: i32) {
        self.set_radius(self.radius + steps as f32);
    }

    /// Alpha (0..=1) the brush deposits at `distance` pixels from its centre.
    pub fn falloff(&self, distance: f32) -> f32 {
        let inner = self.radius * BRUSH_CORE_FRACTION;
        if distance >= self.radius {
            return 0.0;
        }
        let t = ((distance - inner) / (self.radius - inner)).clamp(0.0, 1.0);
        (1.0 - t) * BRUSH_PEAK_ALPHA as f32 / 255.0
    }
}

// ============================================================================
// PAINT INPUT
// ============================================================================

/// Snapshot of what the user is doing with the pointer this frame.
/// `cursor` is in canvas pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintInput {
    pub is_drawing: bool,
    pub cursor:     Vec2,
}

impl PaintInput {
    pub fn idle(cursor: Vec2) -> Self {
        Self { is_drawing: false, cursor }
    }

    pub fn drawing(cursor: Vec2) -> Self {
        Self { is_drawing: true, cursor }
    }
}

/// Apply one frame of paint input. Returns true if any pixel changed.
pub fn paint(canvas: &mut HeightCanvas, brush: &Brush, input: PaintInput) -> bool {
    if !input.is_drawing {
        return false;
    }
    canvas.stroke(input.cursor, brush)
}

// ============================================================================
// CANVAS
// ============================================================================

/// Square alpha canvas, same resolution as the slab's top plane.
#[derive(Debug, Clone)]
pub struct HeightCanvas {
    alpha:    Grid<u8>,
    revision: u64,
}

impl HeightCanvas {
    pub fn new(side: usize) -> Self {
        Self { alpha: Grid::filled(side, 0), revision: 0 }
    }

    pub fn side(&self) -> usize { self.alpha.side() }

    /// Bumped whenever pixels change.
    pub fn revision(&self) -> u64 { self.revision }

    pub fn alpha_at(&self, x: usize, y: usize) -> Option<u8> {
        self.alpha.get(y, x).copied()
    }

    /// Row-major alpha samples, one per top-plane vertex.
    pub fn intensity_field(&self) -> &[u8] { self.alpha.as_slice() }

    /// Composite one brush dab centred at `center` (pixel units, pixel centres at +0.5).
    /// Uses source-over alpha: a = src + dst × (1 - src).
    pub fn stroke(&mut self, center: Vec2, brush: &Brush) -> bool {
        let side = self.side();
        if side == 0 || !center.is_finite() {
            return false;
        }
        let r = brush.radius();
        let min_x = (center.x - r).floor().max(0.0) as usize;
        let min_y = (center.y - r).floor().max(0.0) as usize;
        let max_x = ((center.x + r).ceil().max(0.0) as usize).min(side);
        let max_y = ((center.y + r).ceil().max(0.0) as usize).min(side);

        let mut changed = false;
        for y in min_y..max_y {
            for x in min_x..max_x {
                let pixel = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let src = brush.falloff(pixel.distance(center));
                if src <= 0.0 {
                    continue;
                }
                let cell = &mut self.alpha[(y, x)];
                let dst = *cell as f32 / 255.0;
                let out = ((src + dst * (1.0 - src)) * 255.0).round().min(255.0) as u8;
                if out != *cell {
                    *cell = out;
                    changed = true;
                }
            }
        }

        if changed {
            self.revision += 1;
        }
        changed
    }

    pub fn clear(&mut self) {
        self.alpha.fill(0);
        self.revision += 1;
    }

    /// RGBA preview of the canvas (ink colour, alpha = height).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.alpha.len() * 4);
        for &a in self.alpha.as_slice() {
            rgba.extend_from_slice(&INK_RGB);
            rgba.push(a);
        }
        rgba
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brush_radius_is_clamped() {
        let mut brush = Brush::new(50.0);
        assert_eq!(brush.radius(), MAX_BRUSH_RADIUS);
        brush.set_radius(0.0);
        assert_eq!(brush.radius(), MIN_BRUSH_RADIUS);
        brush.nudge(-3);
        assert_eq!(brush.radius(), MIN_BRUSH_RADIUS);
        brush.nudge(4);
        assert_eq!(brush.radius(), 5.0);
        brush.set_radius(f32::NAN);
        assert_eq!(brush.radius(), 5.0);
    }

    #[test]
    fn falloff_is_flat_in_core_and_zero_at_rim() {
        let brush = Brush::new(8.0);
        let peak = BRUSH_PEAK_ALPHA as f32 / 255.0;
        assert_eq!(brush.falloff(0.0), peak);
        assert_eq!(brush.falloff(2.0), peak);
        assert!((brush.falloff(5.0) - peak * 0.5).abs() < 1e-6);
        assert_eq!(brush.falloff(8.0), 0.0);
        assert_eq!(brush.falloff(12.0), 0.0);
    }

    #[test]
    fn single_dab_deposits_peak_alpha_at_centre() {
        let mut canvas = HeightCanvas::new(41);
        assert!(canvas.stroke(Vec2::new(20.5, 20.5), &Brush::new(4.0)));
        assert_eq!(canvas.alpha_at(20, 20), Some(BRUSH_PEAK_ALPHA));
        assert_eq!(canvas.alpha_at(0, 0), Some(0));
        assert_eq!(canvas.revision(), 1);
    }

    #[test]
    fn repeated_dabs_accumulate_towards_full() {
        let mut canvas = HeightCanvas::new(9);
        let brush = Brush::new(3.0);
        let mut last = 0;
        for _ in 0..20 {
            canvas.stroke(Vec2::new(4.5, 4.5), &brush);
            let now = canvas.alpha_at(4, 4).unwrap();
            assert!(now > last);
            last = now;
        }
        // 1 - (1 - 16/255)^20 ≈ 0.73
        assert!((170..=200).contains(&last), "alpha {last}");
    }

    #[test]
    fn strokes_outside_the_canvas_are_clipped() {
        let mut canvas = HeightCanvas::new(5);
        assert!(!canvas.stroke(Vec2::new(-50.0, -50.0), &Brush::new(3.0)));
        assert!(canvas.stroke(Vec2::new(-0.5, 2.5), &Brush::new(3.0)));
        assert!(canvas.alpha_at(0, 2).unwrap() > 0);
        assert!(!canvas.stroke(Vec2::new(f32::NAN, 1.0), &Brush::new(3.0)));
    }

    #[test]
    fn paint_only_strokes_while_drawing() {
        let mut canvas = HeightCanvas::new(9);
        let brush = Brush::default();
        assert!(!paint(&mut canvas, &brush, PaintInput::idle(Vec2::splat(4.5))));
        assert!(canvas.intensity_field().iter().all(|&a| a == 0));
        assert!(paint(&mut canvas, &brush, PaintInput::drawing(Vec2::splat(4.5))));
        assert!(canvas.intensity_field().iter().any(|&a| a > 0));
    }

    #[test]
    fn clear_and_preview() {
        let mut canvas = HeightCanvas::new(3);
        canvas.stroke(Vec2::new(1.5, 1.5), &Brush::new(2.0));
        let rgba = canvas.to_rgba();
        assert_eq!(rgba.len(), 9 * 4);
        assert_eq!(&rgba[16..19], &INK_RGB);
        assert_eq!(rgba[19], canvas.alpha_at(1, 1).unwrap());

        canvas.clear();
        assert!(canvas.intensity_field().iter().all(|&a| a == 0));
        assert_eq!(canvas.revision(), 2);
    }
}
