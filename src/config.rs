// Command line configuration.

use clap::Parser;

use crate::engine::canvas::DEFAULT_BRUSH_RADIUS;

/// Largest accepted half extent; 10.0 already means a 401 x 401 top grid.
pub const MAX_HALF_EXTENT: f32 = 10.0;

#[derive(Parser, Debug, Clone)]
#[command(name = "shore_sculpt", version, about = "Paint a height map and sculpt terrain out of the sea")]
pub struct SculptArgs {
    /// Half the side length of the terrain slab, in world units
    #[arg(long, default_value_t = 1.0, value_parser = parse_half_extent)]
    pub half_extent: f32,

    /// Initial brush radius in canvas pixels (clamped to 1-21)
    #[arg(long, default_value_t = DEFAULT_BRUSH_RADIUS)]
    pub brush_radius: f32,

    /// Initial window width
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height
    #[arg(long, default_value_t = 720)]
    pub height: u32,
}

fn parse_half_extent(value: &str) -> Result<f32, String> {
    let half_extent: f32 = value
        .parse()
        .map_err(|e| format!("`{value}` is not a number: {e}"))?;
    if !half_extent.is_finite() || half_extent <= 0.0 {
        return Err(format!("must be a positive number, got {half_extent}"));
    }
    if half_extent > MAX_HALF_EXTENT {
        return Err(format!("must be at most {MAX_HALF_EXTENT}, got {half_extent}"));
    }
    Ok(half_extent)
}
