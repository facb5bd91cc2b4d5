/// Upper bound on the render pixel ratio.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Multiplier applied to the device pixel ratio while the user interacts.
pub const REDUCED_PIXEL_RATIO_FACTOR: f32 = 0.7;

/// Quiet period after the last interaction before full resolution returns.
pub const RESTORE_DELAY_MS: u64 = 2000;
