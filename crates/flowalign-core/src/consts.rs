/// Image sides must be a multiple of this many pixels.
pub const IMAGE_TILE_SIZE: usize = 512;

/// Radius (pixels) within which a one-to-one mutual pair is an exclusive hit.
pub const EXCLUSIVE_RADIUS: f64 = 1.5;

/// Radius (pixels) within which a mutual pair is a good-mutual hit.
pub const GOOD_MUTUAL_RADIUS: f64 = 3.0;

/// Weight of good-mutual hits in the alignment score:
/// `score = exclusive + GOOD_MUTUAL_WEIGHT * good_mutual`.
pub const GOOD_MUTUAL_WEIGHT: f64 = 0.9;

/// Number of angular shuffles used to build the rough-alignment noise
/// distribution for the SNR test.
pub const NOISE_SHUFFLE_COUNT: usize = 20;

/// Iteration bound for precision-alignment hit-set refinement.
pub const MAX_PRECISION_ITERATIONS: usize = 10;

/// A tile must contribute at least this many hits to keep its pose.
pub const MIN_TILE_HITS: usize = 3;

/// Grid rows probed during end-tile bounds discovery, in preference order.
/// Row 3 sits in the center of the circular region where cluster data exists.
pub const BOUNDS_PROBE_ROWS: [usize; 3] = [3, 4, 2];

/// Minimum pixel count (h*w) to use row-level Rayon parallelism in the FFT.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;
