//! # Constants and type definitions for pedgraph
//!
//! This module centralizes the **default parameters** used when windowing pedestrian
//! traces, the **evaluation constants** of the batch metrics, and the **common type
//! aliases** shared across the crate.
//!
//! ## Overview
//!
//! - Windowing defaults (observation/prediction horizons, stride, thresholds)
//! - Collision metric constants (interpolation density, distance threshold)
//! - Latent sampler defaults
//! - Core type aliases used across the crate

// -------------------------------------------------------------------------------------------------
// Windowing defaults
// -------------------------------------------------------------------------------------------------

/// Number of observed time steps per window
pub const OBS_LEN: usize = 8;

/// Number of predicted time steps per window
pub const PRED_LEN: usize = 8;

/// Frame stride between two consecutive window starts
pub const SKIP: usize = 1;

/// Minimum summed polynomial residual for a track to be flagged non-linear
pub const NONLINEAR_THRESHOLD: f64 = 0.002;

/// A window is kept only if strictly more agents than this span it entirely
pub const MIN_AGENTS: usize = 1;

/// Decimal places kept on every frame record before windowing
pub const COORD_DECIMALS: i32 = 4;

/// Number of columns of a frame record: `frame_id agent_id x y`
pub const FRAME_RECORD_WIDTH: usize = 4;

// -------------------------------------------------------------------------------------------------
// Evaluation constants
// -------------------------------------------------------------------------------------------------

/// Linear sub-steps inserted between two predicted positions for collision checks
pub const NUM_INTERP: usize = 4;

/// Two agents closer than this distance (meters) collide
pub const COLLISION_THRESHOLD: Meter = 0.2;

/// Densified steps inspected by the collision metric
pub const COLLISION_HORIZON: usize = 3 * NUM_INTERP + 2;

/// Offset added to self-distances so that an agent never collides with itself
pub const SELF_DISTANCE_OFFSET: Meter = 1.0;

// -------------------------------------------------------------------------------------------------
// Latent sampler defaults
// -------------------------------------------------------------------------------------------------

/// Number of cached centroid sets after which the sampler stops fitting new ones
pub const SAMPLER_CAPACITY: usize = 1000;

/// Standard-normal draws clustered for each centroid set
pub const SAMPLER_POOL_SIZE: usize = 1000;

/// Shrink factor applied to the cluster centroids
pub const SAMPLER_SCALE: f64 = 0.8;

/// Lloyd iterations per clustering
pub const KMEANS_MAX_ITER: usize = 300;

/// Centroid displacement below which Lloyd iterations stop
pub const KMEANS_TOL: f64 = 1e-4;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Frame index as read from a frame log
pub type FrameId = f64;
/// Agent (pedestrian) identifier as read from a frame log
pub type AgentId = f64;
/// World coordinate, in meters
pub type Meter = f64;
/// Half-open row range `[start, end)` of one window in the dataset's global arrays
pub type SeqRange = (usize, usize);
