//! Core volume integration modules

pub mod area;
pub mod containment;
pub mod integrator;
pub mod interpolation;
pub mod pipeline;
pub mod volume;

// Re-export main types
pub use area::AreaCalculator;
pub use containment::{ContainmentFilter, Region, RegionGeometry};
pub use integrator::{VerticalWindow, VolumeIntegrator, SUB_STEP, SUB_STEPS_PER_CELL};
pub use interpolation::InterpolationKernel;
pub use pipeline::{transform_envelope, CoordinatePipeline, ResolutionChain};
pub use volume::{VolumeCalculator, VolumeParams};
