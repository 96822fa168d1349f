//! Mock Sensor Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the sensor
//! scheduler to run in both **Production** (tokio) and **Simulation**
//! (virtual clock) environments.
//!
//! # Core Concept
//!
//! Everything that would make a sensor trace non-reproducible is intercepted:
//! - Time (`now()`, `sleep()`)
//! - Task spawning (`spawn()`)
//! - Randomness (`NoiseSource`)
//!
//! # Example
//!
//! ```ignore
//! use mock_sensor_env::{SensorContext, NoiseSource};
//!
//! async fn ticker<Ctx: SensorContext>(ctx: &Ctx, noise: &dyn NoiseSource) {
//!     loop {
//!         ctx.sleep(Duration::from_millis(100)).await;
//!         step(ctx.now(), noise.draw());
//!     }
//! }
//! ```

mod context;
mod error;
mod noise;
mod tokio_impl;

pub use context::SensorContext;
pub use error::EnvError;
pub use noise::{FixedNoise, NoiseSource, UniformNoise, MAX_JITTER_MM};
pub use tokio_impl::TokioContext;
