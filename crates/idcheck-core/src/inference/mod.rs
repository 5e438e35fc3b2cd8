//! ML inference engine using Candle.
//!
//! Detector weights are small linear scoring heads stored as safetensors.
//! They are loaded lazily on first use and shared by every call.

mod device;
mod linear_head;
mod loader;
mod utils;

pub use device::get_device;
pub use linear_head::{CandleScorer, LinearHead};
pub use loader::{load_safetensors, LazyModel};
pub use utils::sigmoid;
