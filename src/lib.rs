pub mod anomaly;
pub mod change_detection;
pub mod change_engine;
pub mod config;
pub mod edges;
pub mod errors;
pub mod estimation;
pub mod fusion;
pub mod mask_store;
pub mod normalize;
pub mod scalar_map;
pub mod severity;
pub mod visualization;
pub mod zones;
