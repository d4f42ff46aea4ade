pub mod best_fit;
pub mod custom;
pub mod first_fit;
pub mod random_probe;
pub mod worst_fit;
