pub mod export;
pub mod render;

pub use export::{write_plan_csv, write_plan_csv_to, write_quantities_csv};
pub use render::{display_generation_result, display_rankings, display_scalability};
