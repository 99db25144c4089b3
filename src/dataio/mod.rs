mod loader;

pub use loader::{combine_info, AnimeDataLoader, COMBINED_COLUMN, REQUIRED_COLUMNS};
