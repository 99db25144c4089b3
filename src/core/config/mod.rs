pub mod settings;
pub mod validation;

pub use settings::Settings;
