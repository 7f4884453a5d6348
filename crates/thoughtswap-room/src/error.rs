pub use thoughtswap_core::CoreError;

pub type Result<T> = std::result::Result<T, CoreError>;
