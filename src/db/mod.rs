pub mod pool;
pub mod streaks;

pub use pool::create_pool;
