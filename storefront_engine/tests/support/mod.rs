pub mod prepare_env;

#[allow(unused_imports)]
pub use prepare_env::*;
