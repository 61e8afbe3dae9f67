pub mod credential;
pub mod persist;
pub mod token;
pub mod token_cache;
