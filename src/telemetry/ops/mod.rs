pub mod cache;
pub mod check;
pub mod export;
pub mod extract;
pub mod render;
pub mod serve;
