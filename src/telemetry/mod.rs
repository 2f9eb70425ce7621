pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

// One typed logging context per operation.
pub fn extract() -> LogCtx<ops::extract::Extract> { LogCtx::new(config::logs_are_json()) }
pub fn check() -> LogCtx<ops::check::Check> { LogCtx::new(config::logs_are_json()) }
pub fn export() -> LogCtx<ops::export::Export> { LogCtx::new(config::logs_are_json()) }
pub fn render() -> LogCtx<ops::render::Render> { LogCtx::new(config::logs_are_json()) }
pub fn serve() -> LogCtx<ops::serve::Serve> { LogCtx::new(config::logs_are_json()) }
pub fn cache() -> LogCtx<ops::cache::Cache> { LogCtx::new(config::logs_are_json()) }
