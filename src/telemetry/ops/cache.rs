use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Cache;

#[derive(Copy, Clone, Debug)]
pub enum Phase {
    Load,
    Clear,
}

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Clear => "clear",
        }
    }
    fn span(&self) -> Span {
        match self {
            Phase::Load => info_span!("load"),
            Phase::Clear => info_span!("clear"),
        }
    }
}

impl OpMarker for Cache {
    const NAME: &'static str = "cache";
    type Phase = Phase;
    fn root_span() -> Span {
        info_span!("cache")
    }
}
