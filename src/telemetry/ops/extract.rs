use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Extract;

#[derive(Copy, Clone, Debug)]
pub enum Phase {
    Pipeline,
}

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Pipeline => "pipeline",
        }
    }
    fn span(&self) -> Span {
        match self {
            Phase::Pipeline => info_span!("pipeline"),
        }
    }
}

impl OpMarker for Extract {
    const NAME: &'static str = "extract";
    type Phase = Phase;
    fn root_span() -> Span {
        info_span!("extract")
    }
}
