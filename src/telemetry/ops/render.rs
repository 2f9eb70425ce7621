use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Render;

#[derive(Copy, Clone, Debug)]
pub enum Phase {
    Request,
}

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Request => "request",
        }
    }
    fn span(&self) -> Span {
        match self {
            Phase::Request => info_span!("request"),
        }
    }
}

impl OpMarker for Render {
    const NAME: &'static str = "render";
    type Phase = Phase;
    fn root_span() -> Span {
        info_span!("render")
    }
}
