use thiserror::Error;

/// Why a turn could not be created. All of these are recovered locally: the
/// synthesizer falls back, the state machine stays idle and reports a status.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TurnError {
    #[error("no valid outer boundary")]
    MissingBoundary,
    #[error("no usable guidance track")]
    MissingTrack,
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
    #[error("headland line could not be built from the boundary")]
    HeadlandUnavailable,
    #[error("turn-limit offset of {0:.2} m collapsed the boundary")]
    TurnAreaCollapsed(f64),
    #[error("track does not cross the headland ahead")]
    NoHeadlandCrossing,
    #[error("no arc placement fits inside the turn area")]
    ArcOutsideTurnArea,
    #[error("arc apex lies outside the boundary")]
    ApexOutsideBoundary,
    #[error("exit leg ends outside the boundary")]
    ExitOutsideBoundary,
    #[error("path turns {degrees:.0} degrees, looks like a spiral")]
    Spiral { degrees: f64 },
    #[error("field geometry was built with different headland settings")]
    StaleField,
    #[error("end of field reached")]
    EndOfField,
    #[error("a turn is already executing")]
    TurnInProgress,
}

impl TurnError {
    /// Errors caused by missing collaborators rather than turn geometry.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, TurnError::MissingBoundary | TurnError::MissingTrack | TurnError::HeadlandUnavailable)
    }
}

pub type Result<T> = std::result::Result<T, TurnError>;
