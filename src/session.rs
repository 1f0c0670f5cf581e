use crate::audio::features::AnalysisFrame;
use crate::history::HistoryBuffer;
use crate::viewport::ViewportController;

/// Opaque identifier of a capture session. It changes exactly when a new
/// recording starts; only equality is meaningful.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Everything the render loop mutates for one session: the rolling history
/// and the viewport over it.
#[derive(Clone, Debug)]
pub struct AnalysisContext {
    pub history: HistoryBuffer,
    pub viewport: ViewportController,
}

impl AnalysisContext {
    pub fn new(history: HistoryBuffer, viewport: ViewportController) -> Self {
        Self { history, viewport }
    }

    pub fn push(&mut self, frame: AnalysisFrame) {
        self.history.append(frame);
    }

    /// Start over for a new session: empty history, pan back to live.
    pub fn reset(&mut self) {
        self.history.reset();
        self.viewport.reset_pan();
    }
}

/// Watches the session signal and resets the context when it changes.
#[derive(Clone, Debug, Default)]
pub struct SessionReset {
    current: Option<SessionId>,
}

impl SessionReset {
    #[cfg(test)]
    pub fn current(&self) -> Option<SessionId> {
        self.current
    }

    /// Compare `session` with the last one seen; on a change, reset the
    /// context. Returns whether a reset happened.
    pub fn observe(&mut self, session: SessionId, context: &mut AnalysisContext) -> bool {
        if self.current == Some(session) {
            return false;
        }
        log::debug!("New session {:?} (previous {:?}), clearing history", session, self.current);
        self.current = Some(session);
        context.reset();
        true
    }
}
