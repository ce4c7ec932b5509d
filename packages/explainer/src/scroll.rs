//! Scroll progress tracking.
//!
//! Scroll events arrive much faster than frames. The tracker keeps a single
//! pending update: every new event replaces the one not yet evaluated, and
//! the next frame consumes it. At most one progress evaluation happens per
//! frame.

/// Token identifying one scheduled frame evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// What the host should do after a scroll event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest {
    /// Token for the newly scheduled evaluation.
    pub token: FrameToken,
    /// Previously scheduled evaluation that is now cancelled, if any.
    pub replaces: Option<FrameToken>,
}

#[derive(Debug, Clone, Copy)]
struct PendingUpdate {
    token: FrameToken,
    offset_y: f32,
    viewport_height: f32,
}

/// Scroll offset normalized by viewport height. Not clamped.
pub fn progress_fraction(offset_y: f32, viewport_height: f32) -> f32 {
    offset_y / viewport_height
}

#[derive(Debug, Default)]
pub struct ScrollProgressTracker {
    pending: Option<PendingUpdate>,
    next_token: u64,
    last_fraction: Option<f32>,
}

impl ScrollProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scroll event. Any evaluation not yet run is cancelled and replaced.
    ///
    /// Events with a non-positive or non-finite viewport height are dropped.
    pub fn on_scroll(&mut self, offset_y: f32, viewport_height: f32) -> Option<FrameRequest> {
        if !(viewport_height.is_finite() && viewport_height > 0.0) || !offset_y.is_finite() {
            log::warn!(
                "Ignoring scroll event: offset {} with viewport height {}",
                offset_y,
                viewport_height
            );
            return None;
        }

        self.next_token += 1;
        let token = FrameToken(self.next_token);
        let replaces = self
            .pending
            .replace(PendingUpdate {
                token,
                offset_y,
                viewport_height,
            })
            .map(|previous| previous.token);

        Some(FrameRequest { token, replaces })
    }

    /// Run the pending evaluation, if any, returning its progress fraction.
    pub fn on_frame(&mut self) -> Option<f32> {
        let pending = self.pending.take()?;
        let fraction = progress_fraction(pending.offset_y, pending.viewport_height);
        self.last_fraction = Some(fraction);
        Some(fraction)
    }

    /// Drop the pending evaluation without running it.
    pub fn cancel(&mut self) -> Option<FrameToken> {
        self.pending.take().map(|p| p.token)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_token(&self) -> Option<FrameToken> {
        self.pending.map(|p| p.token)
    }

    /// Most recent fraction produced by a frame.
    pub fn last_fraction(&self) -> Option<f32> {
        self.last_fraction
    }
}
