//! Pointer-corner fail-safe.
//!
//! Moving the pointer into the top-left screen corner aborts the run. The
//! abort is recorded on a [`CancellationToken`] so every later safe point
//! (transition guards, drug boundaries, timer polls) observes it. Once
//! tripped, a token never resets; a new run gets a new token.

use tokio_util::sync::CancellationToken;

/// Pointer coordinates at or below this value on both axes count as the
/// guarded corner.
pub const FAILSAFE_CORNER_PX: i32 = 2;

/// Raised when the operator triggers the fail-safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Automation aborted by fail-safe (pointer moved to the top-left corner)")]
pub struct UserAbort;

/// Anything that can be polled for a pending abort.
///
/// Implemented by [`InputInjector`](crate::injector::InputInjector) so the
/// step timer can check the pointer gesture while it waits.
pub trait AbortSignal {
    /// Return `Err(UserAbort)` if an abort has been requested.
    fn check_abort(&self) -> Result<(), UserAbort>;

    /// Token that is cancelled once an abort has been requested.
    fn cancellation(&self) -> &CancellationToken;
}

/// Fail-safe state for one run.
#[derive(Debug, Clone)]
pub struct FailSafe {
    token: CancellationToken,
    gesture_enabled: bool,
}

impl FailSafe {
    pub fn new(token: CancellationToken, gesture_enabled: bool) -> Self {
        Self {
            token,
            gesture_enabled,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn gesture_enabled(&self) -> bool {
        self.gesture_enabled
    }

    pub fn is_tripped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trip the fail-safe. Irreversible for this token.
    pub fn trip(&self) {
        if !self.token.is_cancelled() {
            tracing::warn!("Fail-safe tripped, automation will stop at the next safe point");
            self.token.cancel();
        }
    }

    /// Check the token and, if the gesture is enabled, the current pointer
    /// position. A pointer in the guarded corner trips the fail-safe.
    pub fn inspect(&self, pointer: Option<(i32, i32)>) -> Result<(), UserAbort> {
        if self.token.is_cancelled() {
            return Err(UserAbort);
        }

        if self.gesture_enabled {
            if let Some((x, y)) = pointer {
                if in_guarded_corner(x, y) {
                    tracing::warn!(x, y, "Pointer in fail-safe corner");
                    self.trip();
                    return Err(UserAbort);
                }
            }
        }

        Ok(())
    }
}

/// Whether `(x, y)` lies in the top-left fail-safe corner of the primary
/// display.
pub fn in_guarded_corner(x: i32, y: i32) -> bool {
    (0..=FAILSAFE_CORNER_PX).contains(&x) && (0..=FAILSAFE_CORNER_PX).contains(&y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_detection() {
        assert!(in_guarded_corner(0, 0));
        assert!(in_guarded_corner(2, 1));
        assert!(!in_guarded_corner(3, 0));
        assert!(!in_guarded_corner(640, 480));
        // Displays left of the primary report negative coordinates.
        assert!(!in_guarded_corner(-1, 0));
    }

    #[test]
    fn pointer_in_corner_trips_token() {
        let failsafe = FailSafe::new(CancellationToken::new(), true);

        assert_eq!(failsafe.inspect(Some((400, 300))), Ok(()));
        assert_eq!(failsafe.inspect(Some((0, 0))), Err(UserAbort));
        assert!(failsafe.is_tripped());
        // Stays tripped after the pointer leaves the corner.
        assert_eq!(failsafe.inspect(Some((400, 300))), Err(UserAbort));
    }

    #[test]
    fn disabled_gesture_ignores_corner_but_honours_token() {
        let failsafe = FailSafe::new(CancellationToken::new(), false);

        assert_eq!(failsafe.inspect(Some((0, 0))), Ok(()));
        failsafe.trip();
        assert_eq!(failsafe.inspect(None), Err(UserAbort));
    }

    #[test]
    fn unknown_pointer_position_is_not_an_abort() {
        let failsafe = FailSafe::new(CancellationToken::new(), true);
        assert_eq!(failsafe.inspect(None), Ok(()));
    }
}
