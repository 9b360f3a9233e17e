//! "Where am I" lookup with a fast attempt and a precise fallback

use std::fmt;
use std::time::Duration;

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use crate::core::coords::Coordinate;

/// Environment variable read by [`EnvPosition`], as `lat,lon`
pub const POSITION_ENV: &str = "BUTTERFLY_MAP_POSITION";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    /// Coarse fix, typically network based
    Low,
    /// GPS-grade fix
    High,
}

/// Accuracy and time budget of each attempt, in order
pub const ATTEMPTS: [(Accuracy, Duration); 2] = [
    (Accuracy::Low, Duration::from_secs(8)),
    (Accuracy::High, Duration::from_secs(12)),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coordinate: Coordinate,
    /// Radius of uncertainty in meters, when known
    pub accuracy_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown(String),
}

impl GeolocationError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => "Location access was denied",
            GeolocationError::PositionUnavailable => "Your location is currently unavailable",
            GeolocationError::Timeout => "Locating you took too long",
            GeolocationError::Unknown(_) => "Your location could not be determined",
        }
    }
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeolocationError::Unknown(detail) => write!(f, "{}: {detail}", self.user_message()),
            other => f.write_str(other.user_message()),
        }
    }
}

impl std::error::Error for GeolocationError {}

/// Something that can report the device position
pub trait PositionSource: Send + Sync {
    fn current_position(
        &self,
        accuracy: Accuracy,
    ) -> BoxFuture<'_, Result<Position, GeolocationError>>;
}

/// Looks up the position, low accuracy first and high accuracy if that fails
///
/// The error of the last attempt is returned when both fail.
pub async fn locate<S>(source: &S) -> Result<Position, GeolocationError>
where
    S: PositionSource + ?Sized,
{
    let mut last_error = GeolocationError::Unknown("no attempt made".to_string());

    for (accuracy, budget) in ATTEMPTS {
        let outcome = match tokio::time::timeout(budget, source.current_position(accuracy)).await {
            Ok(Ok(position)) if position.coordinate.is_finite() => return Ok(position),
            Ok(Ok(_)) => GeolocationError::PositionUnavailable,
            Ok(Err(e)) => e,
            Err(_) => GeolocationError::Timeout,
        };
        log::debug!("{accuracy:?}-accuracy position attempt failed: {outcome}");
        last_error = outcome;
    }

    Err(last_error)
}

/// Position taken from [`POSITION_ENV`]; useful where no device sensor exists
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvPosition;

impl PositionSource for EnvPosition {
    fn current_position(
        &self,
        _accuracy: Accuracy,
    ) -> BoxFuture<'_, Result<Position, GeolocationError>> {
        let result = match std::env::var(POSITION_ENV) {
            Ok(raw) => raw
                .parse::<Coordinate>()
                .map(|coordinate| Position {
                    coordinate,
                    accuracy_m: None,
                })
                .map_err(|e| GeolocationError::Unknown(e.to_string())),
            Err(_) => Err(GeolocationError::PositionUnavailable),
        };
        future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    enum Behavior {
        Succeed(Coordinate),
        Fail(GeolocationError),
        Hang,
    }

    struct ScriptedSource {
        low: Behavior,
        high: Behavior,
        calls: Mutex<Vec<Accuracy>>,
    }

    impl ScriptedSource {
        fn new(low: Behavior, high: Behavior) -> Self {
            Self {
                low,
                high,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Accuracy> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PositionSource for ScriptedSource {
        fn current_position(
            &self,
            accuracy: Accuracy,
        ) -> BoxFuture<'_, Result<Position, GeolocationError>> {
            self.calls.lock().unwrap().push(accuracy);
            let behavior = match accuracy {
                Accuracy::Low => &self.low,
                Accuracy::High => &self.high,
            };
            match behavior {
                Behavior::Succeed(coordinate) => future::ready(Ok(Position {
                    coordinate: *coordinate,
                    accuracy_m: Some(25.0),
                }))
                .boxed(),
                Behavior::Fail(e) => future::ready(Err(e.clone())).boxed(),
                Behavior::Hang => future::pending().boxed(),
            }
        }
    }

    fn brussels() -> Coordinate {
        Coordinate::new(50.85, 4.35)
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_accuracy_success_skips_second_attempt() {
        let source = ScriptedSource::new(Behavior::Succeed(brussels()), Behavior::Hang);
        let position = locate(&source).await.unwrap();
        assert_eq!(position.coordinate, brussels());
        assert_eq!(source.calls(), vec![Accuracy::Low]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_high_accuracy_after_timeout() {
        let source = ScriptedSource::new(Behavior::Hang, Behavior::Succeed(brussels()));
        let started = tokio::time::Instant::now();
        let position = locate(&source).await.unwrap();
        assert_eq!(position.coordinate, brussels());
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(8) && waited < Duration::from_secs(9), "{waited:?}");
        assert_eq!(source.calls(), vec![Accuracy::Low, Accuracy::High]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_attempts_time_out() {
        let source = ScriptedSource::new(Behavior::Hang, Behavior::Hang);
        let started = tokio::time::Instant::now();
        assert_eq!(locate(&source).await, Err(GeolocationError::Timeout));
        assert!(started.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_failure_reason_is_reported() {
        let source = ScriptedSource::new(
            Behavior::Fail(GeolocationError::PositionUnavailable),
            Behavior::Fail(GeolocationError::PermissionDenied),
        );
        let err = locate(&source).await.unwrap_err();
        assert_eq!(err, GeolocationError::PermissionDenied);
        assert_eq!(err.to_string(), "Location access was denied");
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_finite_fix_is_unavailable() {
        let nowhere = Coordinate::new(f64::NAN, 4.35);
        let source = ScriptedSource::new(Behavior::Succeed(nowhere), Behavior::Succeed(nowhere));
        assert_eq!(locate(&source).await, Err(GeolocationError::PositionUnavailable));
    }

    #[test]
    fn test_unknown_message_keeps_detail() {
        let err = GeolocationError::Unknown("sensor offline".to_string());
        assert_eq!(err.to_string(), "Your location could not be determined: sensor offline");
    }
}
