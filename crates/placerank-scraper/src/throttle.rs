use std::time::Duration;

/// Fixed spacing between consecutive outbound calls of one class.
///
/// The first [`Throttle::wait`] returns immediately; every later call sleeps
/// for the configured delay.
#[derive(Debug, Clone)]
pub struct Throttle {
    delay: Duration,
    primed: bool,
}

impl Throttle {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            primed: false,
        }
    }

    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub async fn wait(&mut self) {
        if self.primed && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.primed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_wait_is_immediate_then_spaced() {
        let mut throttle = Throttle::from_millis(50);
        let start = tokio::time::Instant::now();

        throttle.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));

        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn zero_delay_never_sleeps() {
        let mut throttle = Throttle::from_millis(0);
        throttle.wait().await;
        throttle.wait().await;
    }
}
