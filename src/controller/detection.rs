use std::time::Duration;

use crate::config::DetectionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionState {
    Idle,
    Probing,
    Found,
    /// Terminal until the next reset. Nothing is reported to the user.
    GaveUp,
}

/// What to do after a probe result has been observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Precondition holds; activate
    Proceed,
    /// Probe again after the delay
    Retry(Duration),
    GiveUp,
    /// Result belongs to an older epoch or the loop is not probing
    Stale,
}

/// Bounded, fixed-interval retry state machine. The epoch is bumped on every
/// reset so probes scheduled before a navigation are recognised as stale.
#[derive(Debug, Clone)]
pub struct DetectionLoop {
    state: DetectionState,
    attempts: u32,
    max_attempts: u32,
    retry_interval: Duration,
    epoch: u64,
}

impl DetectionLoop {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            state: DetectionState::Idle,
            attempts: 0,
            max_attempts: config.max_attempts,
            retry_interval: config.retry_interval(),
            epoch: 0,
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Back to `Idle`, then straight into `Probing` under a new epoch.
    /// Returns the epoch the first probe must carry.
    pub fn reset(&mut self) -> u64 {
        self.state = DetectionState::Idle;
        self.attempts = 0;
        self.epoch += 1;
        self.state = DetectionState::Probing;
        self.epoch
    }

    pub fn observe(&mut self, epoch: u64, found: bool) -> Step {
        if epoch != self.epoch || self.state != DetectionState::Probing {
            return Step::Stale;
        }

        if found {
            self.state = DetectionState::Found;
            Step::Proceed
        } else if self.attempts < self.max_attempts {
            self.attempts += 1;
            Step::Retry(self.retry_interval)
        } else {
            self.state = DetectionState::GaveUp;
            Step::GiveUp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(max_attempts: u32) -> DetectionLoop {
        DetectionLoop::new(&DetectionConfig {
            max_attempts,
            ..Default::default()
        })
    }

    #[test]
    fn starts_idle_until_reset() {
        let mut detection = detection(15);
        assert_eq!(detection.state(), DetectionState::Idle);
        assert_eq!(detection.observe(0, true), Step::Stale);

        let epoch = detection.reset();
        assert_eq!(detection.state(), DetectionState::Probing);
        assert_eq!(detection.observe(epoch, true), Step::Proceed);
        assert_eq!(detection.state(), DetectionState::Found);
    }

    #[test]
    fn gives_up_after_exactly_max_retries() {
        let mut detection = detection(15);
        let epoch = detection.reset();

        let mut retries = 0;
        loop {
            match detection.observe(epoch, false) {
                Step::Retry(delay) => {
                    assert_eq!(delay, Duration::from_millis(1500));
                    retries += 1;
                }
                Step::GiveUp => break,
                other => panic!("unexpected step {:?}", other),
            }
        }

        assert_eq!(retries, 15);
        assert_eq!(detection.attempts(), 15);
        assert_eq!(detection.state(), DetectionState::GaveUp);
        assert_eq!(detection.observe(epoch, false), Step::Stale);
    }

    #[test]
    fn reset_invalidates_previous_epoch() {
        let mut detection = detection(15);
        let old = detection.reset();
        detection.observe(old, false);
        detection.observe(old, false);
        assert_eq!(detection.attempts(), 2);

        let new = detection.reset();
        assert_ne!(old, new);
        assert_eq!(detection.attempts(), 0);
        assert_eq!(detection.observe(old, true), Step::Stale);
        assert_eq!(detection.state(), DetectionState::Probing);
    }

    #[test]
    fn reset_revives_a_loop_that_gave_up() {
        let mut detection = detection(0);
        let epoch = detection.reset();
        assert_eq!(detection.observe(epoch, false), Step::GiveUp);

        let epoch = detection.reset();
        assert_eq!(detection.observe(epoch, true), Step::Proceed);
    }
}
