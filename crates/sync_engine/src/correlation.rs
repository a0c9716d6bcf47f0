//! Master-to-follower timeline mapping.

use contracts::CorrelationTimestamp;

/// Maps master-timeline readings onto the follower timeline
///
/// Holds nothing but the current correlation pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationTransform {
    correlation: CorrelationTimestamp,
}

impl CorrelationTransform {
    pub fn new(correlation: CorrelationTimestamp) -> Self {
        Self { correlation }
    }

    pub fn correlation(&self) -> CorrelationTimestamp {
        self.correlation
    }

    /// Replace the correlation pair
    pub fn recalibrate(&mut self, correlation: CorrelationTimestamp) {
        self.correlation = correlation;
    }

    /// Follower-timeline instant equivalent to `master_reading`
    #[inline]
    pub fn target_time(&self, master_reading: f64) -> f64 {
        master_reading + self.correlation.offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_time_applies_offset() {
        let transform = CorrelationTransform::new(CorrelationTimestamp::new(1000.0, 500.0));
        assert_eq!(transform.target_time(2000.0), 1500.0);
    }

    #[test]
    fn test_identity_correlation() {
        let transform = CorrelationTransform::new(CorrelationTimestamp::new(3.0, 3.0));
        assert_eq!(transform.target_time(12.5), 12.5);
    }

    #[test]
    fn test_recalibrate_replaces_offset() {
        let mut transform = CorrelationTransform::new(CorrelationTimestamp::new(0.0, 0.0));
        transform.recalibrate(CorrelationTimestamp::new(10.0, 4.0));
        assert_eq!(transform.target_time(10.0), 4.0);
        assert_eq!(
            transform.correlation(),
            CorrelationTimestamp::new(10.0, 4.0)
        );
    }

    #[test]
    fn test_nan_reading_propagates() {
        let transform = CorrelationTransform::new(CorrelationTimestamp::new(1.0, 2.0));
        assert!(transform.target_time(f64::NAN).is_nan());
    }
}
