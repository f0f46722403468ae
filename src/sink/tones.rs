use crate::core::Severity;
use std::time::Duration;

/// One segment of an alert tone; a frequency of 0 is silence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSegment {
    pub freq_hz: u32,
    pub duration_ms: u32,
}

const fn seg(freq_hz: u32, duration_ms: u32) -> ToneSegment {
    ToneSegment { freq_hz, duration_ms }
}

/// Two-tone pager beep
const STANDARD: &[ToneSegment] = &[seg(800, 300), seg(1000, 300)];

/// Warbling alarm
const URGENT: &[ToneSegment] = &[seg(800, 200), seg(1200, 200), seg(800, 200), seg(1200, 200), seg(800, 200)];

/// Siren
const EMERGENCY: &[ToneSegment] = &[
    seg(600, 150),
    seg(1200, 150),
    seg(600, 150),
    seg(1200, 150),
    seg(600, 150),
    seg(1200, 150),
];

/// Alert tone cue played alongside an alert
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertTone {
    pub severity: Severity,
    pub segments: &'static [ToneSegment],
}

impl AlertTone {
    pub fn for_severity(severity: Severity) -> Self {
        let segments = match severity {
            Severity::Standard => STANDARD,
            Severity::Urgent => URGENT,
            Severity::Emergency => EMERGENCY,
        };
        Self { severity, segments }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.segments.iter().map(|s| s.duration_ms as u64).sum())
    }

    pub fn name(&self) -> &'static str {
        match self.severity {
            Severity::Standard => "pager beep",
            Severity::Urgent => "warble",
            Severity::Emergency => "siren",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_durations() {
        assert_eq!(AlertTone::for_severity(Severity::Standard).duration(), Duration::from_millis(600));
        assert_eq!(AlertTone::for_severity(Severity::Urgent).duration(), Duration::from_millis(1000));
        assert_eq!(AlertTone::for_severity(Severity::Emergency).duration(), Duration::from_millis(900));
    }

    #[test]
    fn test_siren_alternates() {
        let tone = AlertTone::for_severity(Severity::Emergency);
        for pair in tone.segments.windows(2) {
            assert_ne!(pair[0].freq_hz, pair[1].freq_hz);
        }
    }
}
