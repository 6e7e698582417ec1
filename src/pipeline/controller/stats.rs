use std::collections::HashMap;

use super::notice::Notice;

/// Counters kept by the detection controller.
#[derive(Debug, Clone, Default)]
pub struct ControllerStats {
    pub cycles_started: u64,
    pub frames_in_last_window: usize,
    pub actuations: u64,
    pub device_failures: u64,
    notices: HashMap<Notice, u64>,
}

impl ControllerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_notice(&mut self, notice: Notice) {
        *self.notices.entry(notice).or_insert(0) += 1;
    }

    pub fn notices(&self, notice: Notice) -> u64 {
        self.notices.get(&notice).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_are_counted_per_kind() {
        let mut stats = ControllerStats::new();
        stats.record_notice(Notice::NoColor);
        stats.record_notice(Notice::NoColor);
        stats.record_notice(Notice::NoObject);
        assert_eq!(stats.notices(Notice::NoColor), 2);
        assert_eq!(stats.notices(Notice::NoObject), 1);
        assert_eq!(stats.notices(Notice::NoDominantColor), 0);
    }
}
