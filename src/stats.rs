//! Aggregate counters kept alongside the device, mirroring the
//! `struct statistics` the device this model is based on tracks for its
//! debug/telemetry output.

#[derive(Debug, Default, Clone, Copy)]
pub struct Statistics {
    pub access_cnt: u64,
    pub cmt_hit_cnt: u64,
    pub cmt_miss_cnt: u64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit_ratio(&self) -> f64 {
        if self.access_cnt == 0 {
            0.0
        } else {
            self.cmt_hit_cnt as f64 / self.access_cnt as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_ratio_is_zero_with_no_accesses() {
        let st = Statistics::new();
        assert_eq!(st.hit_ratio(), 0.0);
    }

    #[test]
    fn hit_ratio_divides_hits_by_total_accesses() {
        let st = Statistics {
            access_cnt: 4,
            cmt_hit_cnt: 3,
            cmt_miss_cnt: 1,
        };
        assert_eq!(st.hit_ratio(), 0.75);
    }
}
