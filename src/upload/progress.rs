//! Upload progress reporting

/// Callback invoked after every accepted chunk with the percentage done
pub type ProgressFn = dyn Fn(u8) + Send + Sync;

/// `floor(min(total, offset) / total * 100)`; zero for an empty total
pub fn percent_done(offset: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let acknowledged = u128::from(offset.min(total));
    (acknowledged * 100 / u128::from(total)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_floors() {
        assert_eq!(percent_done(0, 300), 0);
        assert_eq!(percent_done(1, 300), 0);
        assert_eq!(percent_done(100, 300), 33);
        assert_eq!(percent_done(299, 300), 99);
        assert_eq!(percent_done(300, 300), 100);
    }

    #[test]
    fn test_percent_clamps_overshoot() {
        assert_eq!(percent_done(500, 300), 100);
    }

    #[test]
    fn test_percent_large_sizes() {
        assert_eq!(percent_done(u64::MAX / 2, u64::MAX), 49);
    }
}
