//! Ordering policy: the limits and windows the lifecycle engine enforces.

use chrono::Duration;

/// Configuration value object handed to the engine at construction time.
///
/// Replaces what used to be scattered global constants, so tests and
/// deployments can vary the limits without recompiling.
#[derive(Debug, Clone)]
pub struct OrderPolicy {
    /// Smallest quantity a single order may reserve.
    pub min_quantity: i32,
    /// Largest quantity a single order may reserve.
    pub max_quantity: i32,
    /// Minutes after the pickup time at which an order expires.
    pub expiry_window_minutes: i64,
    /// Pickup offset applied when a request gives no pickup time.
    pub default_pickup_minutes: i64,
    /// Largest pickup offset a request may ask for.
    pub max_pickup_minutes: i64,
    /// Page size used when a listing request gives none.
    pub default_page_size: i64,
    /// Hard ceiling on the page size of a listing request.
    pub max_page_size: i64,
}

impl OrderPolicy {
    /// Returns true if `quantity` is within the allowed range.
    pub fn quantity_in_range(&self, quantity: i32) -> bool {
        quantity >= self.min_quantity && quantity <= self.max_quantity
    }

    /// The expiry window as a duration.
    pub fn expiry_window(&self) -> Duration {
        Duration::minutes(self.expiry_window_minutes)
    }

    /// Clamps a requested page size into `[1, max_page_size]`, falling back
    /// to the default when absent.
    pub fn clamp_page_size(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            min_quantity: 1,
            max_quantity: 20,
            expiry_window_minutes: 15,
            default_pickup_minutes: 30,
            max_pickup_minutes: 120,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let policy = OrderPolicy::default();
        assert_eq!(policy.min_quantity, 1);
        assert_eq!(policy.max_quantity, 20);
        assert_eq!(policy.expiry_window_minutes, 15);
        assert_eq!(policy.default_pickup_minutes, 30);
        assert_eq!(policy.max_pickup_minutes, 120);
    }

    #[test]
    fn test_quantity_range_boundaries() {
        let policy = OrderPolicy::default();
        assert!(!policy.quantity_in_range(0));
        assert!(policy.quantity_in_range(1));
        assert!(policy.quantity_in_range(20));
        assert!(!policy.quantity_in_range(21));
    }

    #[test]
    fn test_clamp_page_size() {
        let policy = OrderPolicy::default();
        assert_eq!(policy.clamp_page_size(None), 20);
        assert_eq!(policy.clamp_page_size(Some(50)), 50);
        assert_eq!(policy.clamp_page_size(Some(0)), 1);
        assert_eq!(policy.clamp_page_size(Some(500)), 100);
    }
}
