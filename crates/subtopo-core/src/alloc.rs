//! Placeholder ids for entities that have no real counterpart.

/// Hands out negative ids, starting at -1, to fictive buses and to computed buses
/// that are not electrical buses.
///
/// One allocator is owned by each run and passed down explicitly, so two runs over
/// the same input issue the same ids.
#[derive(Debug, Clone)]
pub struct FictiveIdAllocator {
    next: i64,
}

impl FictiveIdAllocator {
    pub fn new() -> Self {
        Self { next: -1 }
    }

    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next -= 1;
        id
    }

    /// Number of ids issued so far.
    pub fn issued(&self) -> usize {
        (-1 - self.next) as usize
    }
}

impl Default for FictiveIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_negative_and_decreasing() {
        let mut ids = FictiveIdAllocator::new();
        assert_eq!(ids.next_id(), -1);
        assert_eq!(ids.next_id(), -2);
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn test_independent_allocators_are_reproducible() {
        let mut a = FictiveIdAllocator::new();
        let mut b = FictiveIdAllocator::new();
        a.next_id();
        assert_eq!(b.next_id(), -1);
        assert_eq!(a.next_id(), -2);
    }
}
