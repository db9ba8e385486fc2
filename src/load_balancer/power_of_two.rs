//! Power-of-two-choices load balancing strategy.

use rand::Rng;

use crate::load_balancer::{LoadBalancer, PoolMember};

/// Samples two distinct candidates and keeps the one with fewer in-flight
/// requests. Ties go to the candidate earlier in stable order.
#[derive(Debug, Default)]
pub struct PowerOfTwoChoices;

impl PowerOfTwoChoices {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for PowerOfTwoChoices {
    fn pick<'a>(&self, candidates: &'a [PoolMember]) -> Option<&'a PoolMember> {
        match candidates.len() {
            0 => None,
            1 => candidates.first(),
            len => {
                let mut rng = rand::thread_rng();
                let first = rng.gen_range(0..len);
                // Second index drawn from the remaining len - 1 slots.
                let mut second = rng.gen_range(0..len - 1);
                if second >= first {
                    second += 1;
                }
                let (lo, hi) = if first < second { (first, second) } else { (second, first) };
                let (a, b) = (&candidates[lo], &candidates[hi]);
                if b.state.current_requests() < a.state.current_requests() {
                    Some(b)
                } else {
                    Some(a)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_support::member;

    #[test]
    fn test_two_candidates_picks_less_loaded() {
        let lb = PowerOfTwoChoices::new();
        let busy = member("busy", 8080);
        let idle = member("idle", 8081);
        for _ in 0..3 {
            busy.state.begin_request();
        }
        let candidates = vec![busy, idle];
        for _ in 0..50 {
            assert_eq!(lb.pick(&candidates).unwrap().endpoint.endpoint_id, "idle");
        }
    }

    #[test]
    fn test_never_picks_most_loaded_of_three() {
        let lb = PowerOfTwoChoices::new();
        let candidates = vec![member("a", 8080), member("b", 8081), member("c", 8082)];
        for _ in 0..10 {
            candidates[2].state.begin_request();
        }
        for _ in 0..200 {
            assert_ne!(lb.pick(&candidates).unwrap().endpoint.endpoint_id, "c");
        }
    }

    #[test]
    fn test_single_and_empty() {
        let lb = PowerOfTwoChoices::new();
        let candidates = vec![member("only", 8080)];
        assert_eq!(lb.pick(&candidates).unwrap().endpoint.endpoint_id, "only");
        assert!(lb.pick(&[]).is_none());
    }
}
