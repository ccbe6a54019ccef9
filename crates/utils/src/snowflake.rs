//! Twitter-snowflake-style monotonic id generator, used for `messagenum`,
//! `onum`, and queue ids wherever a process needs ids that sort by
//! creation order without a round-trip to the database.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const EPOCH_MILLIS: u64 = 1_700_000_000_000;
const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

pub struct SnowflakeIdGenerator {
    node_id: u64,
    state: AtomicU64,
}

impl SnowflakeIdGenerator {
    pub fn with_node_id(node_id: u64) -> Self {
        SnowflakeIdGenerator {
            node_id: node_id & ((1 << NODE_BITS) - 1),
            state: AtomicU64::new(0),
        }
    }

    pub fn generate(&self) -> u64 {
        let now = current_millis();
        loop {
            let previous = self.state.load(Ordering::Relaxed);
            let previous_millis = previous >> SEQUENCE_BITS;
            let (millis, sequence) = if now > previous_millis {
                (now, 0)
            } else {
                (previous_millis, (previous & SEQUENCE_MASK) + 1)
            };
            let millis = if sequence > SEQUENCE_MASK {
                millis + 1
            } else {
                millis
            };
            let sequence = sequence & SEQUENCE_MASK;
            let next = (millis << SEQUENCE_BITS) | sequence;
            if self
                .state
                .compare_exchange_weak(previous, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return ((millis - EPOCH_MILLIS) << (SEQUENCE_BITS + NODE_BITS))
                    | (self.node_id << SEQUENCE_BITS)
                    | sequence;
            }
        }
    }
}

impl Default for SnowflakeIdGenerator {
    fn default() -> Self {
        Self::with_node_id(0)
    }
}

impl Clone for SnowflakeIdGenerator {
    fn clone(&self) -> Self {
        SnowflakeIdGenerator {
            node_id: self.node_id,
            state: AtomicU64::new(self.state.load(Ordering::Relaxed)),
        }
    }
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(EPOCH_MILLIS)
        .max(EPOCH_MILLIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_monotonically_increasing_ids() {
        let gen = SnowflakeIdGenerator::with_node_id(1);
        let mut previous = 0;
        for _ in 0..1000 {
            let id = gen.generate();
            assert!(id > previous);
            previous = id;
        }
    }
}
