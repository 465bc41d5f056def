use snowflake::SnowflakeIdGenerator;
use std::sync::Mutex;

static ID_GENERATOR: Mutex<Option<SnowflakeIdGenerator>> = Mutex::new(None);

/// Width every id is zero-padded to, so that lexicographic order of the
/// string keys matches generation order.
const KEY_WIDTH: usize = 19;

/// Initialises the generator with an explicit machine/node pair (0-31 each).
/// Calling [`next_id`] first falls back to `(1, 1)`.
///
/// Re-initialising with the pair already in use keeps the running generator,
/// so its sequence is not reset within the current millisecond.
pub fn init(machine_id: i32, node_id: i32) {
    let mut gen = ID_GENERATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let same = gen
        .as_ref()
        .is_some_and(|g| g.machine_id == machine_id && g.node_id == node_id);
    if !same {
        *gen = Some(SnowflakeIdGenerator::new(machine_id, node_id));
    }
}

/// Returns a new time-ordered key, used for notification push keys.
///
/// Keys generated by one process sort in creation order, both numerically
/// and as strings.
pub fn next_id() -> String {
    let mut gen = ID_GENERATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let generator = gen.get_or_insert_with(|| SnowflakeIdGenerator::new(1, 1));
    format!("{:0width$}", generator.real_time_generate(), width = KEY_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn next_id_returns_unique_ids() {
        init(1, 1);
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = next_id();
            assert!(ids.insert(id), "Duplicate ID generated");
        }
    }

    #[test]
    fn next_id_sorts_in_generation_order() {
        let ids: Vec<String> = (0..5000).map(|_| next_id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert!(ids.iter().all(|id| id.len() == KEY_WIDTH));
    }

    #[test]
    fn reinit_with_same_pair_keeps_ordering() {
        init(1, 1);
        let first = next_id();
        init(1, 1);
        let second = next_id();
        assert!(second > first);
    }
}
