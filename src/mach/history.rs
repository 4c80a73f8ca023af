use std::collections::HashMap;
use std::sync::RwLock;

/// ## History ring
///
/// A fixed ring of per-tick slot maps. Each tick owns the cell at
/// `tick % len`; `begin_tick` must clear that cell before any worker
/// evaluates the tick. Workers running a round of consecutive ticks
/// touch disjoint cells, so a read lock suffices for lookback and a
/// write lock for the owning tick.
///
/// A whole round of `workers` cells is cleared before the round runs,
/// so lookback may never reach a cell the current round has begun:
/// `old` treats anything past `len - workers` as out of range, and the
/// ring is sized with `workers` cells of slack beyond the requested
/// lookback window.
#[derive(Debug)]
pub struct History {
    cells: Vec<RwLock<HashMap<u64, f64>>>,
    workers: usize,
}

fn read_cell(cell: &RwLock<HashMap<u64, f64>>) -> std::sync::RwLockReadGuard<'_, HashMap<u64, f64>> {
    match cell.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_cell(cell: &RwLock<HashMap<u64, f64>>) -> std::sync::RwLockWriteGuard<'_, HashMap<u64, f64>> {
    match cell.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl History {
    pub fn new(len: usize, workers: usize) -> History {
        let workers = workers.max(1);
        let len = len.max(workers * 2);
        let mut cells = Vec::with_capacity(len);
        for _ in 0..len {
            cells.push(RwLock::new(HashMap::new()));
        }
        History { cells, workers }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    fn cell(&self, tick: u64) -> &RwLock<HashMap<u64, f64>> {
        &self.cells[(tick % self.cells.len() as u64) as usize]
    }

    /// Claim the ring cell for a new tick, dropping whatever the
    /// previous lap left there and seeding the declared control inputs.
    pub fn begin_tick(&self, tick: u64, controls: &[(u64, f64)]) {
        let mut cell = write_cell(self.cell(tick));
        cell.clear();
        for (addr, value) in controls {
            cell.insert(*addr, *value);
        }
    }

    /// Value stored at `addr` during the current tick, if any.
    pub fn peek(&self, tick: u64, addr: u64) -> Option<f64> {
        read_cell(self.cell(tick)).get(&addr).copied()
    }

    /// Store a value for the current tick. False if the slot was
    /// already written this tick.
    pub fn poke(&self, tick: u64, addr: u64, value: f64) -> bool {
        let mut cell = write_cell(self.cell(tick));
        if cell.contains_key(&addr) {
            return false;
        }
        cell.insert(addr, value);
        true
    }

    /// Value stored at `addr` during the tick `n` back. Unset slots,
    /// lookback before tick zero, and lookback past the retained window
    /// all read as zero. The window ends `workers` cells short of the
    /// ring length; those cells belong to the round in flight.
    pub fn old(&self, tick: u64, addr: u64, n: i64) -> f64 {
        if n < 0 || n as u64 > tick || n as usize > self.cells.len() - self.workers {
            return 0.0;
        }
        self.peek(tick - n as u64, addr).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::History;

    #[test]
    fn test_poke_peek() {
        let h = History::new(4, 1);
        h.begin_tick(0, &[]);
        assert_eq!(h.peek(0, 1000), None);
        assert!(h.poke(0, 1000, 7.5));
        assert_eq!(h.peek(0, 1000), Some(7.5));
    }

    #[test]
    fn test_double_poke_rejected() {
        let h = History::new(4, 1);
        h.begin_tick(0, &[]);
        assert!(h.poke(0, 1000, 1.0));
        assert!(!h.poke(0, 1000, 2.0));
        assert_eq!(h.peek(0, 1000), Some(1.0));
    }

    #[test]
    fn test_controls_seed_the_tick() {
        let h = History::new(4, 1);
        h.begin_tick(0, &[(1000, 0.25), (1001, 3.0)]);
        assert_eq!(h.peek(0, 1000), Some(0.25));
        assert_eq!(h.peek(0, 1001), Some(3.0));
        // seeded slots count as written
        assert!(!h.poke(0, 1000, 9.0));
    }

    #[test]
    fn test_old_lookback() {
        let h = History::new(4, 1);
        for tick in 0..3 {
            h.begin_tick(tick, &[]);
            h.poke(tick, 1000, tick as f64 + 1.0);
        }
        assert_eq!(h.old(2, 1000, 0), 3.0);
        assert_eq!(h.old(2, 1000, 1), 2.0);
        assert_eq!(h.old(2, 1000, 2), 1.0);
        // before the first tick
        assert_eq!(h.old(2, 1000, 3), 0.0);
        assert_eq!(h.old(2, 1000, -1), 0.0);
    }

    #[test]
    fn test_old_beyond_ring_is_zero() {
        let h = History::new(2, 1);
        for tick in 0..5 {
            h.begin_tick(tick, &[]);
            h.poke(tick, 1000, tick as f64);
        }
        assert_eq!(h.old(4, 1000, 1), 3.0);
        assert_eq!(h.old(4, 1000, 2), 0.0);
    }

    #[test]
    fn test_old_stops_short_of_the_round_in_flight() {
        let h = History::new(8, 4);
        for tick in 0..8 {
            h.begin_tick(tick, &[]);
            h.poke(tick, 1000, tick as f64);
        }
        // the last 4 cells of the window belong to the running round
        assert_eq!(h.old(7, 1000, 4), 3.0);
        assert_eq!(h.old(7, 1000, 5), 0.0);
    }

    #[test]
    fn test_begin_tick_clears_previous_lap() {
        let h = History::new(2, 1);
        h.begin_tick(0, &[]);
        h.poke(0, 1000, 42.0);
        h.begin_tick(2, &[]);
        assert_eq!(h.peek(2, 1000), None);
    }
}
