use crate::FastMap;
use crate::error::TickListError;
use crate::pool::state::TickInfo;

/// Widest tick range a single search step may cover. A sparse region
/// longer than this is walked in windows of this size.
pub const TICK_SEARCH_DISTANCE: i32 = 480;

/// Sorted read-only view over a pool's initialized ticks, built per
/// swap from the sparse tick map.
#[derive(Debug)]
pub struct TickList<'a> {
    entries: Vec<&'a TickInfo>,
}

impl<'a> TickList<'a> {
    /// Collects the initialized entries of a tick map in ascending
    /// index order.
    pub fn new(ticks: &'a FastMap<i32, TickInfo>) -> Self {
        let mut entries: Vec<&TickInfo> = ticks.values().filter(|info| info.initialized).collect();
        entries.sort_unstable_by_key(|info| info.index);
        Self { entries }
    }

    /// Looks up the initialized tick at an exact index.
    pub fn tick(&self, index: i32) -> Result<&'a TickInfo, TickListError> {
        self.entries
            .binary_search_by_key(&index, |info| info.index)
            .map(|pos| self.entries[pos])
            .map_err(|_| TickListError::TickNotFound(index))
    }

    fn is_below_smallest(&self, tick: i32) -> bool {
        match self.entries.first() {
            Some(info) => tick < info.index,
            None => true,
        }
    }

    fn is_at_or_above_largest(&self, tick: i32) -> bool {
        match self.entries.last() {
            Some(info) => tick >= info.index,
            None => true,
        }
    }

    // position of the largest entry at or below `tick`; callers check
    // is_below_smallest first
    fn largest_at_or_below(&self, tick: i32) -> usize {
        match self.entries.binary_search_by_key(&tick, |info| info.index) {
            Ok(pos) => pos,
            Err(insert_at) => insert_at - 1,
        }
    }

    // position of the smallest entry strictly above `tick`; callers
    // check is_at_or_above_largest first
    fn smallest_above(&self, tick: i32) -> usize {
        match self.entries.binary_search_by_key(&tick, |info| info.index) {
            Ok(pos) => pos + 1,
            Err(insert_at) => insert_at,
        }
    }

    /// Finds the next initialized tick from `tick` in the swap
    /// direction, looking at most `distance` ticks ahead.
    ///
    /// Returns `(next_tick, true)` when an initialized tick lies within
    /// the window (for the decreasing direction `tick` itself counts),
    /// and `(window_boundary, false)` when the nearest one is further
    /// out, so the caller advances through the gap without crossing.
    /// Fails with `OutOfSearchRange` once the direction is exhausted:
    /// below the smallest known tick going down, or at or above the
    /// largest going up.
    pub fn next_initialized_within_distance(
        &self,
        tick: i32,
        zero_for_one: bool,
        distance: i32,
    ) -> Result<(i32, bool), TickListError> {
        if zero_for_one {
            if self.is_below_smallest(tick) {
                return Err(TickListError::OutOfSearchRange);
            }
            let index = self.entries[self.largest_at_or_below(tick)].index;
            let next = index.max(tick - distance);
            Ok((next, next == index))
        } else {
            if self.is_at_or_above_largest(tick) {
                return Err(TickListError::OutOfSearchRange);
            }
            let index = self.entries[self.smallest_above(tick)].index;
            let next = index.min(tick + distance);
            Ok((next, next == index))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(index: i32, net: i128) -> TickInfo {
        TickInfo {
            index,
            liquidity_gross: net.unsigned_abs(),
            liquidity_net: net,
            ..TickInfo::new(index)
        }
    }

    fn map_of(ticks: &[TickInfo]) -> FastMap<i32, TickInfo> {
        let mut map = FastMap::default();
        for info in ticks {
            let mut info = info.clone();
            info.initialized = true;
            map.insert(info.index, info);
        }
        map
    }

    // --- construction ------------------------------------------------------------

    #[test]
    fn list_sorts_entries_from_an_unordered_map() {
        let map = map_of(&[tick(300, 1), tick(-500, 2), tick(0, 3)]);
        let list = TickList::new(&map);

        assert_eq!(list.tick(-500).unwrap().liquidity_net, 2);
        assert_eq!(list.tick(0).unwrap().liquidity_net, 3);
        assert_eq!(list.tick(300).unwrap().liquidity_net, 1);
    }

    #[test]
    fn uninitialized_entries_are_invisible() {
        let mut map = map_of(&[tick(0, 5)]);
        map.insert(100, TickInfo::new(100)); // initialized: false

        let list = TickList::new(&map);
        assert!(matches!(
            list.tick(100),
            Err(TickListError::TickNotFound(100))
        ));
        let err = list
            .next_initialized_within_distance(0, false, TICK_SEARCH_DISTANCE)
            .unwrap_err();
        assert!(matches!(err, TickListError::OutOfSearchRange));
    }

    #[test]
    fn missing_tick_reports_its_index() {
        let map = map_of(&[tick(60, 1)]);
        let list = TickList::new(&map);

        assert!(matches!(list.tick(61), Err(TickListError::TickNotFound(61))));
    }

    // --- directional search ------------------------------------------------------

    #[test]
    fn search_down_finds_the_tick_within_the_window() {
        let map = map_of(&[tick(-120, 1), tick(240, -1)]);
        let list = TickList::new(&map);

        let (next, initialized) = list
            .next_initialized_within_distance(0, true, TICK_SEARCH_DISTANCE)
            .unwrap();
        assert_eq!(next, -120);
        assert!(initialized);
    }

    #[test]
    fn search_down_includes_the_current_tick() {
        let map = map_of(&[tick(-120, 1), tick(240, -1)]);
        let list = TickList::new(&map);

        let (next, initialized) = list
            .next_initialized_within_distance(-120, true, TICK_SEARCH_DISTANCE)
            .unwrap();
        assert_eq!(next, -120);
        assert!(initialized);
    }

    #[test]
    fn search_up_is_strictly_ahead() {
        let map = map_of(&[tick(-120, 1), tick(240, -1)]);
        let list = TickList::new(&map);

        let (next, initialized) = list
            .next_initialized_within_distance(-120, false, TICK_SEARCH_DISTANCE)
            .unwrap();
        assert_eq!(next, 240);
        assert!(initialized);
    }

    #[test]
    fn wide_gaps_return_the_window_boundary_uninitialized() {
        let map = map_of(&[tick(-5000, 1), tick(5000, -1)]);
        let list = TickList::new(&map);

        let (next, initialized) = list
            .next_initialized_within_distance(0, true, TICK_SEARCH_DISTANCE)
            .unwrap();
        assert_eq!(next, -TICK_SEARCH_DISTANCE);
        assert!(!initialized);

        let (next, initialized) = list
            .next_initialized_within_distance(0, false, TICK_SEARCH_DISTANCE)
            .unwrap();
        assert_eq!(next, TICK_SEARCH_DISTANCE);
        assert!(!initialized);
    }

    #[test]
    fn tick_exactly_at_the_window_edge_counts_as_found() {
        let map = map_of(&[tick(-TICK_SEARCH_DISTANCE, 1), tick(TICK_SEARCH_DISTANCE, -1)]);
        let list = TickList::new(&map);

        let (next, initialized) = list
            .next_initialized_within_distance(0, true, TICK_SEARCH_DISTANCE)
            .unwrap();
        assert_eq!(next, -TICK_SEARCH_DISTANCE);
        assert!(initialized);

        let (next, initialized) = list
            .next_initialized_within_distance(0, false, TICK_SEARCH_DISTANCE)
            .unwrap();
        assert_eq!(next, TICK_SEARCH_DISTANCE);
        assert!(initialized);
    }

    // --- exhaustion --------------------------------------------------------------

    #[test]
    fn search_fails_once_the_direction_is_exhausted() {
        let map = map_of(&[tick(-500, 1), tick(500, -1)]);
        let list = TickList::new(&map);

        // below the smallest going down
        let err = list
            .next_initialized_within_distance(-501, true, TICK_SEARCH_DISTANCE)
            .unwrap_err();
        assert!(matches!(err, TickListError::OutOfSearchRange));

        // at the largest going up
        let err = list
            .next_initialized_within_distance(500, false, TICK_SEARCH_DISTANCE)
            .unwrap_err();
        assert!(matches!(err, TickListError::OutOfSearchRange));

        // the smallest itself is still reachable going down
        let (next, initialized) = list
            .next_initialized_within_distance(-500, true, TICK_SEARCH_DISTANCE)
            .unwrap();
        assert_eq!(next, -500);
        assert!(initialized);
    }

    #[test]
    fn empty_list_is_exhausted_in_both_directions() {
        let map = FastMap::default();
        let list = TickList::new(&map);

        for zero_for_one in [true, false] {
            let err = list
                .next_initialized_within_distance(0, zero_for_one, TICK_SEARCH_DISTANCE)
                .unwrap_err();
            assert!(matches!(err, TickListError::OutOfSearchRange));
        }
    }
}
