// Per-role coordinate stores shared with the renderer.

use crate::domain::{Coords, CoordsMap, CoordsRole, EntityId, RawCoords, UnitConverter};
use crate::use_cases::observable::Observable;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

/// Current position of every tracked entity, one observable map per role.
#[derive(Debug)]
pub struct CoordinateStore {
    converter: UnitConverter,
    player_start: Observable<CoordsMap>,
    player_current: Observable<CoordsMap>,
    enemy_current: Observable<CoordsMap>,
}

impl CoordinateStore {
    pub fn new(converter: UnitConverter) -> Self {
        Self {
            converter,
            player_start: Observable::default(),
            player_current: Observable::default(),
            enemy_current: Observable::default(),
        }
    }

    pub fn converter(&self) -> UnitConverter {
        self.converter
    }

    fn store(&self, role: CoordsRole) -> &Observable<CoordsMap> {
        match role {
            CoordsRole::PlayerStart => &self.player_start,
            CoordsRole::PlayerCurrent => &self.player_current,
            CoordsRole::EnemyCurrent => &self.enemy_current,
        }
    }

    /// Normalizes `coords` and replaces the entry for `key`, keeping every
    /// other entry. Returns the value that was stored.
    pub fn set_coords(&mut self, role: CoordsRole, key: EntityId, coords: Coords) -> Coords {
        let coords = self.converter.normalize(coords);
        self.store(role).update(|map| {
            map.insert(key, coords);
        });
        trace!(?role, key, x = coords.x, y = coords.y, "coords set");
        coords
    }

    pub fn set_raw(&mut self, role: CoordsRole, key: EntityId, raw: RawCoords) -> Coords {
        let coords = self.converter.to_render_space(raw);
        self.set_coords(role, key, coords)
    }

    pub fn get_coords(&self, role: CoordsRole, key: EntityId) -> Option<Coords> {
        self.store(role).get().get(&key).copied()
    }

    pub fn remove(&mut self, role: CoordsRole, key: EntityId) -> Option<Coords> {
        if !self.store(role).get().contains_key(&key) {
            return None;
        }
        self.store(role).update(|map| map.remove(&key))
    }

    pub fn snapshot(&self, role: CoordsRole) -> Arc<CoordsMap> {
        self.store(role).get()
    }

    pub fn subscribe(&self, role: CoordsRole) -> watch::Receiver<Arc<CoordsMap>> {
        self.store(role).subscribe()
    }

    /// Empties every role, e.g. when switching sessions.
    pub fn clear(&mut self) {
        for role in CoordsRole::ALL {
            self.store(role).set(CoordsMap::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CoordinateStore {
        CoordinateStore::new(UnitConverter::default())
    }

    #[test]
    fn writes_on_distinct_keys_merge() {
        let mut coords = store();
        let writes = [
            (1, Coords::new(1.0, 1.0)),
            (2, Coords::new(2.0, 2.0)),
            (1, Coords::new(-3.0, 4.0)),
            (3, Coords::new(0.0, -9.5)),
            (2, Coords::new(5.0, 5.0)),
        ];
        for (key, value) in writes {
            coords.set_coords(CoordsRole::EnemyCurrent, key, value);
        }

        let snapshot = coords.snapshot(CoordsRole::EnemyCurrent);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[&1], Coords::new(-3.0, 4.0));
        assert_eq!(snapshot[&2], Coords::new(5.0, 5.0));
        assert_eq!(snapshot[&3], Coords::new(0.0, -9.5));
    }

    #[test]
    fn raw_values_are_normalized_on_write() {
        let mut coords = store();
        let stored = coords.set_coords(CoordsRole::PlayerCurrent, 7, Coords::new(52_000.0, 3_000.0));

        assert_eq!(stored, Coords::new(2.0, -47.0));
        assert_eq!(coords.get_coords(CoordsRole::PlayerCurrent, 7), Some(stored));
    }

    #[test]
    fn roles_are_isolated() {
        let mut coords = store();
        coords.set_raw(CoordsRole::PlayerStart, 1, RawCoords::new(50_000, 50_000));

        assert_eq!(coords.get_coords(CoordsRole::PlayerStart, 1), Some(Coords::new(0.0, 0.0)));
        assert_eq!(coords.get_coords(CoordsRole::PlayerCurrent, 1), None);
        assert_eq!(coords.get_coords(CoordsRole::EnemyCurrent, 1), None);
    }

    #[test]
    fn every_write_notifies_subscribers() {
        let mut coords = store();
        let mut rx = coords.subscribe(CoordsRole::EnemyCurrent);

        coords.set_coords(CoordsRole::EnemyCurrent, 4, Coords::new(1.0, 2.0));
        assert!(rx.has_changed().expect("store alive"));
        assert_eq!(rx.borrow_and_update().len(), 1);

        coords.remove(CoordsRole::EnemyCurrent, 4);
        assert!(rx.has_changed().expect("store alive"));
        assert!(rx.borrow_and_update().is_empty());
    }

    #[test]
    fn removing_missing_key_does_not_notify() {
        let mut coords = store();
        let rx = coords.subscribe(CoordsRole::PlayerStart);

        assert_eq!(coords.remove(CoordsRole::PlayerStart, 9), None);
        assert!(!rx.has_changed().expect("store alive"));
    }
}
