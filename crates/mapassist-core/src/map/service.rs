//! Per-game cache of area geometry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::game::{Area, Difficulty};
use crate::map::client::GeometrySource;
use crate::map::geometry::AreaGeometry;
use crate::map::protocol::GeometryRequest;

type Cache = Mutex<HashMap<Area, Arc<AreaGeometry>>>;

/// State shared with prefetch workers.
struct Shared {
    seed: u32,
    difficulty: Difficulty,
    source: Arc<dyn GeometrySource>,
    cache: Cache,
    /// Bumped by `clear`; workers drop results fetched under an older value.
    generation: AtomicU64,
}

impl Shared {
    fn cache(&self) -> MutexGuard<'_, HashMap<Area, Arc<AreaGeometry>>> {
        // a panicking worker must not take the cache down with it
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cached(&self, area: Area) -> Option<Arc<AreaGeometry>> {
        self.cache().get(&area).cloned()
    }

    fn fetch(&self, area: Area) -> Option<AreaGeometry> {
        let request = GeometryRequest::new(self.seed, self.difficulty.as_u32(), area.id());
        match self.source.fetch(request) {
            Ok(Some(json)) => match AreaGeometry::from_json(area, &json) {
                Ok(geometry) => Some(geometry),
                Err(e) => {
                    warn!("Invalid geometry for {}: {}", area, e);
                    None
                }
            },
            Ok(None) => {
                warn!("Unable to load data for {} from geometry server", area);
                None
            }
            Err(e) => {
                warn!("Geometry request for {} failed: {}", area, e);
                None
            }
        }
    }

    /// Store unless the cache was cleared since `generation` was read.
    fn store(&self, generation: u64, geometry: AreaGeometry) -> Arc<AreaGeometry> {
        let geometry = Arc::new(geometry);
        let mut cache = self.cache();
        if self.generation.load(Ordering::SeqCst) == generation {
            cache.insert(geometry.area, Arc::clone(&geometry));
        }
        geometry
    }
}

/// Area geometry for one `(seed, difficulty)`.
///
/// Misses block the caller only; failed fetches are not cached, so the next
/// lookup asks the server again. A new game needs a new service.
pub struct AreaDataService {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AreaDataService {
    pub fn new(source: Arc<dyn GeometrySource>, seed: u32, difficulty: Difficulty) -> Self {
        Self {
            shared: Arc::new(Shared {
                seed,
                difficulty,
                source,
                cache: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Create a service and start fetching `areas` in the background.
    pub fn with_prefetch(
        source: Arc<dyn GeometrySource>,
        seed: u32,
        difficulty: Difficulty,
        areas: &[Area],
    ) -> Self {
        let service = Self::new(source, seed, difficulty);
        service.prefetch(areas.to_vec());
        service
    }

    pub fn seed(&self) -> u32 {
        self.shared.seed
    }

    pub fn difficulty(&self) -> Difficulty {
        self.shared.difficulty
    }

    /// Whether this service serves the given game.
    pub fn serves(&self, seed: u32, difficulty: Difficulty) -> bool {
        self.shared.seed == seed && self.shared.difficulty == difficulty
    }

    pub fn is_cached(&self, area: Area) -> bool {
        self.shared.cache().contains_key(&area)
    }

    pub fn cached_areas(&self) -> Vec<Area> {
        let mut areas: Vec<Area> = self.shared.cache().keys().copied().collect();
        areas.sort();
        areas
    }

    /// Geometry for `area`, fetching it on a miss.
    pub fn get_area(&self, area: Area) -> Option<Arc<AreaGeometry>> {
        debug!(
            "Requesting seed {} area {} difficulty {}",
            self.shared.seed, area, self.shared.difficulty
        );
        if let Some(hit) = self.shared.cached(area) {
            debug!("Cache found on {}", area);
            return Some(hit);
        }

        info!("Cache miss on {}", area);
        let generation = self.shared.generation.load(Ordering::SeqCst);
        let geometry = self.shared.store(generation, self.shared.fetch(area)?);

        let adjacent: Vec<Area> = geometry.adjacent_areas().collect();
        if adjacent.is_empty() {
            debug!("No adjacent areas to {}", area);
        } else {
            debug!("Prefetching areas adjacent to {}", area);
            self.prefetch(adjacent);
        }
        Some(geometry)
    }

    /// Fetch `areas` on a worker thread, skipping cached ones.
    pub fn prefetch(&self, areas: Vec<Area>) {
        let areas: Vec<Area> = areas
            .into_iter()
            .filter(|area| area.is_valid() && !self.is_cached(*area))
            .collect();
        if areas.is_empty() {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let generation = shared.generation.load(Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name("area-prefetch".to_string())
            .spawn(move || {
                for area in areas {
                    if shared.generation.load(Ordering::SeqCst) != generation {
                        debug!("Prefetch cancelled");
                        return;
                    }
                    if shared.cached(area).is_some() {
                        continue;
                    }
                    if let Some(geometry) = shared.fetch(area) {
                        shared.store(generation, geometry);
                        debug!("Prefetched {}", area);
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
                workers.retain(|w| !w.is_finished());
                workers.push(handle);
            }
            Err(e) => warn!("Failed to start prefetch worker: {}", e),
        }
    }

    /// Block until every prefetch worker started so far has finished.
    pub fn wait_for_prefetch(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
            workers.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Drop everything cached and orphan in-flight prefetches.
    pub fn clear(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.cache().clear();
    }
}

impl Drop for AreaDataService {
    fn drop(&mut self) {
        // running workers see the bump and stop after their current request
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::error::{Error, Result};

    /// In-memory geometry server keyed by area id.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub(crate) replies: Mutex<HashMap<u32, Option<String>>>,
        pub(crate) requests: Mutex<Vec<GeometryRequest>>,
    }

    impl FakeSource {
        pub(crate) fn with(mut self, area: u32, json: &str) -> Self {
            self.replies
                .get_mut()
                .unwrap()
                .insert(area, Some(json.to_string()));
            self
        }

        pub(crate) fn count(&self, area: u32) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.area == area)
                .count()
        }
    }

    impl GeometrySource for FakeSource {
        fn fetch(&self, request: GeometryRequest) -> Result<Option<String>> {
            self.requests.lock().unwrap().push(request);
            match self.replies.lock().unwrap().get(&request.area) {
                Some(reply) => Ok(reply.clone()),
                None => Err(Error::CollaboratorProtocol("unknown area".to_string())),
            }
        }
    }

    pub(crate) fn area_json(adjacent: &[u32]) -> String {
        let levels: Vec<String> = adjacent
            .iter()
            .map(|id| format!(r#""{}": {{"exits": [{{"x": 10, "y": 10}}]}}"#, id))
            .collect();
        format!(
            r#"{{"levelOrigin": {{"x": 0, "y": 0}}, "mapRows": [[1, 2]], "adjacentLevels": {{{}}}}}"#,
            levels.join(",")
        )
    }

    #[test]
    fn test_hit_after_miss() {
        let source = Arc::new(FakeSource::default().with(2, &area_json(&[])));
        let service = AreaDataService::new(source.clone(), 7, Difficulty::Normal);

        let first = service.get_area(Area(2)).unwrap();
        let second = service.get_area(Area(2)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.count(2), 1);

        let request = source.requests.lock().unwrap()[0];
        assert_eq!(request, GeometryRequest::new(7, 0, 2));
    }

    #[test]
    fn test_failure_not_cached() {
        let source = Arc::new(FakeSource::default());
        source.replies.lock().unwrap().insert(5, None);
        let service = AreaDataService::new(source.clone(), 7, Difficulty::Hell);

        assert!(service.get_area(Area(5)).is_none());
        assert!(service.get_area(Area(5)).is_none());
        assert!(!service.is_cached(Area(5)));
        assert_eq!(source.count(5), 2);
    }

    #[test]
    fn test_adjacent_prefetch() {
        let source = Arc::new(
            FakeSource::default()
                .with(2, &area_json(&[1, 3]))
                .with(1, &area_json(&[2]))
                .with(3, &area_json(&[2])),
        );
        let service = AreaDataService::new(source.clone(), 7, Difficulty::Normal);

        service.get_area(Area(2)).unwrap();
        service.wait_for_prefetch();
        assert_eq!(service.cached_areas(), vec![Area(1), Area(2), Area(3)]);
        // neighbours of prefetched areas are not chased
        assert_eq!(source.count(2), 1);
    }

    #[test]
    fn test_clear_and_configured_prefetch() {
        let source = Arc::new(FakeSource::default().with(40, &area_json(&[])));
        let service =
            AreaDataService::with_prefetch(source.clone(), 1, Difficulty::Nightmare, &[Area(40)]);
        service.wait_for_prefetch();
        assert!(service.is_cached(Area(40)));
        assert!(service.serves(1, Difficulty::Nightmare));
        assert!(!service.serves(1, Difficulty::Hell));

        service.clear();
        assert!(service.cached_areas().is_empty());
        service.get_area(Area(40)).unwrap();
        assert_eq!(source.count(40), 2);
    }
}
