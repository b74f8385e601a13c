//! Per-queue routing configuration

use crate::advancer::worker::Worker;
use std::collections::HashMap;
use std::sync::Arc;

/// Destination queues for one resolution
///
/// An empty list is a deliberate sink: the hop completes and the result is
/// discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destinations(Vec<String>);

impl Destinations {
    /// Route nowhere
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for Destinations {
    fn from(queue: &str) -> Self {
        Self(vec![queue.to_string()])
    }
}

impl From<String> for Destinations {
    fn from(queue: String) -> Self {
        Self(vec![queue])
    }
}

impl From<Vec<&str>> for Destinations {
    fn from(queues: Vec<&str>) -> Self {
        Self(queues.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Destinations {
    fn from(queues: Vec<String>) -> Self {
        Self(queues)
    }
}

impl<const N: usize> From<[&str; N]> for Destinations {
    fn from(queues: [&str; N]) -> Self {
        Self(queues.iter().map(|queue| queue.to_string()).collect())
    }
}

impl<T: Into<Destinations>> From<Option<T>> for Destinations {
    fn from(queues: Option<T>) -> Self {
        queues.map(Into::into).unwrap_or_default()
    }
}

/// Result of resolving where a hop result goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteLookup {
    pub destinations: Vec<String>,
    /// False when the dead-letter fallback was used
    pub explicit: bool,
}

/// Name of the implicit destination for an unmapped resolution
pub fn dead_letter_queue(queue: &str, resolution: &str) -> String {
    format!("{queue}/{resolution}")
}

struct Route {
    worker: Arc<dyn Worker>,
    destinations: HashMap<String, Vec<String>>,
}

/// Source queue -> (worker, resolution -> destinations)
#[derive(Default)]
pub struct RoutingTable {
    routes: HashMap<String, Route>,
}

impl std::fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (queue, route) in &self.routes {
            map.entry(queue, &route.destinations);
        }
        map.finish()
    }
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the worker and routes of `queue`, replacing any earlier ones
    ///
    /// ```rust
    /// # use queuehop::advancer::api::{worker, Destinations, RoutingTable};
    /// let mut routes = RoutingTable::new();
    /// routes.add_route(
    ///     "validate",
    ///     [
    ///         ("valid", Destinations::from(["persist", "audit"])),
    ///         ("invalid", Destinations::none()),
    ///     ],
    ///     worker::direct(|payload| Ok(payload)),
    /// );
    /// assert_eq!(routes.lookup("validate", "valid").destinations, ["persist", "audit"]);
    /// ```
    pub fn add_route<I, R, D>(
        &mut self,
        queue: impl Into<String>,
        resolutions: I,
        worker: Arc<dyn Worker>,
    ) -> &mut Self
    where
        I: IntoIterator<Item = (R, D)>,
        R: Into<String>,
        D: Into<Destinations>,
    {
        let queue = queue.into();
        let destinations = resolutions
            .into_iter()
            .map(|(resolution, destinations)| (resolution.into(), destinations.into().into_vec()))
            .collect();

        if self
            .routes
            .insert(queue.clone(), Route { worker, destinations })
            .is_some()
        {
            log::warn!("Route for queue '{queue}' replaced an existing registration");
        }
        self
    }

    /// Where a result with `resolution` on `queue` goes
    ///
    /// Unmapped resolutions, including every resolution of an unregistered
    /// queue, fall back to `"<queue>/<resolution>"`.
    pub fn lookup(&self, queue: &str, resolution: &str) -> RouteLookup {
        match self
            .routes
            .get(queue)
            .and_then(|route| route.destinations.get(resolution))
        {
            Some(destinations) => RouteLookup {
                destinations: destinations.clone(),
                explicit: true,
            },
            None => RouteLookup {
                destinations: vec![dead_letter_queue(queue, resolution)],
                explicit: false,
            },
        }
    }

    pub fn worker(&self, queue: &str) -> Option<Arc<dyn Worker>> {
        self.routes.get(queue).map(|route| Arc::clone(&route.worker))
    }

    /// Registered source queues, sorted
    pub fn queues(&self) -> Vec<String> {
        let mut queues: Vec<String> = self.routes.keys().cloned().collect();
        queues.sort();
        queues
    }
}
