//! Area geometry: the geometry server client, the per-game cache and the
//! points of interest derived from it.

mod client;
mod geometry;
pub mod poi;
mod protocol;
mod service;

pub use client::{GeometryClient, GeometryServerConfig, GeometrySource};
pub use geometry::{AdjacentLevel, AreaGeometry, CellClass};
pub use poi::{PoiKind, PointOfInterest, points_of_interest, portal_label, shrine_label};
pub use protocol::{GeometryRequest, MAX_RESPONSE_LEN, REQUEST_SIZE, ResponseFrame, read_frame};
pub use service::AreaDataService;

#[cfg(test)]
pub(crate) use geometry::tests as geometry_tests;
#[cfg(test)]
pub(crate) use service::tests as service_tests;
