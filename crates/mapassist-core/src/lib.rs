//! # mapassist-core
//!
//! Core library for the MapAssist overlay.
//!
//! This crate provides:
//! - Read-only access to the game process's memory
//! - Offset resolution via signature scanning or a static offsets file
//! - Reconstruction of the live unit graph and per-frame game snapshots
//! - A cached client for the external area geometry server
//! - World-to-screen geometry and draw orchestration over a backend trait

pub mod config;
pub mod error;
pub mod game;
pub mod map;
pub mod offset;
pub mod overlay;
pub mod process;
pub mod render;
pub mod shutdown;
pub mod unit;

pub use config::{DEFAULT_CONFIG_FILE, MapSettings, PoiRendering, Settings};

pub use error::{Error, Result};

pub use game::{
    Area, Difficulty, GameContext, GameSnapshot, ItemAlert, ItemLogEntry, ItemSeenState,
    LootFilter, LootRule, MenuFlags, RosterEntry, SilentAlert, SnapshotBuilder,
};

pub use map::{
    AreaDataService, AreaGeometry, GeometryClient, GeometryRequest, GeometryServerConfig,
    GeometrySource, PoiKind, PointOfInterest, points_of_interest,
};

pub use offset::{
    OffsetName, OffsetResolver, OffsetSource, ResolvedOffsets, SignatureScan, StaticOffsets,
    builtin_signatures, load_offsets, save_offsets,
};

pub use overlay::{FrameOutcome, HideReason, Overlay};

pub use process::{
    MemoryReader, MockMemoryBuilder, MockMemoryReader, ProcessHandle, ProcessInfo,
    ProcessProvider, ReadMemory, SystemProcessProvider,
};

pub use render::{
    Color, Compositor, FrameInfo, MapTransform, Point, RecordingBackend, RenderBackend, Surface,
    ViewConfig,
};

pub use shutdown::ShutdownSignal;

pub use unit::{MonsterFilter, MonsterTier, Resist, UnitGraph, UnitRecord, UnitType};
