//! Common test fixtures for hazard grid tests.

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use hazard_common::BoundingBox;

/// Sydney region used by the operational hazard output.
pub fn sydney_bbox() -> BoundingBox {
    BoundingBox::new(150.5, -34.0, 153.0, -31.5)
}

/// Start of the April 2015 East Coast Low event.
pub fn event_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 4, 19, 23, 0, 0).unwrap()
}

/// End of the April 2015 East Coast Low event.
pub fn event_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 4, 21, 23, 0, 0).unwrap()
}

/// Scratch directory removed when dropped.
pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create scratch directory")
}
