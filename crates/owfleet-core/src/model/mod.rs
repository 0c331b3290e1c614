// ── Domain model ──
//
// Output-facing records of a collection run. Field order in each struct is
// the key order of the JSON reports.

pub mod client;
pub mod device;
pub mod mac;
pub mod records;

pub use client::{
    AggregatedClient, ApClient, ClientMetrics, ClientSighting, RrmCapabilityFlags, RrmState,
    SteeringCounters, steering_columns,
};
pub use device::{ApIdentity, Band, DeviceLabel, DeviceRef, NO_UNIT, NormalizedDevice};
pub use mac::MacAddress;
pub use records::{NeighborRecord, SurveyRecord};
