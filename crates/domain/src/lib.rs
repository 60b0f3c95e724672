pub mod delivery;
pub mod event;
pub mod search;

pub use delivery::DeliveryJob;
pub use event::{AttemptRecord, Event, EventStatus, EventView};
pub use search::{HistogramBucket, SearchQuery, SearchResponse, SearchSummary};
