pub mod models;
mod store;

pub use models::{
    ConfigDocument, ImportSummary, LiveConfig, LiveSource, Promotion, SiteMeta, Slot,
    SlotDescriptor, SlotInfo, DEFAULT_SLOT_FILE,
};
pub use store::{ConfigStore, StoreError, LIVE_FILE};
