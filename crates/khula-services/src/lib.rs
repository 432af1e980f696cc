//! Feature services for Khula
//!
//! Market board, community forum, planting calendar, and resource
//! calculator. Each service composes the local SQLite stores with the
//! weather cache and the AI advisor.

pub mod forum;
pub mod forum_store;
pub mod market;
pub mod market_store;
pub mod planting;
pub mod resources;
pub mod schedule_store;

pub use forum::{ForumError, ForumService, CATEGORIES};
pub use forum_store::{Comment, Post, SqliteForumStore};
pub use market::{
    supported_crops, CropPrice, MarketAlert, MarketError, MarketService, PricePoint, PriceTrend,
};
pub use market_store::{MarketSnapshot, SqliteMarketStore};
pub use planting::{
    crop_profile, season_for_month, CalendarEntry, CropProfile, FarmCalendar, PlantingError,
    PlantingSchedule, PlantingService, Season, CROP_CALENDAR,
};
pub use resources::{
    calculate, BudgetStatus, IrrigationType, ResourceError, ResourceEstimate, ResourcePlan,
    ResourceService, SoilType,
};
pub use schedule_store::SqliteScheduleStore;
