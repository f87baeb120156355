pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod feed;
pub mod payload;
pub mod routing;
pub mod storage;
pub mod tags;
pub mod telemetry;
pub mod translate;
pub mod window;
