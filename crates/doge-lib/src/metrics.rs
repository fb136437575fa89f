// ==============
// doge-lib/src/metrics.rs

//! Central place for metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_ACTIVE: &str = "ws.active";
pub const POLL_SESSION: &str = "poll.session";
pub const BROKER_PUBLISH: &str = "broker.publish";
pub const BROKER_FANOUT: &str = "broker.fanout";
pub const PHOTO_UPLOADED: &str = "photo.uploaded";
pub const PHOTO_BYTES: &str = "photo.bytes";
