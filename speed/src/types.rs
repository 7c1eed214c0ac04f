pub(crate) const MESSAGE_TYPE_ERROR: u8 = 0x10;
pub(crate) const MESSAGE_TYPE_PLATE: u8 = 0x20;
pub(crate) const MESSAGE_TYPE_TICKET: u8 = 0x21;
pub(crate) const MESSAGE_TYPE_WANT_HEARTBEAT: u8 = 0x40;
pub(crate) const MESSAGE_TYPE_HEARTBEAT: u8 = 0x41;
pub(crate) const MESSAGE_TYPE_AM_CAMERA: u8 = 0x80;
pub(crate) const MESSAGE_TYPE_AM_DISPATCHER: u8 = 0x81;

/// Longest `str` the wire format can carry behind its one-byte length prefix.
pub const MAX_STR_LEN: usize = u8::MAX as usize;
pub const DAY_IN_SECONDS: u32 = 86_400;

pub type RoadId = u16;
pub type MileMarker = u16;
pub type SpeedLimit = u16;
/// Hundredths of a mile per hour.
pub type RecordedSpeed = u16;
pub type SpeedMph = f64;
pub type Timestamp = u32;
pub type Day = u32;
pub type PlateNumber = String;
/// Deciseconds between heartbeats; zero disables them.
pub type HeartbeatInterval = u32;
pub(crate) type ByteString = Vec<u8>;
