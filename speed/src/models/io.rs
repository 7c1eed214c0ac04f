use crate::error::Error;
use crate::models::{Camera, Dispatcher, Ticket};
use crate::types::{
    ByteString, HeartbeatInterval, PlateNumber, Timestamp, MAX_STR_LEN, MESSAGE_TYPE_AM_CAMERA,
    MESSAGE_TYPE_AM_DISPATCHER, MESSAGE_TYPE_ERROR, MESSAGE_TYPE_HEARTBEAT, MESSAGE_TYPE_PLATE,
    MESSAGE_TYPE_TICKET, MESSAGE_TYPE_WANT_HEARTBEAT,
};

/// Every frame of the protocol, in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Error(String),
    Plate { plate: PlateNumber, timestamp: Timestamp },
    Ticket(Ticket),
    WantHeartbeat(HeartbeatInterval),
    Heartbeat,
    IAmCamera(Camera),
    IAmDispatcher(Dispatcher),
}
impl Message {
    pub fn message_type(&self) -> u8 {
        match self {
            Self::Error(_) => MESSAGE_TYPE_ERROR,
            Self::Plate { .. } => MESSAGE_TYPE_PLATE,
            Self::Ticket(_) => MESSAGE_TYPE_TICKET,
            Self::WantHeartbeat(_) => MESSAGE_TYPE_WANT_HEARTBEAT,
            Self::Heartbeat => MESSAGE_TYPE_HEARTBEAT,
            Self::IAmCamera(_) => MESSAGE_TYPE_AM_CAMERA,
            Self::IAmDispatcher(_) => MESSAGE_TYPE_AM_DISPATCHER,
        }
    }

    pub fn to_bytes(&self) -> Result<ByteString, Error> {
        let mut output: ByteString = vec![self.message_type()];
        match self {
            Self::Error(message) => push_str(&mut output, message)?,
            Self::Plate { plate, timestamp } => {
                push_str(&mut output, plate)?;
                output.extend_from_slice(&timestamp.to_be_bytes());
            }
            Self::Ticket(ticket) => {
                push_str(&mut output, &ticket.plate)?;
                output.extend_from_slice(&ticket.road.to_be_bytes());
                output.extend_from_slice(&ticket.mile1.to_be_bytes());
                output.extend_from_slice(&ticket.timestamp1.to_be_bytes());
                output.extend_from_slice(&ticket.mile2.to_be_bytes());
                output.extend_from_slice(&ticket.timestamp2.to_be_bytes());
                output.extend_from_slice(&ticket.speed.to_be_bytes());
            }
            Self::WantHeartbeat(interval) => output.extend_from_slice(&interval.to_be_bytes()),
            Self::Heartbeat => (),
            Self::IAmCamera(camera) => {
                output.extend_from_slice(&camera.road.to_be_bytes());
                output.extend_from_slice(&camera.mile.to_be_bytes());
                output.extend_from_slice(&camera.limit.to_be_bytes());
            }
            Self::IAmDispatcher(dispatcher) => {
                let count = u8::try_from(dispatcher.roads.len())
                    .map_err(|_| Error::validation("dispatcher serves more than 255 roads"))?;
                if count == 0 {
                    return Err(Error::validation("dispatcher must serve at least one road"));
                }
                output.push(count);
                for road in &dispatcher.roads {
                    output.extend_from_slice(&road.to_be_bytes());
                }
            }
        }
        Ok(output)
    }
}

fn push_str(output: &mut ByteString, string: &str) -> Result<(), Error> {
    if string.len() > MAX_STR_LEN {
        return Err(Error::validation(format!(
            "string of {} bytes exceeds {MAX_STR_LEN}",
            string.len()
        )));
    }
    if !string.is_ascii() {
        return Err(Error::validation("string is not ASCII"));
    }
    output.push(string.len() as u8);
    output.extend_from_slice(string.as_bytes());
    Ok(())
}
