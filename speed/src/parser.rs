use crate::error::Error;
use crate::models::{io::Message, Camera, Dispatcher, Ticket};
use crate::types::{
    PlateNumber, MESSAGE_TYPE_AM_CAMERA, MESSAGE_TYPE_AM_DISPATCHER, MESSAGE_TYPE_ERROR, MESSAGE_TYPE_HEARTBEAT,
    MESSAGE_TYPE_PLATE, MESSAGE_TYPE_TICKET, MESSAGE_TYPE_WANT_HEARTBEAT,
};
use nom::{
    bytes::streaming::tag,
    combinator::{map, map_res, verify},
    multi::{length_count, length_data},
    number::streaming::{be_u16, be_u32, be_u8},
    sequence::tuple,
    IResult,
};

type MessageParser = fn(&[u8]) -> IResult<&[u8], Message>;

fn nom_u16_arr(input: &[u8]) -> IResult<&[u8], Vec<u16>> {
    verify(length_count(be_u8, be_u16), |roads: &Vec<u16>| !roads.is_empty())(input)
}

fn is_printable(bytes: &[u8]) -> bool {
    bytes.iter().all(|byte| byte.is_ascii_graphic() || *byte == b' ')
}

fn nom_str(input: &[u8]) -> IResult<&[u8], PlateNumber> {
    map_res(verify(length_data(be_u8), is_printable), |bytes: &[u8]| {
        String::from_utf8(bytes.to_vec())
    })(input)
}

fn nom_error(input: &[u8]) -> IResult<&[u8], Message> {
    map(tuple((tag([MESSAGE_TYPE_ERROR]), nom_str)), |(_, message)| Message::Error(message))(input)
}

fn nom_plate(input: &[u8]) -> IResult<&[u8], Message> {
    map(tuple((tag([MESSAGE_TYPE_PLATE]), nom_str, be_u32)), |(_, plate, timestamp)| {
        Message::Plate { plate, timestamp }
    })(input)
}

fn nom_ticket(input: &[u8]) -> IResult<&[u8], Message> {
    map(
        tuple((tag([MESSAGE_TYPE_TICKET]), nom_str, be_u16, be_u16, be_u32, be_u16, be_u32, be_u16)),
        |(_, plate, road, mile1, timestamp1, mile2, timestamp2, speed)| {
            Message::Ticket(Ticket {
                plate,
                road,
                mile1,
                timestamp1,
                mile2,
                timestamp2,
                speed,
            })
        },
    )(input)
}

fn nom_want_heartbeat(input: &[u8]) -> IResult<&[u8], Message> {
    map(tuple((tag([MESSAGE_TYPE_WANT_HEARTBEAT]), be_u32)), |(_, interval)| {
        Message::WantHeartbeat(interval)
    })(input)
}

fn nom_heartbeat(input: &[u8]) -> IResult<&[u8], Message> {
    map(tag([MESSAGE_TYPE_HEARTBEAT]), |_| Message::Heartbeat)(input)
}

fn nom_camera(input: &[u8]) -> IResult<&[u8], Message> {
    map(tuple((tag([MESSAGE_TYPE_AM_CAMERA]), be_u16, be_u16, be_u16)), |(_, road, mile, limit)| {
        Message::IAmCamera(Camera { road, mile, limit })
    })(input)
}

fn nom_dispatcher(input: &[u8]) -> IResult<&[u8], Message> {
    map(tuple((tag([MESSAGE_TYPE_AM_DISPATCHER]), nom_u16_arr)), |(_, roads)| {
        Message::IAmDispatcher(Dispatcher { roads })
    })(input)
}

type InputBufferMatch = Result<Option<(Message, usize)>, Error>;

/// Decode the frame at the start of `input`.
///
/// `Ok(None)` means more bytes are needed; `Ok(Some((message, n)))` means the first `n` bytes
/// were one complete message. The message type byte alone decides how the rest is read, so an
/// unknown type fails immediately rather than waiting for more input.
pub fn nom(input: &[u8]) -> InputBufferMatch {
    let Some(&message_type) = input.first() else {
        return Ok(None);
    };
    let parser: MessageParser = match message_type {
        MESSAGE_TYPE_ERROR => nom_error,
        MESSAGE_TYPE_PLATE => nom_plate,
        MESSAGE_TYPE_TICKET => nom_ticket,
        MESSAGE_TYPE_WANT_HEARTBEAT => nom_want_heartbeat,
        MESSAGE_TYPE_HEARTBEAT => nom_heartbeat,
        MESSAGE_TYPE_AM_CAMERA => nom_camera,
        MESSAGE_TYPE_AM_DISPATCHER => nom_dispatcher,
        unknown => return Err(Error::protocol(format!("unknown message type 0x{unknown:02x}"))),
    };
    match parser(input) {
        Ok((remainder, message)) => Ok(Some((message, input.len() - remainder.len()))),
        Err(nom::Err::Incomplete(_)) => Ok(None),
        Err(_) => Err(Error::protocol(format!("malformed message of type 0x{message_type:02x}"))),
    }
}
