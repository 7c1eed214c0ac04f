use std::net::{TcpListener, TcpStream};

/// Bind to an OS-assigned port on localhost, returning the listener along with its port.
pub fn listen_on_available_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("Could not bind integration listener.");
    let port = listener
        .local_addr()
        .expect("Could not read integration listener address.")
        .port();
    (listener, port)
}

pub fn connect(port: u16) -> TcpStream {
    TcpStream::connect(("127.0.0.1", port)).expect("Could not connect to integration server.")
}

pub fn u8s_to_hex_str(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn hex_str_to_u8s(hex: &str) -> Result<Vec<u8>, ()> {
    let stripped = hex
        .chars()
        .filter(char::is_ascii_hexdigit)
        .collect::<Vec<char>>();
    if stripped.len() % 2 != 0 {
        return Err(());
    }
    stripped
        .chunks(2)
        .map(|double_hex| double_hex.iter().collect::<String>())
        .map(|hex_string| u8::from_str_radix(&hex_string, 16).map_err(|_| ()))
        .collect::<Result<Vec<_>, ()>>()
}

#[macro_export]
macro_rules! send_bytes_from {
    ($s:expr, $h:expr) => {{
        use std::io::Write;
        _ = $s.write_all(
            &$crate::hex_str_to_u8s($h).expect("Invalid hex code provided for integration test."),
        );
    }};
}

#[macro_export]
macro_rules! assert_client_receives_bytes (
    ($s:expr, $h:expr, $d:expr) => {{
        use std::io::Read;

        let client = &mut $s;
        let bytes = $crate::hex_str_to_u8s($h).expect("Invalid hex code provided for integration test.");
        let mut buffer: Vec<u8> = Vec::new();
        client.set_read_timeout(Some($d)).expect("Could not set read timeout.");
        match client.by_ref().take(bytes.len() as u64).read_to_end(&mut buffer) {
            Err(e)  => panic!("Client connection errored: {e:?}"),
            Ok(_) => assert_eq!($crate::u8s_to_hex_str(&bytes), $crate::u8s_to_hex_str(&buffer)),
        };
        client.set_read_timeout(None).expect("Could not unset read timeout.");
    }};
    ($s:expr, $h:expr) => {{
        $crate::assert_client_receives_bytes!($s, $h, std::time::Duration::from_secs(1))
    }};
);

/// Reads everything that arrives before the timeout (or the connection closing) and asserts
/// that the given byte sequence is not part of it. Without a byte sequence, asserts that
/// nothing arrives at all.
#[macro_export]
macro_rules! assert_client_not_receives_bytes (
    ($s:expr, $h:expr, $d:expr) => {{
        let bytes = $crate::hex_str_to_u8s($h).expect("Invalid hex code provided for integration test.");
        let received = $crate::read_until_quiet(&mut $s, $d);
        assert!(
            !received.windows(bytes.len()).any(|window| window == bytes.as_slice()),
            "Client unexpectedly received {} within {}",
            $crate::u8s_to_hex_str(&bytes),
            $crate::u8s_to_hex_str(&received),
        );
    }};
    ($s:expr, $d:expr) => {{
        let received = $crate::read_until_quiet(&mut $s, $d);
        assert!(
            received.is_empty(),
            "Client unexpectedly received {}",
            $crate::u8s_to_hex_str(&received),
        );
    }};
);

/// Collect bytes from the stream until a read times out or the peer closes.
pub fn read_until_quiet(stream: &mut TcpStream, timeout: std::time::Duration) -> Vec<u8> {
    use std::io::{ErrorKind, Read};

    let mut received: Vec<u8> = Vec::new();
    let mut buffer = [0u8; 512];
    stream.set_read_timeout(Some(timeout)).expect("Could not set read timeout.");
    loop {
        match stream.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => received.extend_from_slice(&buffer[..n]),
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => break,
            Err(e) => panic!("Client connection errored: {e:?}"),
        }
    }
    stream.set_read_timeout(None).expect("Could not unset read timeout.");
    received
}
