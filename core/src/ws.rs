//! WebSocket session over an async byte stream
//!
//! The opening handshake, framing and masking come from `embedded-websocket`,
//! which does no I/O of its own. [`WsClient`] moves bytes between it and an
//! `embedded-io-async` stream (the TLS connection on the firmware) and boils
//! inbound traffic down to the events the relay acts on:
//! - text and binary messages are surfaced
//! - pings are answered, pongs skipped
//! - a close from the peer is echoed and surfaced once

use core::fmt::{self, Write as _};

use embedded_io_async::{Read, Write};
use embedded_websocket::{
    WebSocketClient, WebSocketCloseStatusCode, WebSocketOptions, WebSocketReceiveMessageType,
    WebSocketSendMessageType,
};
use heapless::String;
use rand_core::RngCore;
use relay_hal::TextSink;

use crate::config::Endpoint;
use crate::fmt::Dbg;

/// Room for `host[:port]` and the origin URL
const AUTHORITY_LEN: usize = 128;

/// WebSocket client errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsError {
    /// Underlying stream failed
    Io(embedded_io_async::ErrorKind),
    /// Peer closed the stream or completed the closing handshake
    ConnectionClosed,
    /// Server answered the upgrade with a status other than 101
    HandshakeRejected,
    /// Upgrade response could not be parsed
    MalformedResponse,
    /// `Sec-WebSocket-Accept` missing or wrong
    BadAccept,
    /// Upgrade request or outbound frame does not fit the send buffer
    BufferTooSmall,
    /// Frame violates RFC 6455 framing rules
    Protocol,
    /// Message is larger than the receive buffer
    FrameTooLarge,
    /// Text message is not valid UTF-8
    InvalidUtf8,
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "I/O error: {:?}", kind),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::HandshakeRejected => write!(f, "Upgrade rejected by server"),
            Self::MalformedResponse => write!(f, "Malformed upgrade response"),
            Self::BadAccept => write!(f, "Invalid Sec-WebSocket-Accept"),
            Self::BufferTooSmall => write!(f, "Send buffer too small"),
            Self::Protocol => write!(f, "WebSocket protocol error"),
            Self::FrameTooLarge => write!(f, "Message too large"),
            Self::InvalidUtf8 => write!(f, "Text message is not valid UTF-8"),
        }
    }
}

impl core::error::Error for WsError {}

#[cfg(feature = "defmt")]
impl defmt::Format for WsError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", defmt::Display2Format(self))
    }
}

/// Inbound message or closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsEvent<'a> {
    /// Complete text message
    Text(&'a str),
    /// Complete binary message
    Binary(&'a [u8]),
    /// Peer closed the socket, with its status code if any
    Closed(Option<u16>),
}

/// Client end of an open WebSocket connection
///
/// The caller's `rx` buffer is split in half: raw frames are collected in
/// the first half and message payloads assembled in the second, so half of
/// `rx` bounds the largest inbound message. `tx` bounds the largest outbound
/// frame. Events borrow from `rx` until the next call to
/// [`next_event`](Self::next_event).
pub struct WsClient<'b, T, R: RngCore> {
    io: T,
    ws: WebSocketClient<R>,
    raw: &'b mut [u8],
    filled: usize,
    msg: &'b mut [u8],
    tx: &'b mut [u8],
    closed: bool,
}

impl<'b, T, R> WsClient<'b, T, R>
where
    T: Read + Write,
    R: RngCore,
{
    /// Perform the opening handshake over an already connected stream
    ///
    /// # Arguments
    ///
    /// * `io` - Connected stream (TLS for `wss`, plain TCP for `ws`)
    /// * `rng` - Source for the handshake key and frame masks
    /// * `endpoint` - Host and request target for the upgrade request
    /// * `rx` - Receive buffer; also holds the upgrade response
    /// * `tx` - Send buffer for the upgrade request and outbound frames
    pub async fn connect(
        mut io: T,
        rng: R,
        endpoint: &Endpoint,
        rx: &'b mut [u8],
        tx: &'b mut [u8],
    ) -> Result<Self, WsError> {
        let (host, origin) = authority(endpoint)?;
        let options = WebSocketOptions {
            path: endpoint.path,
            host: &host,
            origin: &origin,
            sub_protocols: None,
            additional_headers: None,
        };

        let mut ws = WebSocketClient::new_client(rng);
        let (len, key) = ws.client_connect(&options, tx).map_err(handshake_error)?;
        debug!("WebSocket upgrade: GET {} on {}", endpoint.path, host.as_str());
        io.write_all(&tx[..len]).await.map_err(io_error)?;
        io.flush().await.map_err(io_error)?;

        let half = rx.len() / 2;
        let (raw, msg) = rx.split_at_mut(half);
        let mut filled = 0;
        let head_len = loop {
            if filled > 0 {
                match ws.client_accept(&key, &raw[..filled]) {
                    Ok((len, _)) => break len,
                    Err(embedded_websocket::Error::HttpHeaderIncomplete) => {}
                    Err(e) => {
                        let e = handshake_error(e);
                        warn!("WebSocket upgrade refused: {:?}", e);
                        return Err(e);
                    }
                }
            }
            if filled == raw.len() {
                return Err(WsError::BufferTooSmall);
            }
            let n = io.read(&mut raw[filled..]).await.map_err(io_error)?;
            if n == 0 {
                return Err(WsError::ConnectionClosed);
            }
            filled += n;
        };

        // Frames may have arrived right behind the response head
        raw.copy_within(head_len..filled, 0);
        filled -= head_len;

        info!("WebSocket open to {}", endpoint.host);
        Ok(Self {
            io,
            ws,
            raw,
            filled,
            msg,
            tx,
            closed: false,
        })
    }

    /// Send one text message
    pub async fn write_text(&mut self, text: &str) -> Result<(), WsError> {
        if self.closed {
            return Err(WsError::ConnectionClosed);
        }
        let len = self
            .ws
            .write(WebSocketSendMessageType::Text, true, text.as_bytes(), self.tx)
            .map_err(send_error)?;
        flush_frame(&mut self.io, &self.tx[..len]).await
    }

    /// Wait for the next message or closure
    ///
    /// Pings are answered and pongs skipped without surfacing an event. A
    /// close frame from the peer is echoed back before `Closed` is returned;
    /// after that every call returns `ConnectionClosed`.
    pub async fn next_event(&mut self) -> Result<WsEvent<'_>, WsError> {
        let mut len = 0;
        loop {
            if self.closed {
                return Err(WsError::ConnectionClosed);
            }
            if self.filled == 0 {
                self.fill().await?;
                continue;
            }

            let read = match self.ws.read(&self.raw[..self.filled], &mut self.msg[len..]) {
                Ok(read) => read,
                Err(embedded_websocket::Error::ReadFrameIncomplete) => {
                    self.fill().await?;
                    continue;
                }
                Err(embedded_websocket::Error::WriteToBufferTooSmall) => {
                    return Err(WsError::FrameTooLarge)
                }
                Err(e) => {
                    warn!("Bad inbound frame: {:?}", Dbg(&e));
                    return Err(WsError::Protocol);
                }
            };
            self.raw.copy_within(read.len_from..self.filled, 0);
            self.filled -= read.len_from;
            len += read.len_to;

            if !read.end_of_message {
                if len == self.msg.len() {
                    return Err(WsError::FrameTooLarge);
                }
                if read.len_from == 0 {
                    self.fill().await?;
                }
                continue;
            }

            let payload_len = core::mem::take(&mut len);
            match read.message_type {
                WebSocketReceiveMessageType::Text => {
                    return core::str::from_utf8(&self.msg[..payload_len])
                        .map(WsEvent::Text)
                        .map_err(|_| WsError::InvalidUtf8);
                }
                WebSocketReceiveMessageType::Binary => {
                    return Ok(WsEvent::Binary(&self.msg[..payload_len]));
                }
                WebSocketReceiveMessageType::Ping => {
                    trace!("WebSocket ping ({} bytes)", payload_len);
                    let n = self
                        .ws
                        .write(
                            WebSocketSendMessageType::Pong,
                            true,
                            &self.msg[..payload_len],
                            self.tx,
                        )
                        .map_err(send_error)?;
                    flush_frame(&mut self.io, &self.tx[..n]).await?;
                }
                WebSocketReceiveMessageType::Pong => trace!("WebSocket pong"),
                WebSocketReceiveMessageType::CloseMustReply => {
                    let payload = &self.msg[..payload_len];
                    let code =
                        (payload.len() >= 2).then(|| u16::from_be_bytes([payload[0], payload[1]]));
                    self.closed = true;
                    let echo = self.ws.write(
                        WebSocketSendMessageType::CloseReply,
                        true,
                        &self.msg[..payload_len],
                        self.tx,
                    );
                    let sent = match echo {
                        Ok(n) => flush_frame(&mut self.io, &self.tx[..n]).await,
                        Err(e) => Err(send_error(e)),
                    };
                    if let Err(e) = sent {
                        debug!("Close echo failed: {:?}", e);
                    }
                    return Ok(WsEvent::Closed(code));
                }
                WebSocketReceiveMessageType::CloseCompleted => {
                    self.closed = true;
                    return Ok(WsEvent::Closed(None));
                }
            }
        }
    }

    /// Start the closing handshake with status 1000
    pub async fn close(&mut self) -> Result<(), WsError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let len = self
            .ws
            .close(WebSocketCloseStatusCode::NormalClosure, None, self.tx)
            .map_err(send_error)?;
        flush_frame(&mut self.io, &self.tx[..len]).await
    }

    /// Whether either side has sent a close frame
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> T {
        self.io
    }

    async fn fill(&mut self) -> Result<(), WsError> {
        if self.filled == self.raw.len() {
            return Err(WsError::FrameTooLarge);
        }
        let n = self
            .io
            .read(&mut self.raw[self.filled..])
            .await
            .map_err(io_error)?;
        if n == 0 {
            self.closed = true;
            return Err(WsError::ConnectionClosed);
        }
        self.filled += n;
        Ok(())
    }
}

impl<T, R> TextSink for WsClient<'_, T, R>
where
    T: Read + Write,
    R: RngCore,
{
    type Error = WsError;

    async fn send_text(&mut self, text: &str) -> Result<(), Self::Error> {
        self.write_text(text).await
    }
}

/// `Host` header value and origin URL; the port is named only when it is
/// not the scheme's default
fn authority(
    endpoint: &Endpoint,
) -> Result<(String<AUTHORITY_LEN>, String<AUTHORITY_LEN>), WsError> {
    let default_port = if endpoint.secure { 443 } else { 80 };
    let scheme = if endpoint.secure { "https" } else { "http" };

    let mut host = String::new();
    let written = if endpoint.port == default_port {
        write!(host, "{}", endpoint.host)
    } else {
        write!(host, "{}:{}", endpoint.host, endpoint.port)
    };
    written.map_err(|_| WsError::BufferTooSmall)?;

    let mut origin = String::new();
    write!(origin, "{}://{}", scheme, host.as_str()).map_err(|_| WsError::BufferTooSmall)?;
    Ok((host, origin))
}

async fn flush_frame<T: Write>(io: &mut T, frame: &[u8]) -> Result<(), WsError> {
    io.write_all(frame).await.map_err(io_error)?;
    io.flush().await.map_err(io_error)
}

fn handshake_error(e: embedded_websocket::Error) -> WsError {
    match e {
        embedded_websocket::Error::HttpResponseCodeInvalid(_) => WsError::HandshakeRejected,
        embedded_websocket::Error::AcceptStringInvalid => WsError::BadAccept,
        embedded_websocket::Error::WriteToBufferTooSmall => WsError::BufferTooSmall,
        other => {
            debug!("Upgrade failed: {:?}", Dbg(&other));
            WsError::MalformedResponse
        }
    }
}

fn send_error(e: embedded_websocket::Error) -> WsError {
    match e {
        embedded_websocket::Error::WriteToBufferTooSmall => WsError::BufferTooSmall,
        embedded_websocket::Error::WebSocketNotOpen => WsError::ConnectionClosed,
        other => {
            debug!("Frame not written: {:?}", Dbg(&other));
            WsError::Protocol
        }
    }
}

fn io_error<E: embedded_io_async::Error>(e: E) -> WsError {
    WsError::Io(embedded_io_async::Error::kind(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use embassy_futures::block_on;
    use embedded_io_async::{ErrorKind, ErrorType};
    use sha1::{Digest, Sha1};

    const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

    /// In-memory duplex stream
    ///
    /// With `accept_upgrade` set it plays a server: the first read answers
    /// the captured upgrade request with a valid 101 response, then the
    /// scripted bytes follow.
    struct MockStream {
        inbound: Vec<u8>,
        read_pos: usize,
        /// Largest read returned at once
        read_chunk: usize,
        accept_upgrade: bool,
        outbound: Vec<u8>,
    }

    impl MockStream {
        fn server(frames: Vec<u8>) -> Self {
            Self {
                inbound: frames,
                read_pos: 0,
                read_chunk: usize::MAX,
                accept_upgrade: true,
                outbound: Vec::new(),
            }
        }

        fn scripted(bytes: &[u8]) -> Self {
            Self {
                accept_upgrade: false,
                ..Self::server(bytes.to_vec())
            }
        }

        /// Everything the client wrote after its upgrade request
        fn frames_sent(&self) -> &[u8] {
            let end = self
                .outbound
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .unwrap();
            &self.outbound[end + 4..]
        }
    }

    fn upgrade_response(request: &[u8]) -> Vec<u8> {
        let request = core::str::from_utf8(request).unwrap();
        let key = request
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("sec-websocket-key")
                    .then(|| value.trim())
            })
            .unwrap();

        let mut sha = Sha1::new();
        sha.update(key.as_bytes());
        sha.update(WEBSOCKET_GUID.as_bytes());
        let mut accept = [0u8; 28];
        base64::engine::general_purpose::STANDARD
            .encode_slice(sha.finalize(), &mut accept)
            .unwrap();

        format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {}\r\n\r\n",
            core::str::from_utf8(&accept).unwrap()
        )
        .into_bytes()
    }

    impl ErrorType for MockStream {
        type Error = ErrorKind;
    }

    impl Read for MockStream {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            if self.accept_upgrade {
                self.accept_upgrade = false;
                let mut script = upgrade_response(&self.outbound);
                script.extend_from_slice(&self.inbound);
                self.inbound = script;
            }
            let remaining = &self.inbound[self.read_pos..];
            let n = remaining.len().min(buf.len()).min(self.read_chunk);
            buf[..n].copy_from_slice(&remaining[..n]);
            self.read_pos += n;
            Ok(n)
        }
    }

    impl Write for MockStream {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.outbound.extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    /// Fills with a repeating counter
    struct StepRng(u8);

    impl RngCore for StepRng {
        fn next_u32(&mut self) -> u32 {
            rand_core::impls::next_u32_via_fill(self)
        }
        fn next_u64(&mut self) -> u64 {
            rand_core::impls::next_u64_via_fill(self)
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for b in dest {
                *b = self.0;
                self.0 = self.0.wrapping_add(1);
            }
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    /// Unmask one client frame, returning (opcode bits, payload, rest)
    fn unmask_client_frame(bytes: &[u8]) -> (u8, Vec<u8>, &[u8]) {
        assert_eq!(bytes[1] & 0x80, 0x80, "client frames are masked");
        let (len, mut pos) = match bytes[1] & 0x7F {
            126 => (usize::from(u16::from_be_bytes([bytes[2], bytes[3]])), 4),
            n => (usize::from(n), 2),
        };
        let key = [bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]];
        pos += 4;
        let payload = bytes[pos..pos + len]
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ key[i % 4])
            .collect();
        (bytes[0] & 0x0F, payload, &bytes[pos + len..])
    }

    fn open<'b>(
        stream: MockStream,
        endpoint: &Endpoint,
        rx: &'b mut [u8],
        tx: &'b mut [u8],
    ) -> WsClient<'b, MockStream, StepRng> {
        block_on(WsClient::connect(stream, StepRng(1), endpoint, rx, tx)).unwrap()
    }

    #[test]
    fn test_connect_sends_upgrade_request() {
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let client = open(MockStream::server(Vec::new()), &Endpoint::DEFAULT, &mut rx, &mut tx);

        let out = client.into_inner().outbound;
        let text = core::str::from_utf8(&out).unwrap();
        assert!(text.starts_with("GET /v1.1/websocket?ack=true HTTP/1.1\r\n"));
        assert!(text.to_ascii_lowercase().contains("host: api.artik.cloud\r\n"));
        assert!(text.to_ascii_lowercase().contains("upgrade: websocket\r\n"));
    }

    #[test]
    fn test_non_default_port_in_host_header() {
        let endpoint = Endpoint::parse("ws://192.168.1.10:8080/socket").unwrap();
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let client = open(MockStream::server(Vec::new()), &endpoint, &mut rx, &mut tx);

        let text = std::string::String::from_utf8(client.into_inner().outbound).unwrap();
        assert!(text.starts_with("GET /socket HTTP/1.1\r\n"));
        assert!(text.to_ascii_lowercase().contains("host: 192.168.1.10:8080\r\n"));
    }

    #[test]
    fn test_connect_rejected() {
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let stream = MockStream::scripted(b"HTTP/1.1 403 Forbidden\r\n\r\n");
        let result = block_on(WsClient::connect(
            stream,
            StepRng(1),
            &Endpoint::DEFAULT,
            &mut rx,
            &mut tx,
        ));
        assert!(matches!(result, Err(WsError::HandshakeRejected)));
    }

    #[test]
    fn test_connect_peer_hangs_up() {
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let stream = MockStream::scripted(b"HTTP/1.1 101 Switching");
        let result = block_on(WsClient::connect(
            stream,
            StepRng(1),
            &Endpoint::DEFAULT,
            &mut rx,
            &mut tx,
        ));
        assert!(matches!(result, Err(WsError::ConnectionClosed)));
    }

    #[test]
    fn test_write_text_is_masked() {
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let mut client = open(MockStream::server(Vec::new()), &Endpoint::DEFAULT, &mut rx, &mut tx);
        block_on(client.write_text("{\"currentTemp\":23.5}")).unwrap();

        let stream = client.into_inner();
        let (opcode, payload, rest) = unmask_client_frame(stream.frames_sent());
        assert_eq!(opcode, 0x1);
        assert_eq!(payload, b"{\"currentTemp\":23.5}");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_long_text_uses_extended_length() {
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let mut client = open(MockStream::server(Vec::new()), &Endpoint::DEFAULT, &mut rx, &mut tx);
        let text = "x".repeat(300);
        block_on(client.write_text(&text)).unwrap();

        let stream = client.into_inner();
        let sent = stream.frames_sent();
        assert_eq!(sent[1] & 0x7F, 126);
        let (_, payload, _) = unmask_client_frame(sent);
        assert_eq!(payload, text.as_bytes());
    }

    #[test]
    fn test_text_frames_after_upgrade_in_same_read() {
        let mut inbound = vec![0x81, 0x02, b'h', b'i'];
        inbound.extend_from_slice(&[0x81, 0x03, b'a', b'c', b'k']);
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let mut client = open(MockStream::server(inbound), &Endpoint::DEFAULT, &mut rx, &mut tx);

        assert_eq!(block_on(client.next_event()), Ok(WsEvent::Text("hi")));
        assert_eq!(block_on(client.next_event()), Ok(WsEvent::Text("ack")));
    }

    #[test]
    fn test_frames_split_across_reads() {
        let mut stream = MockStream::server(vec![0x82, 0x03, 1, 2, 3]);
        stream.read_chunk = 3;
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let mut client = open(stream, &Endpoint::DEFAULT, &mut rx, &mut tx);

        assert_eq!(block_on(client.next_event()), Ok(WsEvent::Binary(&[1, 2, 3])));
    }

    #[test]
    fn test_ping_answered_with_pong() {
        let inbound = vec![0x89, 0x02, b'o', b'k', 0x81, 0x01, b'!'];
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let mut client = open(MockStream::server(inbound), &Endpoint::DEFAULT, &mut rx, &mut tx);

        assert_eq!(block_on(client.next_event()), Ok(WsEvent::Text("!")));
        let stream = client.into_inner();
        let (opcode, payload, _) = unmask_client_frame(stream.frames_sent());
        assert_eq!(opcode, 0xA);
        assert_eq!(payload, b"ok");
    }

    #[test]
    fn test_close_is_echoed() {
        let inbound = vec![0x88, 0x02, 0x03, 0xE9]; // 1001 going away
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let mut client = open(MockStream::server(inbound), &Endpoint::DEFAULT, &mut rx, &mut tx);

        assert_eq!(block_on(client.next_event()), Ok(WsEvent::Closed(Some(1001))));
        assert!(client.is_closed());
        assert_eq!(block_on(client.next_event()), Err(WsError::ConnectionClosed));
        assert_eq!(block_on(client.write_text("late")), Err(WsError::ConnectionClosed));

        let stream = client.into_inner();
        let (opcode, payload, rest) = unmask_client_frame(stream.frames_sent());
        assert_eq!(opcode, 0x8);
        assert_eq!(payload, [0x03, 0xE9]);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_stream_eof_reports_closed() {
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let mut client = open(MockStream::server(Vec::new()), &Endpoint::DEFAULT, &mut rx, &mut tx);
        assert_eq!(block_on(client.next_event()), Err(WsError::ConnectionClosed));
        assert!(client.is_closed());
    }

    #[test]
    fn test_invalid_utf8_text() {
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let inbound = vec![0x81, 0x02, 0xC3, 0x28];
        let mut client = open(MockStream::server(inbound), &Endpoint::DEFAULT, &mut rx, &mut tx);
        assert_eq!(block_on(client.next_event()), Err(WsError::InvalidUtf8));
    }

    #[test]
    fn test_message_larger_than_buffer() {
        let mut inbound = vec![0x82, 0x7E, 0x01, 0x2C]; // 300 bytes
        inbound.extend_from_slice(&[0xAA; 300]);
        let (mut rx, mut tx) = ([0u8; 384], [0u8; 512]);
        let mut client = open(MockStream::server(inbound), &Endpoint::DEFAULT, &mut rx, &mut tx);
        assert_eq!(block_on(client.next_event()), Err(WsError::FrameTooLarge));
    }

    #[test]
    fn test_client_close_sends_normal_closure_once() {
        let (mut rx, mut tx) = ([0u8; 512], [0u8; 512]);
        let mut client = open(MockStream::server(Vec::new()), &Endpoint::DEFAULT, &mut rx, &mut tx);
        block_on(client.close()).unwrap();
        block_on(client.close()).unwrap();

        let stream = client.into_inner();
        let (opcode, payload, rest) = unmask_client_frame(stream.frames_sent());
        assert_eq!(opcode, 0x8);
        assert_eq!(payload, [0x03, 0xE8]);
        assert!(rest.is_empty());
    }
}
