//! Messages exchanged between the bridge and its WebSocket clients.
//!
//! The client-facing protocol has no schema.  Inbound frames are opaque and
//! go to the serial device byte for byte.  Outbound frames are either a serial
//! chunk decoded as text, or an error notice of the form `Error: <cause>`.

use std::fmt;

use uuid::Uuid;

/// Identity of one connected WebSocket client.
///
/// Only used as a registry key and in log lines; clients never see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Allocates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message the bridge sends to one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// A chunk received from the serial device, already decoded to text.
    SerialData(String),
    /// A write this client asked for failed; carries the cause.
    WriteFailed(String),
}

impl OutboundMessage {
    /// The exact text of the WebSocket frame for this message.
    pub fn into_text(self) -> String {
        match self {
            Self::SerialData(text) => text,
            Self::WriteFailed(cause) => format!("Error: {cause}"),
        }
    }
}

/// Decodes a serial chunk to text.
///
/// Invalid UTF-8 sequences (for example a multi-byte character split across
/// two chunks) become U+FFFD rather than failing the relay.
pub fn decode_chunk(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_data_text_is_verbatim() {
        let msg = OutboundMessage::SerialData("OK\n".to_string());
        assert_eq!(msg.into_text(), "OK\n");
    }

    #[test]
    fn test_write_failed_text_has_error_prefix() {
        let msg = OutboundMessage::WriteFailed("serial port is not open".to_string());
        assert_eq!(msg.into_text(), "Error: serial port is not open");
    }

    #[test]
    fn test_decode_chunk_ascii() {
        assert_eq!(decode_chunk(b"T:23.50"), "T:23.50");
    }

    #[test]
    fn test_decode_chunk_replaces_invalid_utf8() {
        // Arrange: the first half of a two-byte UTF-8 sequence ("é" = C3 A9).
        let chunk = [b'a', 0xC3];

        // Act
        let text = decode_chunk(&chunk);

        // Assert
        assert_eq!(text, "a\u{FFFD}");
    }

    #[test]
    fn test_client_ids_are_unique() {
        assert_ne!(ClientId::new(), ClientId::new());
    }

    #[test]
    fn test_client_id_display_is_hyphenated_uuid() {
        let text = ClientId::new().to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.matches('-').count(), 4);
    }
}
