//! Frame codec for the shared-medium protocol.
//!
//! A frame on the medium looks like:
//!
//! ```text
//! <ROLE_INDICATOR>TYPE:<type>\n<content><SEPARATOR><residual>
//! ```
//!
//! The indicators and the separator are reserved. No escaping is performed,
//! so payloads containing any of them will not survive a round trip.

use crate::types::{Frame, Role};

/// Prefix of frames the client writes for the server
pub const SERVER_INDICATOR: &str = "##DMDCGPT_SERVER##";

/// Prefix of frames the server writes for the client
pub const CLIENT_INDICATOR: &str = "##DMDCGPT_CLIENT##";

/// Boundary between the frame body and the residual content
pub const MESSAGE_SEPARATOR: &str = "##MSG_SEP##";

const TYPE_HEADER: &str = "TYPE:";

fn indicator(role: Role) -> &'static str {
    match role {
        Role::Server => SERVER_INDICATOR,
        Role::Client => CLIENT_INDICATOR,
    }
}

/// True if `raw` carries a request for the server
pub fn is_request_frame(raw: &str) -> bool {
    !raw.is_empty() && raw.starts_with(SERVER_INDICATOR)
}

/// True if `raw` carries a response for the client
pub fn is_response_frame(raw: &str) -> bool {
    !raw.is_empty() && raw.starts_with(CLIENT_INDICATOR)
}

/// Decode a request frame. Returns `None` for ordinary medium content.
pub fn decode_request(raw: &str) -> Option<Frame> {
    decode(Role::Server, raw)
}

/// Decode a response frame. Returns `None` for ordinary medium content.
pub fn decode_response(raw: &str) -> Option<Frame> {
    decode(Role::Client, raw)
}

/// Decode a frame authored for `role`.
///
/// A frame without a separator still decodes: everything after the
/// indicator becomes the content and the residual is empty.
pub fn decode(role: Role, raw: &str) -> Option<Frame> {
    let body = raw.strip_prefix(indicator(role))?;

    let Some((message, residual)) = body.split_once(MESSAGE_SEPARATOR) else {
        return Some(Frame::new(role, "", body, ""));
    };

    let (kind, content) = split_header(message);
    Some(Frame::new(role, kind, content, residual))
}

/// Split `TYPE:<type>\n<content>` into its parts.
///
/// Falls back to an untyped message when the first line is empty or is not a
/// `TYPE:` header.
fn split_header(message: &str) -> (&str, &str) {
    match message.find('\n') {
        Some(newline) if newline > 0 => {
            let header = &message[..newline];
            match header.strip_prefix(TYPE_HEADER) {
                Some(kind) => (kind, &message[newline + 1..]),
                None => ("", message),
            }
        }
        _ => ("", message),
    }
}

/// Encode a frame for the medium
pub fn encode(role: Role, kind: &str, content: &str, residual: Option<&str>) -> String {
    let residual = residual.unwrap_or("");
    let mut out = String::with_capacity(
        CLIENT_INDICATOR.len()
            + TYPE_HEADER.len()
            + kind.len()
            + content.len()
            + MESSAGE_SEPARATOR.len()
            + residual.len()
            + 1,
    );
    out.push_str(indicator(role));
    out.push_str(TYPE_HEADER);
    out.push_str(kind);
    out.push('\n');
    out.push_str(content);
    out.push_str(MESSAGE_SEPARATOR);
    out.push_str(residual);
    out
}

/// True if `text` contains any reserved token and therefore cannot be
/// carried verbatim inside a frame
pub fn contains_reserved_token(text: &str) -> bool {
    text.contains(SERVER_INDICATOR)
        || text.contains(CLIENT_INDICATOR)
        || text.contains(MESSAGE_SEPARATOR)
}
