use bytes::{Buf, Bytes, BytesMut};
use hyper::body::HttpBody;
use hyper::{Body, Uri};
use serde_json::Value;

use crate::{Address, EsError, Params};

/// Reads the full response body into a single contiguous buffer.
pub(crate) async fn read_body(
    mut body: Body,
) -> Result<Bytes, <Body as HttpBody>::Error> {
    // If there's only 1 chunk, we can just return it as is.
    let first = if let Some(buf) = body.data().await {
        buf?
    } else {
        return Ok(Bytes::new());
    };

    let second = if let Some(buf) = body.data().await {
        buf?
    } else {
        return Ok(first);
    };

    // With more than 1 buf, we gotta flatten into a single buffer first.
    let cap =
        first.remaining() + second.remaining() + body.size_hint().lower() as usize;
    let mut buffer = BytesMut::with_capacity(cap);
    buffer.extend_from_slice(&first);
    buffer.extend_from_slice(&second);

    while let Some(buf) = body.data().await {
        buffer.extend_from_slice(&buf?);
    }

    Ok(buffer.freeze())
}

/// Decodes a response body, an empty body decodes to `null`.
pub(crate) fn decode_json(bytes: &[u8]) -> Result<Value, EsError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(bytes)
        .map_err(|e| EsError::Transport(format!("Malformed JSON response: {e}")))
}

/// Builds the full request URI for a path on the given server.
pub(crate) fn build_uri(
    server: &Address,
    path: &str,
    params: Option<&Params>,
) -> Result<Uri, EsError> {
    let mut uri = server.base_url();
    if !path.starts_with('/') {
        uri.push('/');
    }
    uri.push_str(path);

    if let Some(params) = params.filter(|p| !p.is_empty()) {
        uri.push('?');
        uri.push_str(&params.to_query_string());
    }

    uri.parse::<Uri>()
        .map_err(|e| EsError::InvalidParameter(format!("Invalid request URI {uri:?}: {e}")))
}
