//! Frames carrying a serialized [`ParamList`].

use bytes::{Bytes, BytesMut};
use sockrpc_params::ParamList;

use crate::codec::{decode_complete, encode_frame, HEADER_SIZE};
use crate::error::Result;

/// Serialize `params` and append the framed bytes to `dst`.
pub fn encode_params(params: &ParamList, dst: &mut BytesMut) -> Result<()> {
    let payload = params.to_buffer()?;
    encode_frame(&payload, dst)
}

/// Serialize `params` into a standalone frame.
pub fn frame_params(params: &ParamList) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(HEADER_SIZE);
    encode_params(params, &mut dst)?;
    Ok(dst.freeze())
}

/// Validate the header at the start of `src` and rebuild the parameter list.
///
/// `src` must hold everything the peer sent for this message.
pub fn decode_params(src: &[u8], max_payload: usize) -> Result<ParamList> {
    let payload = decode_complete(src, max_payload)?;
    Ok(ParamList::from_buffer(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DEFAULT_MAX_PAYLOAD;
    use crate::error::FrameError;

    #[test]
    fn test_params_survive_framing() {
        let mut request = ParamList::new();
        request.set_string("method", "ping").unwrap();
        request.set_int("params.count", 3).unwrap();

        let frame = frame_params(&request).unwrap();
        let decoded = decode_params(&frame, DEFAULT_MAX_PAYLOAD).unwrap();

        assert_eq!(decoded.get_string("method"), "ping");
        assert_eq!(decoded.get_int("params.count"), Some(3));
    }

    #[test]
    fn test_corrupt_payload_is_params_error() {
        let mut dst = BytesMut::new();
        encode_frame(b"{oops", &mut dst).unwrap();

        let err = decode_params(&dst, DEFAULT_MAX_PAYLOAD).unwrap_err();
        assert!(matches!(err, FrameError::Params(_)));
        assert!(!err.is_invalid_header());
    }
}
