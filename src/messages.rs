//! Request and reply messages exchanged along the tree.

use std::fmt;

use crate::curve::{
    point_from_bytes, point_to_bytes, scalar_from_bytes, scalar_to_bytes, Point, POINT_LEN,
    SCALAR_LEN,
};
use crate::encoding::{Reader, Writer};
use crate::proof::Proof;
use crate::reencrypt::PartialShare;
use crate::types::{Error, Wire};

const TAG_REENCRYPT: u8 = 0;
const TAG_REPLY: u8 = 1;

const REPLY_REFUSED: u8 = 0;
const REPLY_SHARE: u8 = 1;

/// Unit of work for one protocol run: re-encrypt `U` towards `Xc`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReencryptRequest {
    pub ciphertext_point: Option<Point>,
    pub client_key: Point,
    /// Opaque data handed to the policy hook.
    pub verification_data: Option<Vec<u8>>,
}

impl ReencryptRequest {
    pub fn new(ciphertext_point: Point, client_key: Point) -> Self {
        Self {
            ciphertext_point: Some(ciphertext_point),
            client_key,
            verification_data: None,
        }
    }

    pub fn with_verification_data(mut self, data: Vec<u8>) -> Self {
        // Empty data is treated as absent.
        self.verification_data = if data.is_empty() { None } else { Some(data) };
        self
    }

    pub fn id(&self) -> RequestId {
        RequestId(*blake3::hash(&self.encode()).as_bytes())
    }
}

/// Identity of a run, derived from the encoded request.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub [u8; 32]);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({self})")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReencryptReply {
    Share { share: PartialShare, proof: Proof },
    /// The node's policy hook declined the request.
    Refused,
}

impl ReencryptReply {
    pub fn is_refusal(&self) -> bool {
        matches!(self, ReencryptReply::Refused)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolMessage {
    Reencrypt(ReencryptRequest),
    Reply(ReencryptReply),
}

impl Wire for ReencryptRequest {
    fn encode(&self) -> Vec<u8> {
        let mut w = match &self.ciphertext_point {
            Some(u) => Writer::new().u8(1).fixed(&point_to_bytes(u)),
            None => Writer::new().u8(0),
        };
        w = w.fixed(&point_to_bytes(&self.client_key));
        w = match &self.verification_data {
            Some(data) => w.u8(1).bytes(data).expect("length must fit u32"),
            None => w.u8(0),
        };
        w.finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(bytes);
        let ciphertext_point = match r.u8()? {
            0 => None,
            1 => Some(point_from_bytes(&r.fixed::<POINT_LEN>()?)?),
            _ => return Err(Error::InvalidEncoding),
        };
        let client_key = point_from_bytes(&r.fixed::<POINT_LEN>()?)?;
        let verification_data = match r.u8()? {
            0 => None,
            1 => Some(r.bytes()?.to_vec()),
            _ => return Err(Error::InvalidEncoding),
        };
        r.finish()?;
        Ok(ReencryptRequest {
            ciphertext_point,
            client_key,
            verification_data,
        })
    }
}

impl Wire for ReencryptReply {
    fn encode(&self) -> Vec<u8> {
        match self {
            ReencryptReply::Refused => Writer::new().u8(REPLY_REFUSED).finish(),
            ReencryptReply::Share { share, proof } => Writer::new()
                .u8(REPLY_SHARE)
                .u32(share.index)
                .fixed(&point_to_bytes(&share.value))
                .fixed(&scalar_to_bytes(&proof.challenge))
                .fixed(&scalar_to_bytes(&proof.response))
                .finish(),
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(bytes);
        let reply = match r.u8()? {
            REPLY_REFUSED => ReencryptReply::Refused,
            REPLY_SHARE => {
                let index = r.u32()?;
                let value = point_from_bytes(&r.fixed::<POINT_LEN>()?)?;
                let challenge = scalar_from_bytes(&r.fixed::<SCALAR_LEN>()?)?;
                let response = scalar_from_bytes(&r.fixed::<SCALAR_LEN>()?)?;
                ReencryptReply::Share {
                    share: PartialShare { index, value },
                    proof: Proof {
                        challenge,
                        response,
                    },
                }
            }
            _ => return Err(Error::InvalidEncoding),
        };
        r.finish()?;
        Ok(reply)
    }
}

impl Wire for ProtocolMessage {
    fn encode(&self) -> Vec<u8> {
        let (tag, body) = match self {
            ProtocolMessage::Reencrypt(req) => (TAG_REENCRYPT, req.encode()),
            ProtocolMessage::Reply(reply) => (TAG_REPLY, reply.encode()),
        };
        let mut out = Vec::with_capacity(1 + body.len());
        out.push(tag);
        out.extend_from_slice(&body);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let (tag, body) = bytes.split_first().ok_or(Error::InvalidEncoding)?;
        match *tag {
            TAG_REENCRYPT => Ok(ProtocolMessage::Reencrypt(ReencryptRequest::decode(body)?)),
            TAG_REPLY => Ok(ProtocolMessage::Reply(ReencryptReply::decode(body)?)),
            _ => Err(Error::InvalidEncoding),
        }
    }
}
