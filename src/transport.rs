//! The transport boundary: frame shape and the injected `Transport` trait.

use crate::error::TransportError;

/// RAN node identity carried on a frame, matching the E2AP MEID structure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Meid {
    pub ran_name: String,
    pub plmn_id: String,
    pub enb_id: String,
}

impl Meid {
    pub fn for_ran(ran_name: impl Into<String>) -> Self {
        Meid {
            ran_name: ran_name.into(),
            ..Default::default()
        }
    }
}

/// Message type codes used on the wire. See `spec.md` §4.D / §6.
pub mod mtype {
    pub const RIC_SUB_REQ: i32 = 12010;
    pub const RIC_SUB_RESP: i32 = 12011;
    pub const RIC_SUB_FAILURE: i32 = 12012;
    pub const RIC_SUB_DEL_REQ: i32 = 12020;
    pub const RIC_SUB_DEL_RESP: i32 = 12021;
    pub const RIC_SUB_DEL_FAILURE: i32 = 12022;
    pub const RIC_INDICATION: i32 = 12050;
}

/// An inbound or outbound frame. Opaque `payload` is whatever the codec
/// produced/expects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub mtype: i32,
    pub sub_id: i32,
    pub meid: Meid,
    pub payload: Vec<u8>,
}

/// Injected transport. Send is assumed safe for concurrent use; inbound
/// frames reach the core by the host calling `Router::consume` (see
/// `crate::router`), not through this trait.
pub trait Transport: Send + Sync {
    fn send(&self, frame: Frame) -> Result<(), TransportError>;

    /// Reply to the last received frame. Part of the interface surface per
    /// `spec.md` §6; unused by the core's current handlers.
    fn reply(&self, frame: Frame) -> Result<(), TransportError>;
}
