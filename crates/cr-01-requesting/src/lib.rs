//! # Requesting
//!
//! Turns one-way typed messages into a call/response protocol with a single
//! peer.
//!
//! ```text
//!  caller ──start_async_request──► ChannelRequester ──"svc::request"──► peer
//!                                        ▲                               │
//!  callback ◄──AsyncRequestState ◄── pop(id) ◄───"svc::response"─────────┘
//! ```
//!
//! The mirror image, `ChannelRequestReceiver`, answers requests coming from
//! the peer through a user supplied `RequestHandler`.
//!
//! ## Guarantees
//!
//! - Every request resolves exactly once: `Succeeded`, `Failed` or `Canceled`.
//! - Responses are matched by `RequestId` only; late ones are dropped.
//! - Detaching or dropping a requester fails whatever is still pending.
//! - Blocking calls need a `BlockingToken`, which the channel thread cannot get.

pub mod async_request;
pub mod error;
pub mod messages;
pub mod receiver;
pub mod remote_call;
pub mod request_id;
pub mod request_result;
pub mod requester;
pub mod storage;

pub use async_request::{AsyncRequest, AsyncRequestCallback, AsyncRequestState};
pub use error::RequestingError;
pub use messages::{
    request_message_type, response_message_type, RequestMessageData, ResponseMessageData,
};
pub use receiver::{
    ChannelRequestReceiver, RequestHandler, RequestReceiver, ResultCallback,
    RESULT_CALLBACK_DROPPED_MESSAGE,
};
pub use remote_call::{RemoteCallAdaptor, RemoteCallMessage};
pub use request_id::RequestId;
pub use request_result::{RequestResult, RequestResultStatus, REQUEST_CANCELED_MESSAGE};
pub use requester::{
    ChannelRequester, Requester, RequesterStats, REQUESTER_DESTROYED_MESSAGE,
    REQUESTER_DETACHED_MESSAGE,
};
pub use storage::RequestsStorage;
