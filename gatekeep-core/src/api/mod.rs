//! Wire-level contract with the remote roster service.

pub mod routes;
pub mod types;

pub use types::{
    BulkCheckInRequest, CheckOutRequest, CreateGateRequest, DataEnvelope,
    ErrorBody, PaginationMeta, ResponseMeta,
};
