use serde::{Deserialize, Serialize};

use gatekeep_model::{
    AgendaId, AttendeeId, CheckOutStatusId, EventId, SessionAreaId,
};

/// Standard `{data, meta}` response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data, meta: None }
    }

    pub fn paginated(data: T, pagination: PaginationMeta) -> Self {
        Self {
            data,
            meta: Some(ResponseMeta {
                pagination: Some(pagination),
            }),
        }
    }

    pub fn pagination(&self) -> Option<&PaginationMeta> {
        self.meta.as_ref().and_then(|meta| meta.pagination.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    #[serde(alias = "currentPage")]
    pub current_page: u32,
    #[serde(alias = "totalPages")]
    pub total_pages: u32,
    #[serde(alias = "totalCount")]
    pub total_count: u64,
}

/// Error body returned with non-2xx responses. Servers use either key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .filter(|message| !message.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutRequest {
    #[serde(rename = "statusId")]
    pub status_id: CheckOutStatusId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCheckInRequest {
    pub event_user_ids: Vec<AttendeeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGateRequest {
    pub event_id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_area_id: Option<SessionAreaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agenda_id: Option<AgendaId>,
}
