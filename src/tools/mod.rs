//! Tool dispatcher
//!
//! Executes the function calls the remote model may request during a live
//! session. Every call produces exactly one textual result; failures are
//! folded into apologetic strings so the conversation never dies on a tool.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Local, Utc};

use crate::alarm::AlarmScheduler;
use crate::services::{TextRequest, TextService};
use crate::session::events::ToolCallRequest;

/// Web search tool name
pub const SEARCH_INTERNET: &str = "search_internet";
/// Reminder tool name
pub const SET_REMINDER: &str = "set_reminder";
/// Deep sleep tool name
pub const ENTER_DEEP_SLEEP: &str = "enter_deep_sleep";

/// Result of one dispatched tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReply {
    /// Text sent back to the model as the tool response
    pub response: String,
    /// The model asked Mochi to enter deep sleep this turn
    pub request_deep_sleep: bool,
}

impl ToolReply {
    fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            request_deep_sleep: false,
        }
    }
}

/// Executes named tool calls from the live session
pub struct ToolDispatcher {
    search: Arc<TextService>,
    scheduler: Arc<AlarmScheduler>,
}

impl ToolDispatcher {
    #[must_use]
    pub fn new(search: Arc<TextService>, scheduler: Arc<AlarmScheduler>) -> Self {
        Self { search, scheduler }
    }

    /// Function declarations advertised to the model at session setup
    #[must_use]
    pub fn declarations() -> serde_json::Value {
        serde_json::json!([
            {
                "functionDeclarations": [
                    {
                        "name": SEARCH_INTERNET,
                        "description": "Tìm kiếm thông tin trên internet và trả lời ngắn gọn.",
                        "parameters": {
                            "type": "object",
                            "properties": {
                                "query": { "type": "string", "description": "Nội dung cần tìm" }
                            },
                            "required": ["query"]
                        }
                    },
                    {
                        "name": SET_REMINDER,
                        "description": "Đặt lời nhắc sau một số phút.",
                        "parameters": {
                            "type": "object",
                            "properties": {
                                "delay_minutes": { "type": "number", "description": "Số phút kể từ bây giờ" },
                                "label": { "type": "string", "description": "Nội dung lời nhắc" }
                            },
                            "required": ["delay_minutes", "label"]
                        }
                    },
                    {
                        "name": ENTER_DEEP_SLEEP,
                        "description": "Chuyển Mochi sang chế độ ngủ sâu tiết kiệm điện.",
                        "parameters": { "type": "object", "properties": {} }
                    }
                ]
            }
        ])
    }

    /// Execute one tool call. Never fails past this boundary.
    pub async fn dispatch(&self, call: &ToolCallRequest) -> ToolReply {
        tracing::info!(id = %call.id, name = %call.name, "dispatching tool call");

        match call.name.as_str() {
            SEARCH_INTERNET => self.search_internet(&call.args).await,
            SET_REMINDER => self.set_reminder(&call.args),
            ENTER_DEEP_SLEEP => ToolReply {
                response: "Mochi sẽ chuyển sang chế độ ngủ sâu.".to_string(),
                request_deep_sleep: true,
            },
            other => {
                tracing::warn!(name = other, "unknown tool requested");
                ToolReply::text("Xin lỗi, Mochi không hỗ trợ công cụ này.")
            }
        }
    }

    async fn search_internet(&self, args: &serde_json::Value) -> ToolReply {
        let Some(query) = args.get("query").and_then(|v| v.as_str()) else {
            return ToolReply::text("Xin lỗi, yêu cầu tìm kiếm không hợp lệ.");
        };

        let request = TextRequest::prompt(format!(
            "Trả lời ngắn gọn, thân thiện cho câu hỏi sau: {query}"
        ))
        .with_web_search();

        match self.search.generate(request).await {
            Ok(answer) => ToolReply::text(answer),
            Err(e) => {
                tracing::warn!(error = %e, "search tool failed");
                ToolReply::text("Xin lỗi, Mochi không tìm được thông tin lúc này.")
            }
        }
    }

    fn set_reminder(&self, args: &serde_json::Value) -> ToolReply {
        let delay_minutes = args.get("delay_minutes").and_then(serde_json::Value::as_f64);
        let label = args.get("label").and_then(|v| v.as_str());

        let (Some(delay_minutes), Some(label)) = (delay_minutes, label) else {
            return ToolReply::text("Xin lỗi, yêu cầu đặt lời nhắc không hợp lệ.");
        };

        #[allow(clippy::cast_possible_truncation)]
        let fire_at = Utc::now() + ChronoDuration::seconds((delay_minutes * 60.0) as i64);

        match self.scheduler.set_alarm(fire_at, label) {
            Some(_) => {
                let local = fire_at.with_timezone(&Local);
                ToolReply::text(format!(
                    "Đã đặt lời nhắc \"{label}\" lúc {}.",
                    local.format("%H:%M")
                ))
            }
            None => ToolReply::text("Xin lỗi, Mochi không đặt được lời nhắc đó."),
        }
    }
}
