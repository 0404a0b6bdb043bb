//! 接口层
//!
//! 对外暴露的举报接口，请求和响应都可以直接序列化为 JSON

pub mod flag_api;

pub use flag_api::{
    ActionResponse, Caller, FlagApi, FlagDetail, FlagDetailsResponse, FlagStatusResponse, FlaggedQuestionSummary,
    FlaggedQuestionsResponse, ListFlaggedRequest, SaveFieldRequest, SaveFieldResponse, SubmitFlagRequest,
    SubmitFlagResponse, UpdateFlagStatusRequest,
};
