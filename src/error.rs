use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 举报提交相关错误
    #[error("举报错误: {0}")]
    Flag(#[from] FlagError),
    /// 审核流程错误
    #[error("审核错误: {0}")]
    Workflow(#[from] WorkflowError),
    /// 字段修改错误
    #[error("字段修改错误: {0}")]
    Patch(#[from] PatchError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 数据库错误
    #[error("数据库错误: {0}")]
    Storage(#[from] sqlx::Error),
    /// 文件读写错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 举报提交相关错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlagError {
    /// 举报原因不在登记表中
    #[error("无效的举报原因: {reason}")]
    InvalidReason { reason: String },
    /// 同一用户重复举报同一题目
    #[error("用户 {user_id} 已经举报过题目 {question_id}")]
    DuplicateFlag { question_id: i64, user_id: i64 },
    /// 题库中不存在该题目
    #[error("题目不存在: {question_id}")]
    QuestionNotFound { question_id: i64 },
}

/// 审核流程错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// 题目没有汇总记录
    #[error("题目 {question_id} 没有举报汇总记录")]
    RollupNotFound { question_id: i64 },
    /// 处理结果代码无效
    #[error("无效的处理结果: {resolution}")]
    InvalidResolution { resolution: String },
    /// 汇总记录已处于终态
    #[error("题目 {question_id} 的举报已关闭 (状态: {status})")]
    AlreadyClosed { question_id: i64, status: String },
    /// 处理意见为空
    #[error("处理意见不能为空")]
    EmptyFeedback,
    /// 未知的审核动作
    #[error("无效的审核动作: {action}")]
    InvalidAction { action: String },
    /// 未知的状态过滤条件
    #[error("无效的状态: {status}")]
    InvalidStatus { status: String },
}

/// 字段修改错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// 答案不属于该题目
    #[error("答案 {answer_id} 不属于题目 {question_id}")]
    AnswerNotOwnedByQuestion { question_id: i64, answer_id: i64 },
    /// 不支持的字段
    #[error("不支持的字段: {field}")]
    UnsupportedField { field: String },
    /// 答案ID无法解析
    #[error("无效的答案ID: {value}")]
    InvalidAnswerId { value: String },
    /// 题库中不存在该题目
    #[error("题目不存在: {question_id}")]
    QuestionNotFound { question_id: i64 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 标签文件读取失败
    #[error("读取标签文件失败 ({path}): {source}")]
    LabelsReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: err,
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON序列化失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建无效举报原因错误
    pub fn invalid_reason(reason: impl Into<String>) -> Self {
        AppError::Flag(FlagError::InvalidReason {
            reason: reason.into(),
        })
    }

    /// 创建汇总记录不存在错误
    pub fn rollup_not_found(question_id: i64) -> Self {
        AppError::Workflow(WorkflowError::RollupNotFound { question_id })
    }

    /// 创建无效处理结果错误
    pub fn invalid_resolution(resolution: impl Into<String>) -> Self {
        AppError::Workflow(WorkflowError::InvalidResolution {
            resolution: resolution.into(),
        })
    }

    /// 创建不支持字段错误
    pub fn unsupported_field(field: impl Into<String>) -> Self {
        AppError::Patch(PatchError::UnsupportedField {
            field: field.into(),
        })
    }

    /// 是否为面向用户的业务错误（而非系统故障）
    ///
    /// 业务错误在接口层转换为 `success = false` 的响应，系统故障继续向上传播。
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::Flag(_) | AppError::Workflow(_) | AppError::Patch(_)
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
