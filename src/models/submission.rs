use serde::{Deserialize, Serialize};

/// 从页面上解析出的一条提交（尚未绑定题目）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub student_name: String,
    pub content: String,
}

impl Submission {
    pub fn new(student_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            student_name: student_name.into(),
            content: content.into(),
        }
    }
}

/// 数据库中的一行提交记录
///
/// 身份键为 (student_name, question)，由存储层的唯一约束保证。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: i64,
    pub student_name: String,
    pub code: String,
    pub question: String,
    pub llm_response: Option<String>,
}

/// 分页游标，只用于判断翻页是否真正完成，不持久化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    /// 当前页码（从 1 开始）
    pub page_number: u32,
    /// 翻页前看到的第一个学生姓名
    pub last_seen_first_student_name: Option<String>,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            page_number: 1,
            last_seen_first_student_name: None,
        }
    }
}
