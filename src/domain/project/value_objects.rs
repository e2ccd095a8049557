//! Project Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 项目唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 项目标题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTitle(String);

impl ProjectTitle {
    pub fn new(title: impl Into<String>) -> Result<Self, &'static str> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err("标题不能为空");
        }
        if title.len() > 200 {
            return Err("标题长度不能超过200字符");
        }
        Ok(Self(title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 项目设置
///
/// 生成章节时附带的创作约束，全部可选
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// 题材（如 "thriller"）
    #[serde(default)]
    pub genre: Option<String>,

    /// 文风指南（直接注入生成上下文）
    #[serde(default)]
    pub style_guide: Option<String>,

    /// 单章目标字数
    #[serde(default = "default_target_words")]
    pub target_chapter_words: u32,
}

fn default_target_words() -> u32 {
    2000
}

/// 书籍圣经（Book Bible）
///
/// 项目级的世界观/人物设定文档，带版本号做乐观并发控制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookBible {
    /// 圣经内容
    pub content: String,
    /// 版本号（每次更新 +1）
    pub version: u32,
    /// 是否由 AI 扩写生成
    pub ai_expanded: bool,
    /// 最后修改时间
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_validation() {
        assert!(ProjectTitle::new("长夜列车").is_ok());
        assert!(ProjectTitle::new("").is_err());
        assert!(ProjectTitle::new("   ").is_err());
        assert!(ProjectTitle::new("a".repeat(201)).is_err());
    }
}
