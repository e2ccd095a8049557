//! Project Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{BookBible, ProjectError, ProjectId, ProjectSettings, ProjectTitle};

/// Project 聚合根
///
/// 不变量:
/// - owner 唯一且不可变更
/// - 仅 owner 可修改 settings / 删除项目
/// - owner + collaborators 可修改内容（章节、笔记、圣经内容）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    owner_id: String,
    title: ProjectTitle,
    collaborators: BTreeSet<String>,
    settings: ProjectSettings,
    bible: Option<BookBible>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Project {
    /// 创建新项目
    pub fn new(owner_id: impl Into<String>, title: ProjectTitle) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            owner_id: owner_id.into(),
            title,
            collaborators: BTreeSet::new(),
            settings: ProjectSettings::default(),
            bible: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 判断是否为 owner
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// 判断是否为项目成员（owner 或 collaborator）
    pub fn is_member(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.collaborators.contains(user_id)
    }

    /// 添加协作者（owner 自身不允许加入协作者列表）
    pub fn add_collaborator(&mut self, user_id: impl Into<String>) -> Result<(), ProjectError> {
        let user_id = user_id.into();
        if user_id == self.owner_id {
            return Err(ProjectError::InvalidCollaborator(
                "owner 不能作为协作者".to_string(),
            ));
        }
        self.collaborators.insert(user_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 移除协作者
    pub fn remove_collaborator(&mut self, user_id: &str) -> bool {
        let removed = self.collaborators.remove(user_id);
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// 更新项目设置
    pub fn update_settings(&mut self, settings: ProjectSettings) {
        self.settings = settings;
        self.updated_at = Utc::now();
    }

    /// 更新书籍圣经
    ///
    /// 乐观并发: expected_version 必须等于当前圣经版本（首次写入为 0）
    pub fn update_bible(
        &mut self,
        content: String,
        expected_version: u32,
        ai_expanded: bool,
    ) -> Result<u32, ProjectError> {
        let current_version = self.bible.as_ref().map(|b| b.version).unwrap_or(0);
        if expected_version != current_version {
            return Err(ProjectError::BibleVersionConflict {
                expected: expected_version,
                actual: current_version,
            });
        }

        let new_version = current_version + 1;
        self.bible = Some(BookBible {
            content,
            version: new_version,
            ai_expanded,
            updated_at: Utc::now(),
        });
        self.updated_at = Utc::now();
        Ok(new_version)
    }

    // Getters
    pub fn id(&self) -> &ProjectId {
        &self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn title(&self) -> &ProjectTitle {
        &self.title
    }

    pub fn collaborators(&self) -> &BTreeSet<String> {
        &self.collaborators
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn bible(&self) -> Option<&BookBible> {
        self.bible.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        Project::new("user-1", ProjectTitle::new("测试项目").unwrap())
    }

    #[test]
    fn test_membership() {
        let mut project = sample_project();
        assert!(project.is_owner("user-1"));
        assert!(project.is_member("user-1"));
        assert!(!project.is_member("user-2"));

        project.add_collaborator("user-2").unwrap();
        assert!(project.is_member("user-2"));
        assert!(!project.is_owner("user-2"));
    }

    #[test]
    fn test_owner_cannot_be_collaborator() {
        let mut project = sample_project();
        assert!(project.add_collaborator("user-1").is_err());
    }

    #[test]
    fn test_bible_optimistic_concurrency() {
        let mut project = sample_project();

        // 首次写入 expected_version = 0
        let v1 = project.update_bible("设定 v1".to_string(), 0, false).unwrap();
        assert_eq!(v1, 1);

        // 基于过期版本的写入被拒绝
        let conflict = project.update_bible("设定 v2".to_string(), 0, false);
        assert!(conflict.is_err());

        let v2 = project.update_bible("设定 v2".to_string(), 1, true).unwrap();
        assert_eq!(v2, 2);
        assert!(project.bible().unwrap().ai_expanded);
    }
}
