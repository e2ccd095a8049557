//! Scribel - 书籍自动续写服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Project Context: 项目/章节/导演笔记管理上下文
//! - Job Context: 自动续写任务上下文
//! - Narrative: 叙事上下文构建（纯逻辑）
//!
//! 应用层 (application/):
//! - Ports: 端口定义（Repositories, GenerationEngine, QualityScorer, JobControl, TokenVerifier）
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Memory: JobControl 内存实现
//! - Worker: JobWorker 后台章节生成编排
//! - Persistence: SQLite 存储
//! - Adapters: LLM 生成客户端、评分客户端、Token 校验
//! - Events: WebSocket 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
