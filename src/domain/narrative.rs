//! 叙事上下文构建器
//!
//! 为每次章节生成组装有界大小的叙事状态：
//! 近期章节保留全文（带单章截断），更早章节压缩为摘要，
//! 并跟踪反复出现的专名作为连续性事实。
//! 上下文大小随章节数增长而优雅降级，不会无界膨胀。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 默认全文保留的近期章节数
pub const DEFAULT_RECENT_WINDOW: usize = 3;

/// 默认单章全文截断字符数
pub const DEFAULT_CHAPTER_EXCERPT_CHARS: usize = 6000;

/// 默认单章摘要预算字符数
pub const DEFAULT_SUMMARY_BUDGET_CHARS: usize = 400;

/// 结尾信号检测扫描的末尾字符数
const ENDING_SCAN_CHARS: usize = 200;

/// 叙事上下文配置
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    /// 全文保留的近期章节数
    pub recent_window: usize,
    /// 近期章节单章最大字符数（超出部分截断）
    pub chapter_excerpt_chars: usize,
    /// 更早章节的摘要预算（head + tail 摘录）
    pub summary_budget_chars: usize,
    /// 结尾标记列表（命中即视为叙事自然完结）
    pub ending_markers: Vec<String>,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_WINDOW,
            chapter_excerpt_chars: DEFAULT_CHAPTER_EXCERPT_CHARS,
            summary_budget_chars: DEFAULT_SUMMARY_BUDGET_CHARS,
            ending_markers: vec![
                "the end".to_string(),
                "全书完".to_string(),
                "（完）".to_string(),
                "fin.".to_string(),
            ],
        }
    }
}

/// 已接受章节的摘要信息（构建器内部状态）
#[derive(Debug, Clone)]
struct ChapterFacts {
    title: String,
    summary: String,
    excerpt: String,
    names: Vec<String>,
}

/// 项目级生成约束（来自项目设置与圣经）
#[derive(Debug, Clone, Default)]
pub struct ProjectBrief {
    pub title: String,
    pub genre: Option<String>,
    pub style_guide: Option<String>,
    pub bible: Option<String>,
    pub target_chapter_words: u32,
}

/// 一次生成尝试的上下文快照
///
/// 派生的临时对象，不独立持久化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeContext {
    /// 已提交章节数
    pub chapters_completed: u32,
    /// 待生成的章节编号
    pub next_chapter: u32,
    /// 目标总章节数
    pub target_chapters: u32,
    /// 更早章节的压缩摘要（按章节编号升序）
    pub summaries: Vec<ChapterSummary>,
    /// 近期章节全文（按章节编号升序）
    pub recent_chapters: Vec<RecentChapter>,
    /// 连续性事实：反复出现的专名
    pub continuity_names: Vec<String>,
    /// 文风指南
    pub style_guide: Option<String>,
    /// 书籍圣经
    pub bible: Option<String>,
    /// 上一次被拒稿的评委反馈（重试时注入）
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub number: u32,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentChapter {
    pub number: u32,
    pub title: String,
    pub content: String,
}

impl NarrativeContext {
    /// 渲染为生成提示词
    pub fn render_prompt(&self, brief: &ProjectBrief) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "You are ghost-writing chapter {} of {} for the book \"{}\".\n",
            self.next_chapter, self.target_chapters, brief.title
        ));
        if let Some(genre) = &brief.genre {
            prompt.push_str(&format!("Genre: {}\n", genre));
        }
        prompt.push_str(&format!(
            "Target length: about {} words.\n",
            brief.target_chapter_words
        ));

        if let Some(bible) = &self.bible {
            prompt.push_str("\n## Book bible\n");
            prompt.push_str(bible);
            prompt.push('\n');
        }
        if let Some(style) = &self.style_guide {
            prompt.push_str("\n## Style guide\n");
            prompt.push_str(style);
            prompt.push('\n');
        }

        if !self.continuity_names.is_empty() {
            prompt.push_str("\n## Recurring names (keep consistent)\n");
            prompt.push_str(&self.continuity_names.join(", "));
            prompt.push('\n');
        }

        if !self.summaries.is_empty() {
            prompt.push_str("\n## Earlier chapters (summaries)\n");
            for s in &self.summaries {
                prompt.push_str(&format!("Chapter {} \"{}\": {}\n", s.number, s.title, s.summary));
            }
        }

        if !self.recent_chapters.is_empty() {
            prompt.push_str("\n## Most recent chapters (verbatim)\n");
            for c in &self.recent_chapters {
                prompt.push_str(&format!("### Chapter {}: {}\n{}\n", c.number, c.title, c.content));
            }
        }

        if let Some(feedback) = &self.feedback {
            prompt.push_str("\n## Reviewer feedback on the rejected draft (address this)\n");
            prompt.push_str(feedback);
            prompt.push('\n');
        }

        prompt.push_str(&format!("\nWrite chapter {} now.\n", self.next_chapter));
        prompt
    }
}

/// 叙事上下文构建器
///
/// 在任务生命周期内跟踪已接受章节的状态；
/// record_chapter 对同一章节编号幂等（覆盖而非追加）
#[derive(Debug)]
pub struct ContextBuilder {
    config: NarrativeConfig,
    chapters: BTreeMap<u32, ChapterFacts>,
}

impl ContextBuilder {
    pub fn new(config: NarrativeConfig) -> Self {
        Self {
            config,
            chapters: BTreeMap::new(),
        }
    }

    /// 记录一章已接受的内容
    ///
    /// 对同一编号重复调用会覆盖之前的记录
    pub fn record_chapter(&mut self, number: u32, title: &str, content: &str) {
        let facts = ChapterFacts {
            title: title.to_string(),
            summary: compress_text(content, self.config.summary_budget_chars),
            excerpt: truncate_chars(content, self.config.chapter_excerpt_chars),
            names: extract_recurring_names(content),
        };
        self.chapters.insert(number, facts);
    }

    /// 已记录的章节数
    pub fn chapters_recorded(&self) -> usize {
        self.chapters.len()
    }

    /// 构建下一章的上下文快照
    pub fn build(
        &self,
        brief: &ProjectBrief,
        next_chapter: u32,
        target_chapters: u32,
        feedback: Option<String>,
    ) -> NarrativeContext {
        let total = self.chapters.len();
        let recent_start = total.saturating_sub(self.config.recent_window);

        let mut summaries = Vec::new();
        let mut recent_chapters = Vec::new();
        for (i, (number, facts)) in self.chapters.iter().enumerate() {
            if i < recent_start {
                summaries.push(ChapterSummary {
                    number: *number,
                    title: facts.title.clone(),
                    summary: facts.summary.clone(),
                });
            } else {
                recent_chapters.push(RecentChapter {
                    number: *number,
                    title: facts.title.clone(),
                    content: facts.excerpt.clone(),
                });
            }
        }

        // 跨章节聚合专名出现次数，出现两章及以上视为连续性事实
        let mut name_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for facts in self.chapters.values() {
            for name in &facts.names {
                *name_counts.entry(name.as_str()).or_insert(0) += 1;
            }
        }
        let continuity_names: Vec<String> = name_counts
            .into_iter()
            .filter(|(_, count)| *count >= 2)
            .map(|(name, _)| name.to_string())
            .collect();

        NarrativeContext {
            chapters_completed: total as u32,
            next_chapter,
            target_chapters,
            summaries,
            recent_chapters,
            continuity_names,
            style_guide: brief.style_guide.clone(),
            bible: brief.bible.clone(),
            feedback,
        }
    }
}

/// 结尾信号检测
///
/// 只扫描文本末尾一段，避免正文中引用标记造成误判；忽略大小写
pub fn detect_ending(content: &str, markers: &[String]) -> bool {
    let chars: Vec<char> = content.chars().collect();
    let tail_start = chars.len().saturating_sub(ENDING_SCAN_CHARS);
    let tail: String = chars[tail_start..].iter().collect::<String>().to_lowercase();

    markers
        .iter()
        .any(|marker| !marker.is_empty() && tail.contains(&marker.to_lowercase()))
}

/// 压缩文本为 head + tail 摘录
///
/// 预算一半给开头、一半给结尾，中间以省略号衔接
fn compress_text(content: &str, budget_chars: usize) -> String {
    let trimmed = content.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= budget_chars {
        return trimmed.to_string();
    }

    let half = budget_chars / 2;
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{} […] {}", head.trim_end(), tail.trim_start())
}

/// 按字符数截断
fn truncate_chars(content: &str, max_chars: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= max_chars {
        return content.to_string();
    }
    chars[..max_chars].iter().collect()
}

/// 提取候选专名
///
/// 启发式：非句首的大写开头单词，去重保序。
/// 对 CJK 文本无效，此时连续性依赖近期章节全文窗口
fn extract_recurring_names(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut sentence_start = true;

    for word in content.split_whitespace() {
        let cleaned: String = word
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '\'')
            .collect();

        if cleaned.is_empty() {
            continue;
        }

        let is_capitalized = cleaned.chars().next().is_some_and(|c| c.is_uppercase());
        if is_capitalized && !sentence_start && !names.iter().any(|n| n == &cleaned) {
            names.push(cleaned);
        }

        sentence_start = word.ends_with(['.', '!', '?', '。', '！', '？']);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief() -> ProjectBrief {
        ProjectBrief {
            title: "Night Train".to_string(),
            genre: Some("thriller".to_string()),
            style_guide: Some("short sentences".to_string()),
            bible: None,
            target_chapter_words: 2000,
        }
    }

    #[test]
    fn test_recent_window_and_summaries() {
        let config = NarrativeConfig {
            recent_window: 2,
            ..Default::default()
        };
        let mut builder = ContextBuilder::new(config);
        for n in 1..=5 {
            builder.record_chapter(n, &format!("Chapter {}", n), "Some content here.");
        }

        let ctx = builder.build(&brief(), 6, 10, None);
        assert_eq!(ctx.chapters_completed, 5);
        // 前 3 章压缩为摘要，后 2 章保留全文
        assert_eq!(ctx.summaries.len(), 3);
        assert_eq!(ctx.recent_chapters.len(), 2);
        assert_eq!(ctx.summaries[0].number, 1);
        assert_eq!(ctx.recent_chapters[0].number, 4);
        assert_eq!(ctx.recent_chapters[1].number, 5);
    }

    #[test]
    fn test_record_chapter_is_idempotent() {
        let mut builder = ContextBuilder::new(NarrativeConfig::default());
        builder.record_chapter(1, "v1", "first version");
        builder.record_chapter(1, "v2", "second version");

        assert_eq!(builder.chapters_recorded(), 1);
        let ctx = builder.build(&brief(), 2, 5, None);
        assert_eq!(ctx.recent_chapters[0].title, "v2");
    }

    #[test]
    fn test_continuity_names_need_two_chapters() {
        let mut builder = ContextBuilder::new(NarrativeConfig::default());
        builder.record_chapter(1, "c1", "The detective met Mara at the station.");
        builder.record_chapter(2, "c2", "Later that night Mara vanished again.");
        builder.record_chapter(3, "c3", "He questioned a stranger named Voss.");

        let ctx = builder.build(&brief(), 4, 10, None);
        assert!(ctx.continuity_names.contains(&"Mara".to_string()));
        // 只出现一章的名字不算连续性事实
        assert!(!ctx.continuity_names.contains(&"Voss".to_string()));
    }

    #[test]
    fn test_compress_text_respects_budget() {
        let long: String = "abcdefghij".repeat(100);
        let compressed = compress_text(&long, 100);
        assert!(compressed.chars().count() < 120);
        assert!(compressed.contains("[…]"));

        // 短文本原样保留
        assert_eq!(compress_text("short", 100), "short");
    }

    #[test]
    fn test_detect_ending_scans_tail_only() {
        let markers = NarrativeConfig::default().ending_markers;

        assert!(detect_ending("冒险结束了。全书完", &markers));
        assert!(detect_ending("And so it was over. THE END", &markers));
        assert!(!detect_ending("平平无奇的一章结尾", &markers));

        // 标记出现在正文开头不算结尾信号
        let mut text = "the end was near, he thought. ".to_string();
        text.push_str(&"далее ".repeat(100));
        assert!(!detect_ending(&text, &markers));
    }

    #[test]
    fn test_feedback_reaches_prompt() {
        let builder = ContextBuilder::new(NarrativeConfig::default());
        let ctx = builder.build(&brief(), 1, 3, Some("pacing too slow".to_string()));
        let prompt = ctx.render_prompt(&brief());

        assert!(prompt.contains("pacing too slow"));
        assert!(prompt.contains("chapter 1 of 3"));
        assert!(prompt.contains("short sentences"));
    }
}
