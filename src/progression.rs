//! 功能清单（`PROGRESSION.md` / `TODOLIST.md`）
//!
//! 清单是普通的 markdown：`#` 标题划分章节，每个列表项都是一个复选框
//! `- [x] label` 或 `- [ ] label`。`*`、`+` 和有序列表（`1.`、`1)`）的列表项
//! 同样按复选框解析。非列表的正文和围栏代码块中的内容被忽略。

use std::collections::HashMap;
use std::fmt;

/// 引擎自带的进度清单
pub const PROGRESSION: &str = include_str!("../PROGRESSION.md");
/// 旧的待办清单，与 `PROGRESSION` 基本重复
pub const TODOLIST: &str = include_str!("../TODOLIST.md");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    Done,
    Todo,
}

impl ItemState {
    pub fn is_done(self) -> bool {
        self == ItemState::Done
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub label: String,
    pub state: ItemState,
    /// 1 起始的行号
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// 第一个标题之前的条目归入标题为空的章节
    pub title: String,
    pub level: usize,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecklistError {
    /// 列表项不是合法的复选框
    MalformedItem { line: usize },
}

impl fmt::Display for ChecklistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecklistError::MalformedItem { line } => write!(f, "Malformed checklist item at line {}", line),
        }
    }
}

impl std::error::Error for ChecklistError {}

/// 同一文件内状态不一致的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub label: String,
    pub lines: Vec<usize>,
}

/// 两份清单之间状态不同的条目，`None` 表示该文件中没有这一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDiff {
    pub label: String,
    pub left: Option<ItemState>,
    pub right: Option<ItemState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checklist {
    sections: Vec<Section>,
}

impl Checklist {
    pub fn parse(text: &str) -> Result<Self, ChecklistError> {
        let mut sections: Vec<Section> = Vec::new();
        let mut fence: Option<&str> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();

            if let Some(marker) = fence_marker(trimmed) {
                match fence {
                    Some(open) if open == marker => fence = None,
                    Some(_) => {}
                    None => fence = Some(marker),
                }
                continue;
            }
            if fence.is_some() {
                continue;
            }

            if trimmed.starts_with('#') {
                let level = trimmed.chars().take_while(|c| *c == '#').count();
                sections.push(Section {
                    title: trimmed[level..].trim().to_string(),
                    level,
                    items: Vec::new(),
                });
                continue;
            }

            let Some(rest) = list_item_body(trimmed) else {
                continue;
            };

            let (state, label) = parse_checkbox(rest).ok_or(ChecklistError::MalformedItem { line })?;

            if sections.is_empty() {
                sections.push(Section {
                    title: String::new(),
                    level: 0,
                    items: Vec::new(),
                });
            }
            if let Some(section) = sections.last_mut() {
                section.items.push(ChecklistItem {
                    label: label.to_string(),
                    state,
                    line,
                });
            }
        }

        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    pub fn total(&self) -> usize {
        self.items().count()
    }

    pub fn completed(&self) -> usize {
        self.items().filter(|i| i.state.is_done()).count()
    }

    /// 完成比例，空清单为 0
    pub fn ratio(&self) -> f32 {
        match self.total() {
            0 => 0.0,
            total => self.completed() as f32 / total as f32,
        }
    }

    /// 同一标签出现多次且状态不一致
    pub fn conflicts(&self) -> Vec<Conflict> {
        let mut order: Vec<String> = Vec::new();
        let mut seen: HashMap<String, Vec<&ChecklistItem>> = HashMap::new();

        for item in self.items() {
            let key = normalize(&item.label);
            seen.entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(item);
        }

        order
            .into_iter()
            .filter_map(|key| {
                let items = seen.remove(&key)?;
                let first = items[0].state;
                items.iter().any(|i| i.state != first).then(|| Conflict {
                    label: items[0].label.clone(),
                    lines: items.iter().map(|i| i.line).collect(),
                })
            })
            .collect()
    }

    /// 与另一份清单比较，只在一边出现的条目也会报告
    ///
    /// 同一标签出现多次时，只有全部完成才算完成。
    pub fn diff(&self, other: &Checklist) -> Vec<StateDiff> {
        let left = self.label_states();
        let right = other.label_states();

        let mut diffs = Vec::new();
        for (key, label, state) in &left {
            let other_state = right.iter().find(|(k, _, _)| k == key).map(|(_, _, s)| *s);
            if other_state != Some(*state) {
                diffs.push(StateDiff {
                    label: label.clone(),
                    left: Some(*state),
                    right: other_state,
                });
            }
        }
        for (key, label, state) in &right {
            if !left.iter().any(|(k, _, _)| k == key) {
                diffs.push(StateDiff {
                    label: label.clone(),
                    left: None,
                    right: Some(*state),
                });
            }
        }
        diffs
    }

    /// 按首次出现顺序列出 (规范化标签, 原标签, 合并后的状态)
    fn label_states(&self) -> Vec<(String, String, ItemState)> {
        let mut states: Vec<(String, String, ItemState)> = Vec::new();
        for item in self.items() {
            let key = normalize(&item.label);
            match states.iter_mut().find(|(k, _, _)| *k == key) {
                Some(entry) => {
                    if !item.state.is_done() {
                        entry.2 = ItemState::Todo;
                    }
                }
                None => states.push((key, item.label.clone(), item.state)),
            }
        }
        states
    }
}

/// 围栏代码块的开闭标记
fn fence_marker(line: &str) -> Option<&'static str> {
    if line.starts_with("```") {
        Some("```")
    } else if line.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// 去掉列表标记，返回列表项内容；不是列表项时返回 `None`
fn list_item_body(line: &str) -> Option<&str> {
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(rest);
        }
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") "))
}

/// `[x] label` / `[ ] label`
fn parse_checkbox(rest: &str) -> Option<(ItemState, &str)> {
    let state = match rest.get(..3)? {
        "[x]" | "[X]" => ItemState::Done,
        "[ ]" => ItemState::Todo,
        _ => return None,
    };

    let after = &rest[3..];
    if !after.is_empty() && !after.starts_with(char::is_whitespace) {
        return None;
    }

    let label = after.trim();
    (!label.is_empty()).then_some((state, label))
}

/// 标签比较忽略大小写和多余空白
fn normalize(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Rendering

Some prose that is ignored.

- [x] Instance
- [X] Device
- [ ] Shadow mapping

## ImGui
* [x] Font texture
";

    #[test]
    fn test_parse_sections_and_items() {
        let checklist = Checklist::parse(SAMPLE).unwrap();
        assert_eq!(checklist.sections().len(), 2);
        assert_eq!(checklist.sections()[0].title, "Rendering");
        assert_eq!(checklist.sections()[1].level, 2);
        assert_eq!(checklist.total(), 4);
        assert_eq!(checklist.completed(), 3);
        assert!((checklist.ratio() - 0.75).abs() < 1e-6);

        let shadow = &checklist.sections()[0].items[2];
        assert_eq!(shadow.label, "Shadow mapping");
        assert_eq!(shadow.state, ItemState::Todo);
        assert_eq!(shadow.line, 7);
    }

    #[test]
    fn test_items_before_heading() {
        let checklist = Checklist::parse("- [x] Window\n# Later\n").unwrap();
        assert_eq!(checklist.sections()[0].title, "");
        assert_eq!(checklist.sections()[0].items.len(), 1);
    }

    #[test]
    fn test_malformed_items() {
        assert_eq!(
            Checklist::parse("# A\n- [x] ok\n- [~] bad\n"),
            Err(ChecklistError::MalformedItem { line: 3 })
        );
        assert!(Checklist::parse("- []  empty box").is_err());
        assert!(Checklist::parse("- [x]").is_err());
        assert!(Checklist::parse("- [x]label").is_err());
        assert!(Checklist::parse("- plain bullet").is_err());
    }

    #[test]
    fn test_empty_checklist() {
        let checklist = Checklist::parse("just text\n").unwrap();
        assert_eq!(checklist.total(), 0);
        assert_eq!(checklist.ratio(), 0.0);
    }

    #[test]
    fn test_conflicts() {
        let checklist = Checklist::parse("- [x] Swapchain\n- [ ] Job system\n- [ ] swapchain\n- [ ] Job system\n").unwrap();
        let conflicts = checklist.conflicts();
        assert_eq!(conflicts, vec![Conflict { label: "Swapchain".to_string(), lines: vec![1, 3] }]);
    }

    #[test]
    fn test_diff() {
        let left = Checklist::parse("- [x] Instance\n- [x] Render graph\n- [ ] Shadows\n").unwrap();
        let right = Checklist::parse("- [x] Instance\n- [ ] Render graph\n- [x] Job system\n").unwrap();

        let diff = left.diff(&right);
        assert_eq!(diff.len(), 3);
        assert_eq!(
            diff[0],
            StateDiff { label: "Render graph".to_string(), left: Some(ItemState::Done), right: Some(ItemState::Todo) }
        );
        assert_eq!(diff[1].right, None);
        assert_eq!(diff[2].left, None);
        assert!(left.diff(&left).is_empty());
    }

    #[test]
    fn test_bundled_checklists_are_consistent() {
        let progression = Checklist::parse(PROGRESSION).unwrap();
        let todolist = Checklist::parse(TODOLIST).unwrap();
        assert!(progression.conflicts().is_empty());
        assert!(todolist.conflicts().is_empty());
        assert!(progression.total() > 0);
    }

    #[test]
    fn test_fenced_code_is_ignored() {
        let text = "\
# Notes
- [x] Window
```markdown
- [~] not an item
- plain bullet
```
~~~
* [x] also ignored
~~~
- [ ] Shadows
";
        let checklist = Checklist::parse(text).unwrap();
        let labels: Vec<_> = checklist.items().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["Window", "Shadows"]);
        assert_eq!(checklist.items().last().map(|i| i.line), Some(10));
    }

    #[test]
    fn test_plus_and_ordered_items() {
        let text = "+ [x] Instance\n1. [ ] Device\n2) [X] Queues\n2024. was a year\n";
        let err = Checklist::parse(text).unwrap_err();
        assert_eq!(err, ChecklistError::MalformedItem { line: 4 });

        let checklist = Checklist::parse("+ [x] Instance\n1. [ ] Device\n2) [X] Queues\n").unwrap();
        assert_eq!(checklist.total(), 3);
        assert_eq!(checklist.completed(), 2);
    }
}
