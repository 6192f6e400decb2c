//! 自带功能清单的解析与比对

use asaogea::progression::{Checklist, ChecklistError, ItemState, PROGRESSION, TODOLIST};

#[test]
fn test_progression_has_no_conflicts() {
    let checklist = Checklist::parse(PROGRESSION).unwrap();
    assert!(checklist.total() > 0);
    assert!(checklist.completed() <= checklist.total());
    assert!(checklist.conflicts().is_empty());
}

#[test]
fn test_todolist_lags_behind_progression() {
    let progression = Checklist::parse(PROGRESSION).unwrap();
    let todolist = Checklist::parse(TODOLIST).unwrap();

    let diffs = progression.diff(&todolist);
    assert!(!diffs.is_empty());
    for diff in &diffs {
        assert_eq!(diff.left, Some(ItemState::Done), "{}", diff.label);
        assert_eq!(diff.right, Some(ItemState::Todo), "{}", diff.label);
    }
    assert!(diffs.iter().any(|d| d.label == "Frame graph window"));
}

#[test]
fn test_malformed_item_reports_line() {
    let text = "# Rendering\n- [x] Instance\n- [~] Device\n";
    assert_eq!(Checklist::parse(text), Err(ChecklistError::MalformedItem { line: 3 }));
}
