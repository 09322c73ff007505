use pretty_assertions::assert_eq;
use scribe_core::{Document, DocumentHandle, EditModel, RunStyles, ViewOptions};

fn view_over(text: &str) -> (DocumentHandle, EditModel) {
    let doc = DocumentHandle::new(Document::from_text(text));
    let view = EditModel::new(doc.add_ref(), &ViewOptions::default());
    (doc, view)
}

#[test]
fn test_insert_undo_redo_on_empty_document() {
    let doc = DocumentHandle::new(Document::from_text(""));
    let mut d = doc.borrow_mut();

    d.insert_string(0, "hello").unwrap();
    assert_eq!(d.text(), "hello");

    assert_eq!(d.undo().unwrap(), Some(0));
    assert_eq!(d.text(), "");

    assert_eq!(d.redo().unwrap(), Some(5));
    assert_eq!(d.text(), "hello");
}

#[test]
fn test_two_lines_after_multiline_insert() {
    let mut doc = Document::from_text("");
    doc.insert_string(0, "line1\nline2").unwrap();

    assert_eq!(doc.line_count(), 2);
    assert_eq!(doc.get_line(0).unwrap(), "line1");
    assert_eq!(doc.get_line(1).unwrap(), "line2");
    assert_eq!(doc.line_start(1).unwrap(), 6);
}

#[test]
fn test_fill_range_splits_and_compacts_runs() {
    const STYLE_A: u8 = 1;
    const STYLE_B: u8 = 2;

    let mut rs: RunStyles<u8> = RunStyles::new();
    rs.insert_space(0, 10).unwrap();

    assert!(rs.fill_range(0, STYLE_A, 5).unwrap().changed);
    assert!(rs.fill_range(2, STYLE_B, 2).unwrap().changed);

    assert_eq!(rs.run_list(), vec![(2, STYLE_A), (2, STYLE_B), (1, STYLE_A), (5, 0)]);
    assert!(rs.check());
}

#[test]
fn test_delete_in_first_range_shifts_second_range() {
    let (doc, mut view) = view_over("0123456789");
    view.set_selection(0, 3).unwrap();
    view.add_selection(5, 8).unwrap();

    doc.borrow_mut().delete_chars(0, 3).unwrap();
    view.update_from_document();

    let selection = view.selection();
    let ranges = selection.ranges();
    assert_eq!(ranges.len(), 2);
    assert!(ranges[0].is_empty());
    assert_eq!(ranges[0].caret.position(), 0);
    assert_eq!(ranges[1].as_range(), scribe_core::Range::new(2, 5));
}

#[test]
fn test_undo_back_to_save_point() {
    let mut doc = Document::from_text("");
    for (i, text) in ["a", "b", "c"].iter().enumerate() {
        doc.insert_string(i, text).unwrap();
    }
    doc.set_save_point();
    assert!(doc.is_save_point());

    doc.insert_string(3, "d").unwrap();
    doc.insert_string(4, "e").unwrap();
    assert!(!doc.is_save_point());

    doc.undo().unwrap();
    assert!(!doc.is_save_point());
    doc.undo().unwrap();
    assert!(doc.is_save_point());
    assert_eq!(doc.text(), "abc");
}

#[test]
fn test_move_between_typing_bursts_gives_two_actions() {
    let (doc, mut view) = view_over("");

    for ch in "abc".chars() {
        view.insert_character(ch).unwrap();
    }
    view.char_left(false).unwrap();
    view.char_right(false).unwrap();
    view.insert_character('d').unwrap();

    assert_eq!(doc.borrow().text(), "abcd");
    assert_eq!(doc.borrow().undo_history().undo_actions(), 2);

    assert!(view.undo().unwrap());
    assert_eq!(doc.borrow().text(), "abc");

    assert!(view.undo().unwrap());
    assert_eq!(doc.borrow().text(), "");
    assert!(!view.undo().unwrap());
}
