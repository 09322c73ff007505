use pretty_assertions::assert_eq;
use scribe_core::{
    Document, DocumentEvent, DocumentHandle, EditModel, FoldAction, FoldLevel, ModificationFlags,
    ViewOptions,
};
use std::cell::RefCell;
use std::rc::Rc;

fn two_views(text: &str) -> (DocumentHandle, EditModel, EditModel) {
    let doc = DocumentHandle::new(Document::from_text(text));
    let a = EditModel::new(doc.add_ref(), &ViewOptions::default());
    let b = EditModel::new(doc.add_ref(), &ViewOptions::default());
    (doc, a, b)
}

#[test]
fn test_views_keep_independent_selections() {
    let (doc, mut a, mut b) = two_views("0123456789\n");
    assert_eq!(doc.borrow().view_count(), 2);
    assert_eq!(doc.ref_count(), 3);

    a.set_empty_selection(1).unwrap();
    b.set_selection(5, 8).unwrap();

    a.replace_selection("abc").unwrap();
    b.update_from_document();

    assert_eq!(a.selection().main_caret(), 4);
    assert_eq!(b.selection().to_string(), "8-11");
    assert_eq!(doc.borrow().text_range(8, 11).unwrap(), "567");
}

#[test]
fn test_other_view_caret_clamped_after_shortening() {
    let (doc, mut a, mut b) = two_views("hello world");
    b.set_empty_selection(11).unwrap();

    a.select_all();
    a.replace_selection("hi").unwrap();

    b.update_from_document();
    assert_eq!(doc.borrow().text(), "hi");
    assert_eq!(b.selection().main_caret(), 2);
}

#[test]
fn test_passive_view_selection_follows_each_deletion() {
    let (doc, mut a, mut b) = two_views("alpha beta gamma");
    b.set_selection(6, 10).unwrap();

    a.set_selection(4, 12).unwrap();
    a.clear_selection_text().unwrap();
    assert_eq!(doc.borrow().text(), "alphamma");
    assert_eq!(b.selection().to_string(), "4");

    a.select_all();
    a.clear_selection_text().unwrap();
    assert_eq!(doc.borrow().length(), 0);
    assert_eq!(b.selection().to_string(), "0");
}

#[test]
fn test_typing_in_other_view_is_seen_before_edit() {
    let (doc, mut a, mut b) = two_views("ab");
    a.set_empty_selection(2).unwrap();
    b.set_empty_selection(0).unwrap();

    a.insert_character('c').unwrap();
    b.insert_character('x').unwrap();

    assert_eq!(doc.borrow().text(), "xabc");
    assert_eq!(b.selection().main_caret(), 1);
    a.update_from_document();
    assert_eq!(a.selection().main_caret(), 4);
}

#[test]
fn test_each_view_restores_its_own_selection() {
    let (doc, mut a, mut b) = two_views("one two");
    a.set_selection(0, 3).unwrap();
    a.replace_selection("1").unwrap();
    b.set_empty_selection(doc.borrow().length()).unwrap();

    b.undo().unwrap();
    assert_eq!(doc.borrow().text(), "one two");
    assert_eq!(b.selection().main_caret(), 3);

    a.update_from_document();
    a.redo().unwrap();
    assert_eq!(doc.borrow().text(), "1 two");
    assert_eq!(a.selection().to_string(), "1");
}

#[test]
fn test_dropping_a_view_releases_its_reference() {
    let (doc, a, b) = two_views("x");
    drop(a);
    assert_eq!(doc.borrow().view_count(), 1);
    assert_eq!(doc.ref_count(), 2);
    drop(b);
    assert_eq!(doc.borrow().view_count(), 0);
    assert_eq!(doc.ref_count(), 1);
}

#[test]
fn test_folds_are_shared_between_views() {
    let (doc, mut a, b) = two_views("fn\n  body\nend");
    doc.borrow_mut()
        .set_fold_level(0, FoldLevel::BASE | FoldLevel::HEADER_FLAG)
        .unwrap();
    doc.borrow_mut().set_fold_level(1, FoldLevel(0x401)).unwrap();

    a.fold_line(0, FoldAction::Contract).unwrap();
    assert_eq!(b.document().borrow().contraction().lines_displayed(), 2);
    assert!(!doc.borrow().contraction().visible(1));

    a.fold_line(0, FoldAction::Toggle).unwrap();
    assert!(doc.borrow().contraction().visible(1));
}

#[test]
fn test_listener_sees_before_and_after_events() {
    let (doc, mut a, _b) = two_views("");
    let seen: Rc<RefCell<Vec<ModificationFlags>>> = Rc::default();
    let saves = Rc::new(RefCell::new(0));
    let id = {
        let seen = Rc::clone(&seen);
        let saves = Rc::clone(&saves);
        doc.borrow_mut().subscribe(move |event| match event {
            DocumentEvent::Modified(modification) => seen.borrow_mut().push(modification.flags),
            DocumentEvent::SavePointLeft | DocumentEvent::SavePointReached => *saves.borrow_mut() += 1,
            DocumentEvent::ModifyAttemptReadOnly => {}
        })
    };

    a.insert_character('q').unwrap();
    {
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].contains(ModificationFlags::BEFORE_INSERT));
        assert!(seen[1].contains(ModificationFlags::INSERT_TEXT));
        assert!(seen[1].contains(ModificationFlags::START_ACTION));
    }
    assert_eq!(*saves.borrow(), 1);

    a.undo().unwrap();
    assert!(seen.borrow().last().is_some_and(|flags| flags.contains(ModificationFlags::PERFORMED_UNDO)));
    assert_eq!(*saves.borrow(), 2);

    assert!(doc.borrow_mut().unsubscribe(id));
    a.insert_character('r').unwrap();
    assert_eq!(seen.borrow().len(), 4);
}
