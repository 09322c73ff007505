use pretty_assertions::assert_eq;
use scribe_core::{
    CoreError, DocumentOptions, EditModel, LineEnding, LoadStatus, Loader, ViewOptions,
};
use std::thread;

#[test]
fn test_load_on_background_thread_then_edit() {
    let options = DocumentOptions::default();
    let worker = thread::spawn(move || {
        let mut loader = Loader::new(1024, options);
        for i in 0..100 {
            assert_eq!(loader.add_data(format!("line {i}\r\n").as_bytes()), LoadStatus::Ok);
        }
        loader
    });
    let loader = worker.join().unwrap();

    let doc = loader.convert_to_document().unwrap();
    assert_eq!(doc.borrow().line_count(), 101);
    assert_eq!(doc.borrow().get_line(42).unwrap(), "line 42");
    assert_eq!(doc.borrow().line_ending(), LineEnding::Crlf);

    let mut view = EditModel::new(doc.add_ref(), &ViewOptions::default());
    view.replace_selection("// header\n").unwrap();
    assert!(!doc.borrow().is_save_point());
    assert!(doc.borrow().text_for_save().starts_with("// header\r\nline 0\r\n"));

    view.undo().unwrap();
    assert!(doc.borrow().is_save_point());
}

#[test]
fn test_chunk_split_inside_character() {
    let bytes = "größe".as_bytes();
    let mut loader = Loader::new(0, DocumentOptions::default());
    loader.add_data(&bytes[..3]);
    loader.add_data(&bytes[3..]);

    let doc = loader.convert_to_document().unwrap();
    assert_eq!(doc.borrow().text(), "größe");
}

#[test]
fn test_size_limit_fails_conversion() {
    let mut loader = Loader::new(0, DocumentOptions::default()).with_limit(8);
    assert_eq!(loader.add_data(b"12345"), LoadStatus::Ok);
    assert_eq!(loader.add_data(b"67890"), LoadStatus::TooLarge);
    assert_eq!(loader.len(), 5);
    assert!(matches!(loader.convert_to_document(), Err(CoreError::LoadFailed(_))));
}

#[test]
fn test_release_discards_data() {
    let mut loader = Loader::new(16, DocumentOptions::default());
    loader.add_data(b"unused");
    assert!(!loader.is_empty());
    loader.release();
}
