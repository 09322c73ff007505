use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scribe_core::{Document, DocumentHandle, EditModel, RunStyles, ViewOptions};

const ALPHABET: &[u8] = b"abc xyz\n";

fn random_text(rng: &mut StdRng, max_len: usize) -> String {
    let len = rng.gen_range(1..=max_len);
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

fn assert_consistent(doc: &Document) {
    let text = doc.text();
    assert_eq!(doc.length(), text.len());
    assert_eq!(doc.line_count(), text.matches('\n').count() + 1);
    let styles = doc.cell_buffer().styles();
    assert_eq!(styles.length(), doc.length());
    assert!(styles.check());
    assert_eq!(doc.decorations().length(), doc.length());
    assert_eq!(doc.contraction().lines_in_doc(), doc.line_count());
    for line in 0..doc.line_count() {
        let start = doc.line_start(line).unwrap();
        assert_eq!(doc.line_from_position(start), line);
        assert_eq!(doc.get_line(line).unwrap(), text.split('\n').nth(line).unwrap());
    }
}

#[test]
fn test_random_edits_keep_tables_in_step() {
    let mut rng = StdRng::seed_from_u64(0x5C21_BE);
    let mut doc = Document::from_text("seed\ntext");

    for _ in 0..500 {
        let length = doc.length();
        if length > 0 && rng.gen_bool(0.4) {
            let position = rng.gen_range(0..length);
            let len = rng.gen_range(1..=(length - position).min(12));
            doc.delete_chars(position, len).unwrap();
        } else {
            let position = rng.gen_range(0..=length);
            let text = random_text(&mut rng, 10);
            doc.insert_string(position, &text).unwrap();
        }
        if doc.length() > 0 && rng.gen_bool(0.3) {
            let position = rng.gen_range(0..doc.length());
            let len = rng.gen_range(1..=(doc.length() - position));
            doc.fill_styles(position, len, rng.gen_range(0..4)).unwrap();
        }
        assert_consistent(&doc);
    }
}

#[test]
fn test_undo_all_restores_text_and_selection() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let original = random_text(&mut rng, 40);
        let doc = DocumentHandle::new(Document::from_text(&original));
        let mut view = EditModel::new(doc.add_ref(), &ViewOptions::default());

        let length = doc.borrow().length();
        let anchor = rng.gen_range(0..=length);
        let caret = rng.gen_range(0..=length);
        view.set_selection(anchor, caret).unwrap();
        // Selection in force when the first action was recorded; no-op edits leave none.
        let mut initial = None;

        for _ in 0..30 {
            let before = view.selection().to_string();
            let had_history = doc.borrow().can_undo();
            match rng.gen_range(0..4) {
                0 => view.insert_character('k').unwrap(),
                1 => view.replace_selection(&random_text(&mut rng, 5)).unwrap(),
                2 => view.delete_back().unwrap(),
                _ => view.delete_forward().unwrap(),
            }
            if !had_history && doc.borrow().can_undo() {
                initial = Some(before);
            }
            let length = doc.borrow().length();
            let anchor = rng.gen_range(0..=length);
            let caret = rng.gen_range(0..=length);
            view.set_selection(anchor, caret).unwrap();
            assert_consistent(&doc.borrow());
        }

        let last = view.selection().to_string();
        while view.undo().unwrap() {}
        assert_eq!(doc.borrow().text(), original);
        assert_eq!(view.selection().to_string(), initial.unwrap_or(last));
        assert!(doc.borrow().is_save_point());
        assert_consistent(&doc.borrow());
    }
}

#[test]
fn test_random_fills_never_leave_equal_neighbours() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut rs: RunStyles<u8> = RunStyles::new();
    rs.insert_space(0, 200).unwrap();

    for _ in 0..1000 {
        let position = rng.gen_range(0..200);
        let len = rng.gen_range(0..=(200 - position));
        rs.fill_range(position, rng.gen_range(0..3), len).unwrap();
        let runs = rs.run_list();
        assert!(runs.windows(2).all(|pair| pair[0].1 != pair[1].1));
        assert_eq!(runs.iter().map(|(len, _)| len).sum::<usize>(), 200);
    }
}
