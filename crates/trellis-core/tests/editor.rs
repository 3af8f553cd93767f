//! Transactions against a live tree: selection carry-over, no-op
//! short-circuit, table merges and the cached-model fast path.

use std::cell::Cell;
use std::rc::Rc;

use trellis_core::model::edit::{insert_text, merge_selected_table_cells};
use trellis_core::model::ContentModelBlock;
use trellis_core::{CacheState, CopyMode, Editor, EditorOptions, FormatContentModelOptions};
use trellis_dom::{DomPosition, DomSelection, NodeId, TableSelection};

fn first_text(editor: &Editor) -> NodeId {
    let paragraph = editor.dom().first_child(editor.root()).unwrap();
    editor.dom().first_child(paragraph).unwrap()
}

fn caret(editor: &Editor) -> DomPosition {
    let selection = editor.get_dom_selection().unwrap().unwrap();
    let range = selection.as_range().unwrap();
    assert!(range.is_collapsed());
    range.start
}

/// Type `ch` at the caret the way a browser would: straight into the text
/// node, with the caret moving along.
fn type_into_dom(editor: &mut Editor, ch: char) {
    let at = caret(editor);
    let mut text: Vec<char> = editor.dom().text(at.node).unwrap().chars().collect();
    text.insert(at.offset, ch);
    let text: String = text.into_iter().collect();
    editor.dom_mut().set_text(at.node, &text);
    editor
        .set_dom_selection(Some(DomSelection::caret(at.node, at.offset + 1)))
        .unwrap();
}

#[test]
fn test_insert_keeps_caret_after_inserted_text() {
    let mut editor = Editor::new("<p>abc</p>", EditorOptions::default());
    let text = first_text(&editor);
    editor.set_dom_selection(Some(DomSelection::caret(text, 2))).unwrap();

    editor
        .format_content_model(FormatContentModelOptions::api("insertText"), |model, _| insert_text(model, "X"))
        .unwrap();

    insta::assert_snapshot!(editor.html(), @"<p>abXc</p>");
    let at = caret(&editor);
    let before: Vec<char> = editor.dom().text(at.node).unwrap().chars().take(at.offset).collect();
    assert_eq!(before.last(), Some(&'X'));
}

#[test]
fn test_no_op_touches_nothing() {
    let mut editor = Editor::new("<p>abc</p><p>def</p>", EditorOptions::default());
    let events = Rc::new(Cell::new(0));
    let counter = Rc::clone(&events);
    editor.subscribe(move |_| counter.set(counter.get() + 1)).unwrap();
    let mutations = editor.dom().mutation_count();

    let changed = editor
        .format_content_model(FormatContentModelOptions::default(), |model, _| insert_text(model, "x"))
        .unwrap();

    // No caret, so nothing to insert at.
    assert!(!changed);
    assert_eq!(editor.dom().mutation_count(), mutations);
    assert_eq!(events.get(), 0);
}

#[test]
fn test_merged_cells_stay_rectangular() {
    let mut editor = Editor::new(
        "<table><tr><td>a</td><td>b</td><td>c</td></tr><tr><td>d</td><td>e</td><td>f</td></tr></table>",
        EditorOptions::default(),
    );
    let table = editor.dom().first_child(editor.root()).unwrap();
    editor
        .set_dom_selection(Some(DomSelection::Table(TableSelection {
            table,
            first_column: 0,
            last_column: 1,
            first_row: 0,
            last_row: 0,
        })))
        .unwrap();

    editor
        .format_content_model(FormatContentModelOptions::api("mergeCells"), |model, _| {
            let merged = merge_selected_table_cells(model);
            assert!(model.blocks[0].as_table().unwrap().is_rectangular());
            merged
        })
        .unwrap();

    assert!(editor.html().contains(r#"colspan="2""#));
    let reparsed = editor.get_content_model_copy(CopyMode::Clean).unwrap();
    let ContentModelBlock::Table(table) = &reparsed.blocks[0] else {
        panic!("expected a table");
    };
    assert!(table.is_rectangular());
    assert!(table.rows.iter().all(|row| row.cells.len() == 3));
    assert!(table.rows[0].cells[1].span_left);
}

#[test]
fn test_typing_uses_cached_model() {
    let mut editor = Editor::new("<p>abc</p>", EditorOptions::default());
    let text = first_text(&editor);
    editor.set_dom_selection(Some(DomSelection::caret(text, 3))).unwrap();
    editor
        .format_content_model(FormatContentModelOptions::default(), |model, _| insert_text(model, "d"))
        .unwrap();

    for _ in 0..5 {
        type_into_dom(&mut editor, 'y');
        editor
            .format_content_model(FormatContentModelOptions::api("keystroke"), |model, _| insert_text(model, "z"))
            .unwrap();
        assert_eq!(editor.cache_state(), CacheState::Clean);
    }

    insta::assert_snapshot!(editor.html(), @"<p>abcdyzyzyzyzyz</p>");
    let stats = editor.stats();
    assert_eq!(stats.full_parses, 1);
    assert_eq!(stats.fast_path, 5);
    assert_eq!(stats.writes, 6);
}

#[test]
fn test_structural_edit_forces_reparse() {
    let mut editor = Editor::new("<p>abc</p>", EditorOptions::default());
    editor.get_content_model_copy(CopyMode::Connected).unwrap();
    assert_eq!(editor.cache_state(), CacheState::Clean);

    let root = editor.root();
    let extra = editor.dom_mut().create_element("hr");
    editor.dom_mut().append_child(root, extra).unwrap();
    let model = editor.get_content_model_copy(CopyMode::Connected).unwrap();

    assert_eq!(model.blocks.len(), 2);
    assert_eq!(editor.stats().full_parses, 2);
}

#[test]
fn test_disabled_cache_always_parses() {
    let options = EditorOptions {
        enable_cache: false,
        ..Default::default()
    };
    let mut editor = Editor::new("<p>abc</p>", options);
    let text = first_text(&editor);
    editor.set_dom_selection(Some(DomSelection::caret(text, 3))).unwrap();
    for _ in 0..3 {
        editor
            .format_content_model(FormatContentModelOptions::default(), |model, _| insert_text(model, "!"))
            .unwrap();
    }
    assert_eq!(editor.html(), "<p>abc!!!</p>");
    assert_eq!(editor.stats().full_parses, 3);
    assert_eq!(editor.stats().fast_path, 0);
}

#[test]
fn test_entity_wrapper_survives_edits_elsewhere() {
    let mut editor = Editor::new(
        r#"<p>a</p><p><span class="_Entity _EType_chip _EId_c1">chip</span></p>"#,
        EditorOptions::default(),
    );
    let second = editor.dom().child_at(editor.root(), 1).unwrap();
    let wrapper = editor.dom().first_child(second).unwrap();
    let text = first_text(&editor);
    editor.set_dom_selection(Some(DomSelection::caret(text, 1))).unwrap();

    editor
        .format_content_model(FormatContentModelOptions::default(), |model, _| insert_text(model, "b"))
        .unwrap();

    assert!(editor.dom().is_connected(wrapper));
    assert!(editor.html().starts_with("<p>ab</p>"));
}

#[test]
fn test_typed_whitespace_matches_fresh_parse() {
    let mut editor = Editor::new("<p>ab</p>", EditorOptions::default());
    editor.get_content_model_copy(CopyMode::Connected).unwrap();
    let text = first_text(&editor);

    editor.dom_mut().set_text(text, "a   b");
    let cached = editor.get_content_model_copy(CopyMode::Connected).unwrap();
    let fresh = editor.get_content_model_copy(CopyMode::Clean).unwrap();

    assert_eq!(cached.paragraphs()[0].text(), "a b");
    assert_eq!(cached.paragraphs()[0].text(), fresh.paragraphs()[0].text());
    assert_eq!(editor.stats().fast_path, 0);
}

#[test]
fn test_typing_into_empty_editor() {
    let mut editor = Editor::new("", EditorOptions::default());
    let root = editor.root();
    editor.set_dom_selection(Some(DomSelection::caret(root, 0))).unwrap();

    let changed = editor
        .format_content_model(FormatContentModelOptions::api("insertText"), |model, _| insert_text(model, "X"))
        .unwrap();

    assert!(changed);
    assert!(editor.html().contains('X'));
    let at = caret(&editor);
    let before: Vec<char> = editor.dom().text(at.node).unwrap().chars().take(at.offset).collect();
    assert_eq!(before.last(), Some(&'X'));
}

#[test]
fn test_malformed_table_keeps_its_text() {
    let mut editor = Editor::new("<table><tr><td>a</td></tr>b</table>", EditorOptions::default());
    let model = editor.get_content_model_copy(CopyMode::Disconnected).unwrap();
    let texts: Vec<String> = model.paragraphs().iter().map(|p| p.text()).collect();
    assert!(texts.iter().any(|t| t == "a"));
    assert!(texts.iter().any(|t| t == "b"));

    editor
        .format_content_model(FormatContentModelOptions::default(), |_, _| true)
        .unwrap();
    let html = editor.html();
    assert!(html.contains('a') && html.contains('b'), "{html}");
}
