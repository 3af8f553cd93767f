//! Parse/write round trips over whole documents.

use trellis_core::model::{ContentModelParagraph, create_paragraph};
use trellis_core::{
    ContentModelBlock, ContentModelDocument, DomToModelOptions, Editor, EditorOptions, FormatContentModelOptions,
    ModelToDomOptions, SegmentFormat, content_model_to_html, html_to_content_model, normalize_content_model,
};

const SAMPLES: &[&str] = &[
    "<p>Hello <b>World</b></p>",
    "<h2>Title</h2>",
    r#"<p><a href="https://a.example">x<code>y</code></a></p>"#,
    "<ul><li><p>a</p><p>b</p></li></ul>",
    "<ol><li>a<ol><li>a.1</li></ol></li><li>b<ol><li>b.1</li></ol></li></ol>",
    "<table><tbody><tr><th>h</th></tr><tr><td>d</td></tr></tbody></table>",
    r#"<p>a<my-widget data-x="1">w</my-widget></p>"#,
    "<p>a<!-- c -->b</p>",
    "<p>a<!-- c --><script>x</script>b</p>",
    r#"<p><span class="_Entity _EType_ _EId_">w</span></p>"#,
    r#"<p>x<span class="_Entity _EType_mention _EId_m1 _EReadonly_true" contenteditable="false">@m</span></p>"#,
];

#[test]
fn test_model_survives_round_trip() {
    let options = DomToModelOptions::default();
    for html in SAMPLES {
        let model = html_to_content_model(html, &options);
        let written = content_model_to_html(&model, &ModelToDomOptions::default());
        let reparsed = html_to_content_model(&written, &options);
        assert_eq!(model, reparsed, "round trip of {html}");
    }
}

#[test]
fn test_hello_world_round_trip_in_root() {
    let mut editor = Editor::new("<p>Hello <b>World</b></p>", EditorOptions::default());
    editor
        .format_content_model(FormatContentModelOptions::default(), |_, _| true)
        .unwrap();
    insta::assert_snapshot!(
        editor.dom().outer_html(editor.root()),
        @"<div><p>Hello <b>World</b></p></div>"
    );
}

#[test]
fn test_empty_paragraph_gets_br() {
    let mut editor = Editor::new("<p></p>", EditorOptions::default());
    editor
        .format_content_model(FormatContentModelOptions::default(), |_, _| true)
        .unwrap();
    insta::assert_snapshot!(editor.dom().outer_html(editor.root()), @"<div><p><br></p></div>");
}

#[test]
fn test_normalize_is_idempotent_on_parsed_models() {
    let options = DomToModelOptions::default();
    for html in SAMPLES.iter().chain(&["<p></p>", "<p>a  b </p><div></div>", "<table><tr><td>x</td></tr><tr></tr></table>"]) {
        let model = html_to_content_model(html, &options);
        let mut again = model.clone();
        assert!(!normalize_content_model(&mut again), "second normalize changed {html}");
        assert_eq!(model, again);
    }
}

#[test]
fn test_normalize_twice_changes_nothing_more() {
    let mut model = ContentModelDocument::new();
    let empty: ContentModelParagraph = create_paragraph(false, &Default::default(), &SegmentFormat::default(), None);
    model.blocks.push(ContentModelBlock::Paragraph(empty.clone()));
    let mut implicit = empty;
    implicit.is_implicit = true;
    model.blocks.push(ContentModelBlock::Paragraph(implicit));

    assert!(normalize_content_model(&mut model));
    let once = model.clone();
    assert!(!normalize_content_model(&mut model));
    assert_eq!(model, once);
    assert_eq!(model.blocks.len(), 1);
}

#[test]
fn test_readonly_entity_round_trip() {
    let options = DomToModelOptions::default();
    let html = r#"<p><span class="_Entity _EType_mention _EId_m1 _EReadonly_true">@m</span></p>"#;
    let model = html_to_content_model(html, &options);
    let written = content_model_to_html(&model, &ModelToDomOptions::default());
    assert!(written.contains("_EReadonly_true"), "{written}");

    let entities = html_to_content_model(&written, &options).entities().into_iter().cloned().collect::<Vec<_>>();
    assert_eq!(entities.len(), 1);
    assert!(entities[0].is_readonly);
    assert_eq!(entities[0].entity_type, "mention");
    assert_eq!(entities[0].id.as_deref(), Some("m1"));
}

#[test]
fn test_empty_entity_type_written_back() {
    let html = r#"<p><span class="_Entity _EType_ _EId_">w</span></p>"#;
    let model = html_to_content_model(html, &DomToModelOptions::default());
    let written = content_model_to_html(&model, &ModelToDomOptions::default());
    assert!(written.contains(r#"class="_Entity _EType_ _EId_""#), "{written}");
}

#[test]
fn test_image_without_src_gains_none() {
    let model = html_to_content_model(r#"<p><img alt="x"></p>"#, &DomToModelOptions::default());
    let written = content_model_to_html(&model, &ModelToDomOptions::default());
    assert!(written.contains("<img"), "{written}");
    assert!(!written.contains("src="), "{written}");
}

#[test]
fn test_malformed_tables_keep_content() {
    let options = DomToModelOptions::default();
    for html in ["<table><td>a<tr>b", "<table><tr><td>a</td></tr>b</table>"] {
        let model = html_to_content_model(html, &options);
        let written = content_model_to_html(&model, &ModelToDomOptions::default());
        let texts: String = html_to_content_model(&written, &options)
            .paragraphs()
            .iter()
            .map(|p| p.text())
            .collect();
        assert!(texts.contains('a') && texts.contains('b'), "{html} became {written}");
    }
}
