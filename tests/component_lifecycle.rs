use std::collections::HashSet;

use quire::{
    application::{
        editor::{ComponentManager, ImagePatch, InsertImageOptions, OutputField, extract},
        error::EditorError,
    },
    config::EditorSettings,
    domain::{
        components::ComponentKind,
        ids::ComponentId,
        properties::{ImageLayout, Properties},
    },
    infra::{dom::Caret, html::parse_fragment},
};

mod support;

use support::assert_markers_match_registry;

const MARKER: &str = "data-component-id";

const ARTICLE: &str = concat!(
    r#"<p>Intro</p>"#,
    r#"<div class="image-component"><img src="a.png" alt="A" style="width: 40%"></div>"#,
    r#"<figure class="figure-component"><img src="b.png" alt="B"><figcaption>Old caption</figcaption></figure>"#,
    r#"<div class="image-gallery gallery-3"><img src="g1.png" alt=""><img src="g2.png" alt=""></div>"#,
    r#"<div class="quote-block"><blockquote>Simple is hard.<cite>Ada</cite></blockquote></div>"#,
    r#"<section class="hero-section"><img src="hero.png"><h2>Welcome</h2></section>"#,
);

fn session(markup: &str) -> (ComponentManager, OutputField) {
    let field = OutputField::new();
    let manager = ComponentManager::new_session(markup, field.clone(), EditorSettings::default())
        .expect("session starts");
    (manager, field)
}

fn first_of(manager: &ComponentManager, kind: ComponentKind) -> ComponentId {
    manager
        .get_all_by_type(kind)
        .first()
        .map(|record| record.id().clone())
        .expect("component of the requested kind")
}

fn patch<const N: usize>(entries: [(&str, &str); N]) -> Properties {
    entries.into_iter().collect()
}

#[test]
fn existing_markup_gets_one_distinct_id_per_component() {
    let (manager, _) = session(ARTICLE);

    let kinds: Vec<_> = manager.get_all().iter().map(|record| record.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ComponentKind::Image,
            ComponentKind::Figure,
            ComponentKind::Gallery,
            ComponentKind::Quote,
            ComponentKind::Hero,
        ]
    );

    let ids: HashSet<_> = manager.get_all().iter().map(|record| record.id().clone()).collect();
    assert_eq!(ids.len(), manager.len());
    assert!(ids.iter().all(|id| id.as_str().starts_with("cmp-")));
}

#[test]
fn registry_and_markers_agree() {
    let (manager, _) = session(ARTICLE);

    for record in manager.get_all() {
        assert_eq!(
            manager.document().attr(record.node(), MARKER),
            Some(record.id().as_str())
        );
    }
    assert_markers_match_registry(&manager);
}

#[test]
fn output_field_follows_every_mutating_call() {
    let (mut manager, field) = session(ARTICLE);
    assert_eq!(field.value(), manager.content());

    let figure = first_of(&manager, ComponentKind::Figure);
    manager
        .update_component(&figure, patch([("caption", "New caption")]))
        .expect("figure update");
    assert_eq!(field.value(), manager.content());
    assert!(field.value().contains("<figcaption>New caption</figcaption>"));

    let copy = manager.duplicate_component(&figure).expect("duplicate");
    assert_eq!(field.value(), manager.content());

    manager.remove_component(&copy).expect("remove");
    assert_eq!(field.value(), manager.content());

    manager
        .insert_image("c.png", "C", InsertImageOptions::default())
        .expect("insert");
    assert_eq!(field.value(), manager.content());
}

#[test]
fn centering_twice_changes_nothing_the_second_time() {
    let (mut manager, field) = session(ARTICLE);
    let image = first_of(&manager, ComponentKind::Image);

    manager
        .update_image(&image, ImagePatch::new().layout(ImageLayout::Center))
        .expect("first center");
    let once = field.value();
    manager
        .update_image(&image, ImagePatch::new().layout(ImageLayout::Center))
        .expect("second center");

    assert_eq!(field.value(), once);
    let record = manager.get(&image).expect("record");
    assert_eq!(record.properties().get_str("layout"), Some("center"));
    assert!(once.contains(
        r#"style="width: 40%; display: block; margin-left: auto; margin-right: auto" class="image-center""#
    ));
}

#[test]
fn switching_layouts_leaves_no_stale_float() {
    let (mut manager, field) = session(ARTICLE);
    let image = first_of(&manager, ComponentKind::Image);

    manager
        .update_image(&image, ImagePatch::new().layout(ImageLayout::FloatLeft))
        .expect("float left");
    manager
        .update_image(&image, ImagePatch::new().layout(ImageLayout::FloatRight))
        .expect("float right");

    let content = field.value();
    assert!(content.contains(r#"style="width: 40%; float: right; margin-left: 1em" class="image-float-right""#));
    assert!(!content.contains("image-float-left"));
    assert!(!content.contains("margin-right"));
}

#[test]
fn unknown_ids_are_rejected_without_side_effects() {
    let (mut manager, field) = session(ARTICLE);
    let before = field.value();
    let missing = ComponentId::from("cmp-00000000-99");

    let err = manager
        .update_component(&missing, patch([("caption", "x")]))
        .unwrap_err();
    assert!(matches!(err, EditorError::UnknownComponent { .. }));
    assert!(err.is_missing_target());

    assert!(manager.duplicate_component(&missing).is_err());
    assert!(manager.remove_component(&missing).is_err());
    assert_eq!(field.value(), before);
}

#[test]
fn invalid_patches_leave_markup_and_properties_alone() {
    let (mut manager, field) = session(ARTICLE);
    let image = first_of(&manager, ComponentKind::Image);
    let figure = first_of(&manager, ComponentKind::Figure);
    let before = field.value();
    let stored = manager.get(&figure).expect("figure").properties().clone();

    let unknown_key = manager.update_component(&figure, patch([("colour", "red")]));
    assert!(matches!(unknown_key, Err(EditorError::InvalidProperties { .. })));

    let bad_layout = manager.update_component(&image, patch([("layout", "diagonal")]));
    assert!(matches!(bad_layout, Err(EditorError::InvalidProperties { .. })));

    let injected = manager.update_image(&image, ImagePatch::new().width("10px; position: fixed"));
    assert!(matches!(injected, Err(EditorError::InvalidProperties { .. })));

    assert_eq!(field.value(), before);
    assert_eq!(manager.get(&figure).expect("figure").properties(), &stored);
}

#[test]
fn hero_sections_cannot_be_patched() {
    let (mut manager, field) = session(ARTICLE);
    let hero = first_of(&manager, ComponentKind::Hero);
    let before = field.value();

    let err = manager
        .update_component(&hero, patch([("title", "Hi")]))
        .unwrap_err();

    assert!(matches!(
        err,
        EditorError::Unpatchable {
            kind: ComponentKind::Hero
        }
    ));
    assert_eq!(field.value(), before);
    assert!(manager.get(&hero).expect("hero").properties().is_empty());
}

#[test]
fn image_patches_reach_images_inside_containers() {
    let (mut manager, _) = session(ARTICLE);
    let figure = first_of(&manager, ComponentKind::Figure);

    manager
        .update_image(&figure, ImagePatch::new().src("b2.png").alt("B2"))
        .expect("figure image update");

    let record = manager.get(&figure).expect("figure");
    assert_eq!(record.properties().get_str("src"), Some("b2.png"));
    assert_eq!(record.properties().get_str("alt"), Some("B2"));
    assert_eq!(record.properties().get_str("caption"), Some("Old caption"));
}

#[test]
fn inserted_image_lands_after_the_caret_block() {
    let (mut manager, field) = session("<p>Hello</p><p>World</p>");
    let root = manager.root();
    let first = manager.document().first_child(root).expect("paragraph");
    let text = manager.document().first_child(first).expect("text");
    manager
        .document_mut()
        .set_caret(Some(Caret::new(text, 2)));

    let id = manager
        .insert_image(
            "cat.png",
            "cat",
            InsertImageOptions {
                width: Some("50%".to_string()),
                layout: ImageLayout::Center,
            },
        )
        .expect("insert");

    let record = manager.get(&id).expect("record");
    assert_eq!(record.kind(), ComponentKind::Image);
    assert_eq!(record.properties().get_str("src"), Some("cat.png"));
    assert_eq!(record.properties().get_str("width"), Some("50%"));
    assert_eq!(record.properties().get_str("layout"), Some("center"));
    assert_eq!(manager.document().index_in_parent(record.node()), Some(1));

    let caret = manager.document().caret().expect("caret");
    assert_eq!(manager.document().index_in_parent(caret.node), Some(2));
    assert_eq!(caret.offset, 0);

    assert!(field.value().contains(id.as_str()));
    insta::assert_snapshot!(manager.export_markup().expect("export"), @r#"<p>Hello</p><div class="image-component"><img src="cat.png" alt="cat" style="width: 50%; display: block; margin-left: auto; margin-right: auto" class="image-center"></div><p><br></p><p>World</p>"#);
}

#[test]
fn inserting_without_a_caret_appends() {
    let (mut manager, _) = session("<p>Only</p>");

    let id = manager
        .insert_image("x.png", "", InsertImageOptions::default())
        .expect("insert");

    let node = manager.get(&id).expect("record").node();
    let children = manager.document().children(manager.root()).to_vec();
    assert_eq!(children.len(), 3);
    assert_eq!(children[1], node);
}

#[test]
fn inserting_requires_a_source() {
    let (mut manager, field) = session("<p>Only</p>");
    let before = field.value();

    let err = manager
        .insert_image("  ", "empty", InsertImageOptions::default())
        .unwrap_err();

    assert!(matches!(err, EditorError::InvalidProperties { .. }));
    assert_eq!(field.value(), before);
    assert!(manager.is_empty());
}

#[test]
fn duplicates_start_equal_and_then_diverge() {
    let (mut manager, _) = session(ARTICLE);
    let figure = first_of(&manager, ComponentKind::Figure);

    let copy = manager.duplicate_component(&figure).expect("duplicate");
    assert_ne!(copy, figure);

    let original_node = manager.get(&figure).expect("original").node();
    let copy_node = manager.get(&copy).expect("copy").node();
    assert_eq!(manager.document().next_sibling(original_node), Some(copy_node));
    assert_eq!(
        manager.get(&copy).expect("copy").properties(),
        manager.get(&figure).expect("original").properties()
    );
    assert_eq!(manager.document().attr(copy_node, MARKER), Some(copy.as_str()));

    manager
        .update_component(&copy, patch([("caption", "Copy caption")]))
        .expect("update copy");

    let original = manager.get(&figure).expect("original");
    assert_eq!(original.properties().get_str("caption"), Some("Old caption"));
    assert_eq!(
        manager.document().text_content(original_node).trim(),
        "Old caption"
    );
    assert_eq!(
        manager.get(&copy).expect("copy").properties().get_str("caption"),
        Some("Copy caption")
    );
}

#[test]
fn removed_components_are_forgotten() {
    let (mut manager, field) = session(ARTICLE);
    let quote = first_of(&manager, ComponentKind::Quote);
    let count = manager.len();

    manager.remove_component(&quote).expect("remove");

    assert_eq!(manager.len(), count - 1);
    assert!(manager.get(&quote).is_none());
    assert!(!field.value().contains("quote-block"));
    assert!(matches!(
        manager.remove_component(&quote),
        Err(EditorError::UnknownComponent { .. })
    ));
}

#[test]
fn explicit_registration_is_idempotent() {
    let (mut manager, _) = session("<p>text</p>");
    let root = manager.root();
    let nodes = parse_fragment(
        manager.document_mut(),
        r#"<div class="image-comparison"><img src="old.png"><img src="new.png"></div>"#,
    );
    manager
        .document_mut()
        .append_child(root, nodes[0])
        .expect("append");

    let id = manager.register(nodes[0]).expect("register");
    let again = manager.register(nodes[0]).expect("register again");

    assert_eq!(id, again);
    let record = manager.get(&id).expect("record");
    assert_eq!(record.kind(), ComponentKind::Comparison);
    assert_eq!(record.properties().get_str("beforeImage"), Some("old.png"));
    assert_eq!(record.properties().get_str("afterLabel"), Some("After"));

    let outcome = manager.flush_mutations().expect("flush");
    assert!(!outcome.changed());
    assert_eq!(manager.len(), 1);
}

#[test]
fn registration_outside_the_root_is_refused() {
    let (mut manager, _) = session("<p>text</p>");
    let detached = manager
        .document_mut()
        .create_element("img", [("src", "a.png")]);
    let root = manager.root();

    assert!(matches!(
        manager.register_image(detached),
        Err(EditorError::OutsideRoot)
    ));
    assert!(matches!(manager.register(root), Err(EditorError::OutsideRoot)));

    let paragraph = manager.document().first_child(root).expect("paragraph");
    assert!(matches!(
        manager.register_image(paragraph),
        Err(EditorError::NotAnImage)
    ));
}

#[test]
fn inserting_into_an_empty_root_records_every_image_property() {
    let (mut manager, field) = session("");

    let id = manager
        .insert_image(
            "https://x/img.png",
            "cat",
            InsertImageOptions::with_layout(ImageLayout::Center),
        )
        .expect("insert");

    let expected: Properties = [
        ("src", "https://x/img.png"),
        ("alt", "cat"),
        ("width", "100%"),
        ("layout", "center"),
    ]
    .into_iter()
    .collect();
    assert_eq!(manager.get(&id).expect("record").properties(), &expected);

    let content = field.value();
    assert!(content.contains(r#"<div class="image-component""#));
    assert!(content.contains("display: block; margin-left: auto; margin-right: auto"));
    assert!(content.ends_with("<p><br></p>"));
}

#[test]
fn quote_updates_keep_an_avatar_inside_the_quote() {
    let (mut manager, _) = session(
        r#"<div class="quote-block"><blockquote><img class="quote-avatar" src="ada.png">Numbers<cite>Ada</cite></blockquote></div>"#,
    );
    let id = first_of(&manager, ComponentKind::Quote);

    manager
        .update_component(&id, patch([("quote", "New")]))
        .expect("quote update");

    let record = manager.get(&id).expect("record");
    let rendered = extract(manager.document(), record.node(), ComponentKind::Quote);
    assert_eq!(record.properties(), &rendered);
    assert_eq!(rendered.get_str("avatarSrc"), Some("ada.png"));
    assert_eq!(rendered.get_str("quote"), Some("New"));
    assert_markers_match_registry(&manager);
}

#[test]
fn captions_cannot_be_added_to_a_bare_image_figure() {
    let (mut manager, field) = session(r#"<img class="figure-component" src="a.png">"#);
    let id = first_of(&manager, ComponentKind::Figure);
    let before = field.value();

    let err = manager
        .update_component(&id, patch([("caption", "A")]))
        .unwrap_err();

    assert!(matches!(
        err,
        EditorError::InvalidProperties {
            kind: ComponentKind::Figure,
            ..
        }
    ));
    assert_eq!(field.value(), before);
    assert_eq!(manager.get(&id).expect("record").properties().get_str("caption"), None);
}

#[test]
fn deeply_nested_markup_loads_and_syncs() {
    const DEPTH: usize = 100_000;
    let markup = format!("{}x{}", "<span>".repeat(DEPTH), "</span>".repeat(DEPTH));

    let (manager, field) = session(&markup);

    assert!(manager.is_empty());
    assert_eq!(field.value(), markup);
}
