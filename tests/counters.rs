//! Counters: child actions aggregated into parents.

use std::cell::RefCell;
use std::rc::Rc;

use spark_cycle::{
    create_tree, Action, CycleError, Definition, Element, EventData, EventMask, Host, NodeId,
    Phase, Props, Reducer, Tree, TreeConfig, TreeEvent,
};

fn single_counter() -> Rc<Definition<u64>> {
    Definition::new("SingleCounter", 0u64, |count, props, ui| {
        Ok(ui
            .element("div")
            .id(format!("counter-{}", props.get_key().map(String::as_str).unwrap_or("solo")))
            .child(ui.element("button").class("inc"))
            .child(ui.element("span").child(ui.text(count.to_string()))))
    })
    .actions(|sources, _| {
        vec![sources
            .select(".inc")
            .events("click")
            .map(|_| Some(Action::new("buttonClicked")))]
    })
    .reducers(|sources, _| {
        vec![sources
            .actions()
            .filter_by_type("buttonClicked")
            .reducer(Reducer::new("increment", |count: u64, _| count + 1))]
    })
    .build()
}

fn multiple_counters() -> Rc<Definition<u64>> {
    let counter = single_counter();
    Definition::new("MultipleCounters", 0u64, move |total, _, ui| {
        Ok(ui
            .element("div")
            .child(ui.element("div").child(ui.component(&counter, Props::new().key("1"))?))
            .child(ui.element("div").child(ui.component(&counter, Props::new().key("2"))?))
            .child(ui.element("div").child(ui.component(&counter, Props::new().key("3"))?))
            .child(
                ui.element("div")
                    .class("message")
                    .child(ui.text(format!("Total child button clicks: {total}"))),
            ))
    })
    .actions(|sources, _| {
        vec![sources
            .children_actions()
            .filter_by_type("buttonClicked")
            .map(|_| Some(Action::new("childButtonClicked")))]
    })
    .reducers(|sources, _| {
        vec![sources
            .actions()
            .filter_by_type("childButtonClicked")
            .reducer(Reducer::new("increment", |total: u64, _| total + 1))]
    })
    .build()
}

fn click_counter(host: &Host, key: &str) {
    host.root_element()
        .expect("rendered")
        .query_selector(&format!("#counter-{key}"))
        .expect("counter")
        .query_selector(".inc")
        .expect("button")
        .dispatch("click", EventData::None);
}

fn counter_node(tree: &Tree, parent: NodeId, key: &str) -> NodeId {
    let definition = tree.children(parent).expect("children")[0];
    let definition = tree.definition_id(definition).expect("definition");
    tree.lookup(parent, definition, Some(key)).expect("counter node")
}

#[test]
fn test_children_clicks_reach_parent() {
    let tree = create_tree();
    let root = tree.create_root(&multiple_counters(), Props::new()).expect("root");
    let mut host = Host::new(tree.clone(), root);
    host.render().expect("render");

    click_counter(&host, "2");
    click_counter(&host, "2");
    click_counter(&host, "1");

    assert_eq!(tree.state::<u64>(root), Ok(3));
    assert_eq!(tree.state::<u64>(counter_node(&tree, root, "1")), Ok(1));
    assert_eq!(tree.state::<u64>(counter_node(&tree, root, "2")), Ok(2));
    assert_eq!(tree.state::<u64>(counter_node(&tree, root, "3")), Ok(0));

    let element = host.refresh().expect("refresh").expect("dirty");
    let message = element.query_selector(".message").expect("message");
    assert_eq!(message.text_content(), "Total child button clicks: 3");
}

#[test]
fn test_deep_leaf_actions_reach_every_ancestor() {
    let counters = multiple_counters();
    let counters_for_view = counters.clone();
    let app = Definition::new("App", 0u64, move |_, _, ui| {
        Ok(ui.element("main").child(ui.component(&counters_for_view, Props::new())?))
    })
    .reducers(|sources, _| {
        vec![sources
            .children_actions()
            .filter_by_type("buttonClicked")
            .reducer(Reducer::new("leafClicked", |count: u64, _| count + 1))]
    })
    .build();

    let tree = create_tree();
    let root = tree.create_root(&app, Props::new()).expect("root");
    let mut host = Host::new(tree.clone(), root);
    host.render().expect("render");

    click_counter(&host, "3");

    let middle = tree.children(root).expect("children")[0];
    assert_eq!(tree.state::<u64>(root), Ok(1));
    assert_eq!(tree.state::<u64>(middle), Ok(1));
}

#[test]
fn test_late_child_joins_without_resubscribe() {
    let tree = create_tree();
    let parent = Definition::new("Parent", (), |_, _, ui| Ok(ui.element("div"))).build();
    let root = tree.create_root(&parent, Props::new()).expect("root");
    tree.mount(root, &Element::new("div")).expect("mount root");

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    let _sub = tree
        .children_actions(root)
        .expect("root")
        .on_next(move |action| seen_clone.borrow_mut().push(action.kind));

    let child = tree
        .create_component(&single_counter(), Props::new().key("late"), Some(root))
        .expect("child");
    tree.emit_action(child, Action::new("beforeMount")).expect("emit");
    tree.mount(child, &Element::new("div")).expect("mount child");
    tree.emit_action(child, Action::new("afterMount")).expect("emit");

    assert_eq!(*seen.borrow(), vec!["afterMount".to_string()]);
}

#[test]
fn test_duplicate_keyless_children_fail_the_render() {
    let counter = single_counter();
    let app = Definition::new("Twice", (), move |_, _, ui| {
        Ok(ui
            .element("div")
            .child(ui.component(&counter, Props::new())?)
            .child(ui.component(&counter, Props::new())?))
    })
    .build();
    let tree = create_tree();
    let root = tree.create_root(&app, Props::new()).expect("root");
    let mut host = Host::new(tree, root);

    let err = host.render().expect_err("duplicate");
    assert_eq!(
        err,
        CycleError::DuplicateKey {
            name: "SingleCounter".into(),
            key: None
        }
    );
    assert!(err.to_string().contains("without the key property"));
}

#[test]
fn test_root_uniqueness_per_tree() {
    let tree = create_tree();
    tree.create_root(&multiple_counters(), Props::new()).expect("root");

    assert!(matches!(
        tree.create_root(&single_counter(), Props::new()),
        Err(CycleError::RootAlreadyExists { .. })
    ));
}

#[test]
fn test_children_mount_before_parent() {
    let tree = create_tree();
    let mounts = Rc::new(RefCell::new(Vec::new()));
    let mounts_clone = mounts.clone();
    tree.on(EventMask::MOUNT, move |event| {
        if let TreeEvent::ComponentMount { node } = event {
            mounts_clone.borrow_mut().push(*node);
        }
    });

    let root = tree.create_root(&multiple_counters(), Props::new()).expect("root");
    let mut host = Host::new(tree.clone(), root);
    host.render().expect("render");

    let mounts = mounts.borrow();
    assert_eq!(mounts.len(), 4);
    assert_eq!(mounts.last(), Some(&root));
    assert_eq!(&mounts[..3], tree.children(root).expect("children").as_slice());
}

#[test]
fn test_host_unmount_disposes_everything() {
    let tree = Tree::new(TreeConfig::from_toml_str("label = \"counters\"").expect("config"));
    let root = tree.create_root(&multiple_counters(), Props::new()).expect("root");
    let mut host = Host::new(tree.clone(), root);
    let element = host.render().expect("render");
    let counter = counter_node(&tree, root, "1");
    assert_eq!(tree.phase(counter), Ok(Phase::Mounted));

    host.unmount().expect("unmount");

    assert!(tree.is_empty());
    assert_eq!(tree.root(), None);
    // Clicking a detached element changes nothing.
    element
        .query_selector("#counter-1")
        .expect("counter")
        .query_selector(".inc")
        .expect("button")
        .dispatch("click", EventData::None);
    assert!(matches!(tree.state::<u64>(counter), Err(CycleError::UnknownNode(_))));
}

#[test]
fn test_structure_lists_keyed_counters() {
    let tree = create_tree();
    let root = tree.create_root(&multiple_counters(), Props::new()).expect("root");
    Host::new(tree.clone(), root).render().expect("render");

    let structure = tree.structure().expect("structure");
    let keys: Vec<Option<String>> = structure.children.iter().map(|c| c.key.clone()).collect();
    assert_eq!(structure.name, "MultipleCounters");
    assert_eq!(keys, vec![Some("1".into()), Some("2".into()), Some("3".into())]);
}
