//! Host elements - the rendered output the multiplexer binds to.
//!
//! An [`Element`] is a minimal retained host node: a tag, attributes, child
//! elements and a table of per-event subjects. Hosts create fresh elements
//! on every render; event sources follow them through
//! [`EventTable::rebind`](super::EventTable::rebind).
//!
//! # Selectors
//!
//! Supported forms: `#id`, `.class`, `tag`, `tag.class`.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::stream::{Source, Subject};

use super::event::{DomEvent, EventData};

/// Shared handle to a host element.
pub type ElementRef = Rc<Element>;

/// Tag used for text leaves.
pub const TEXT_TAG: &str = "#text";

pub struct Element {
    tag: String,
    text: Option<String>,
    attrs: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<ElementRef>>,
    listeners: RefCell<HashMap<String, Subject<DomEvent>>>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> ElementRef {
        Rc::new(Self {
            tag: tag.into(),
            text: None,
            attrs: RefCell::new(BTreeMap::new()),
            children: RefCell::new(Vec::new()),
            listeners: RefCell::new(HashMap::new()),
        })
    }

    pub fn text_node(content: impl Into<String>) -> ElementRef {
        Rc::new(Self {
            tag: TEXT_TAG.to_string(),
            text: Some(content.into()),
            attrs: RefCell::new(BTreeMap::new()),
            children: RefCell::new(Vec::new()),
            listeners: RefCell::new(HashMap::new()),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.borrow_mut().insert(name.into(), value.into());
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.attrs.borrow().get(name).cloned()
    }

    pub fn id(&self) -> Option<String> {
        self.attr("id")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attrs
            .borrow()
            .get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn append_child(&self, child: ElementRef) {
        self.children.borrow_mut().push(child);
    }

    pub fn children(&self) -> Vec<ElementRef> {
        self.children.borrow().clone()
    }

    /// Swap the descendant `old` (by identity) for `new`. Returns false when
    /// `old` is not under this element.
    pub fn replace_descendant(&self, old: &ElementRef, new: ElementRef) -> bool {
        let mut children = self.children.borrow_mut();
        if let Some(slot) = children.iter_mut().find(|child| Rc::ptr_eq(child, old)) {
            *slot = new;
            return true;
        }
        children.iter().any(|child| child.replace_descendant(old, new.clone()))
    }

    /// Concatenated text of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in self.children.borrow().iter() {
            child.collect_text(out);
        }
    }

    /// `tag#id.class` description used as the event target.
    pub fn describe(&self) -> String {
        let mut out = self.tag.clone();
        let attrs = self.attrs.borrow();
        if let Some(id) = attrs.get("id") {
            out.push('#');
            out.push_str(id);
        }
        if let Some(classes) = attrs.get("class") {
            for class in classes.split_whitespace() {
                out.push('.');
                out.push_str(class);
            }
        }
        out
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn matches(&self, selector: &str) -> bool {
        Selector::parse(selector).is_some_and(|s| s.matches(self))
    }

    /// First descendant (depth-first, document order) matching `selector`.
    /// The element itself is not considered.
    pub fn query_selector(&self, selector: &str) -> Option<ElementRef> {
        let selector = Selector::parse(selector)?;
        self.find_descendant(&selector)
    }

    pub fn query_selector_all(&self, selector: &str) -> Vec<ElementRef> {
        let mut found = Vec::new();
        if let Some(selector) = Selector::parse(selector) {
            self.collect_descendants(&selector, &mut found);
        }
        found
    }

    fn find_descendant(&self, selector: &Selector) -> Option<ElementRef> {
        for child in self.children.borrow().iter() {
            if selector.matches(child) {
                return Some(child.clone());
            }
            if let Some(found) = child.find_descendant(selector) {
                return Some(found);
            }
        }
        None
    }

    fn collect_descendants(&self, selector: &Selector, found: &mut Vec<ElementRef>) {
        for child in self.children.borrow().iter() {
            if selector.matches(child) {
                found.push(child.clone());
            }
            child.collect_descendants(selector, found);
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Events of type `name` dispatched on this element.
    pub fn events(&self, name: &str) -> Source<DomEvent> {
        self.listeners
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .source()
    }

    /// Dispatch an event on this element. Events do not bubble.
    pub fn dispatch(&self, name: &str, data: EventData) {
        let subject = self.listeners.borrow().get(name).cloned();
        if let Some(subject) = subject {
            subject.next(DomEvent::new(name, self.describe(), data));
        }
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag)
            .field("attrs", &self.attrs.borrow())
            .field("children", &self.children.borrow().len())
            .finish()
    }
}

// =============================================================================
// Selector
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
enum Selector {
    Id(String),
    Class(String),
    Tag(String),
    TagClass(String, String),
}

impl Selector {
    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Some(id) = input.strip_prefix('#') {
            return Some(Selector::Id(id.to_string()));
        }
        if let Some(class) = input.strip_prefix('.') {
            return Some(Selector::Class(class.to_string()));
        }
        match input.split_once('.') {
            Some((tag, class)) => Some(Selector::TagClass(tag.to_string(), class.to_string())),
            None => Some(Selector::Tag(input.to_string())),
        }
    }

    fn matches(&self, element: &Element) -> bool {
        match self {
            Selector::Id(id) => element.id().as_deref() == Some(id.as_str()),
            Selector::Class(class) => element.has_class(class),
            Selector::Tag(tag) => element.tag() == tag,
            Selector::TagClass(tag, class) => element.tag() == tag && element.has_class(class),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn sample() -> ElementRef {
        let root = Element::new("div");
        let list = Element::new("ul");
        list.set_attr("class", "todo-list");
        let item = Element::new("li");
        item.set_attr("id", "first");
        item.set_attr("class", "todo completed");
        item.append_child(Element::text_node("milk"));
        list.append_child(item);
        root.append_child(list);
        let button = Element::new("button");
        button.set_attr("class", "clear-completed");
        root.append_child(button);
        root
    }

    #[test]
    fn test_replace_nested_descendant() {
        let root = sample();
        let item = root.query_selector("#first").expect("item");
        let fresh = Element::new("li");
        fresh.set_attr("id", "fresh");

        assert!(root.replace_descendant(&item, fresh));
        assert!(root.query_selector("#first").is_none());
        assert_eq!(root.query_selector("#fresh").map(|e| e.tag().to_string()), Some("li".into()));
        assert!(!root.replace_descendant(&item, Element::new("li")));
    }

    #[test]
    fn test_query_selector_forms() {
        let root = sample();

        assert_eq!(root.query_selector("#first").map(|e| e.tag().to_string()), Some("li".into()));
        assert!(root.query_selector(".completed").is_some());
        assert!(root.query_selector("button").is_some());
        assert!(root.query_selector("li.todo").is_some());
        assert!(root.query_selector("li.missing").is_none());
        // Only descendants are searched.
        assert!(root.query_selector("div").is_none());
    }

    #[test]
    fn test_text_content_and_describe() {
        let root = sample();
        assert_eq!(root.text_content(), "milk");
        let item = root.query_selector("#first").expect("item");
        assert_eq!(item.describe(), "li#first.todo.completed");
    }

    #[test]
    fn test_dispatch_reaches_listeners_only() {
        let button = Element::new("button");
        let clicks = Rc::new(Cell::new(0));
        let clicks_clone = clicks.clone();
        let _sub = button.events("click").on_next(move |_| clicks_clone.set(clicks_clone.get() + 1));

        button.dispatch("click", EventData::None);
        button.dispatch("keyDown", EventData::None);

        assert_eq!(clicks.get(), 1);
    }
}
