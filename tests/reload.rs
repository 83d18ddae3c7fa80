use std::any::Any;
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use foundry::{
    CreateError, Error, Factory, FactoryFlags, FactoryParams, ReloadError, ResourceDescriptor,
    ResourceHandler, ResourcePtr,
};

struct Text(String);

#[derive(Default)]
struct Journal {
    recreated_sizes: RefCell<Vec<usize>>,
}

struct TextHandler {
    journal: Rc<Journal>,
    reloadable: bool,
    fail_recreate: Option<CreateError>,
}

impl TextHandler {
    fn new(journal: Rc<Journal>) -> Self {
        TextHandler {
            journal,
            reloadable: true,
            fail_recreate: None,
        }
    }
}

impl ResourceHandler for TextHandler {
    fn create(&mut self, bytes: &[u8], _name: &str) -> Result<Box<dyn Any>, CreateError> {
        let text = String::from_utf8(bytes.to_vec()).map_err(|_| CreateError::FormatError)?;
        Ok(Box::new(Text(text)))
    }

    fn destroy(&mut self, _descriptor: &ResourceDescriptor) {}

    fn reloadable(&self) -> bool {
        self.reloadable
    }

    fn recreate(
        &mut self,
        bytes: &[u8],
        _name: &str,
        resource: &mut dyn Any,
    ) -> Result<(), CreateError> {
        if let Some(err) = self.fail_recreate {
            return Err(err);
        }

        self.journal.recreated_sizes.borrow_mut().push(bytes.len());
        let text = resource.downcast_mut::<Text>().ok_or(CreateError::Unknown)?;
        text.0 = String::from_utf8(bytes.to_vec()).map_err(|_| CreateError::FormatError)?;
        Ok(())
    }
}

fn text_of(resource: &ResourcePtr) -> String {
    resource.borrow().downcast_ref::<Text>().unwrap().0.clone()
}

fn reload_params() -> FactoryParams {
    FactoryParams {
        flags: FactoryFlags::RELOAD_SUPPORT,
        ..Default::default()
    }
}

fn testbed(handler: TextHandler) -> (tempfile::TempDir, Factory) {
    let dir = tempfile::tempdir().unwrap();
    let uri = format!("file://{}", dir.path().display());

    let mut factory = Factory::new(reload_params(), &uri).unwrap();
    factory.register("txt", handler).unwrap();
    (dir, factory)
}

#[test]
fn reload_recreates_in_place() {
    let journal = Rc::new(Journal::default());
    let (dir, mut factory) = testbed(TextHandler::new(journal.clone()));
    fs::write(dir.path().join("a.txt"), "hello").unwrap();

    let resource = factory.acquire("a.txt").unwrap();
    assert_eq!(text_of(&resource), "hello");

    let notified = Rc::new(RefCell::new(Vec::new()));
    let sink = notified.clone();
    factory
        .register_reload_observer(Box::new(move |_rd, name| {
            sink.borrow_mut().push(name.to_owned());
        }))
        .unwrap();

    fs::write(dir.path().join("a.txt"), "world").unwrap();
    factory.reload("a.txt").unwrap();

    // The object was rebuilt behind the pointer the caller already holds.
    assert_eq!(text_of(&resource), "world");
    assert_eq!(*journal.recreated_sizes.borrow(), vec![5]);
    assert_eq!(*notified.borrow(), vec!["a.txt".to_owned()]);

    factory.release(&resource);
}

#[test]
fn reload_preserves_identity() {
    let journal = Rc::new(Journal::default());
    let (dir, mut factory) = testbed(TextHandler::new(journal));
    fs::write(dir.path().join("a.txt"), "one").unwrap();

    let first = factory.acquire("a.txt").unwrap();

    for content in &["two", "three", "four"] {
        fs::write(dir.path().join("a.txt"), content).unwrap();
        factory.reload("a.txt").unwrap();
    }

    let again = factory.acquire("a.txt").unwrap();
    assert!(Rc::ptr_eq(&first, &again));
    assert_eq!(text_of(&again), "four");
    assert_eq!(factory.descriptor_of("a.txt").unwrap().ref_count, 2);

    factory.release(&first);
    factory.release(&again);
}

#[test]
fn reload_without_recreate_support() {
    let journal = Rc::new(Journal::default());
    let mut handler = TextHandler::new(journal);
    handler.reloadable = false;

    let (dir, mut factory) = testbed(handler);
    fs::write(dir.path().join("a.txt"), "hello").unwrap();

    let resource = factory.acquire("a.txt").unwrap();

    let notified = Rc::new(RefCell::new(0u32));
    let sink = notified.clone();
    factory
        .register_reload_observer(Box::new(move |_, _| *sink.borrow_mut() += 1))
        .unwrap();

    assert_eq!(
        factory.reload("a.txt").err(),
        Some(ReloadError::NotSupported {
            extension: "txt".to_owned()
        })
    );
    assert_eq!(*notified.borrow(), 0);
    assert_eq!(text_of(&resource), "hello");

    factory.release(&resource);
}

#[test]
fn reload_of_unloaded_resources() {
    let journal = Rc::new(Journal::default());
    let (_dir, mut factory) = testbed(TextHandler::new(journal));

    assert_eq!(factory.reload("a.txt").err(), Some(ReloadError::NotFound));
}

#[test]
fn reload_surfaces_load_failures() {
    let journal = Rc::new(Journal::default());
    let (dir, mut factory) = testbed(TextHandler::new(journal));
    fs::write(dir.path().join("a.txt"), "hello").unwrap();

    let resource = factory.acquire("a.txt").unwrap();
    fs::remove_file(dir.path().join("a.txt")).unwrap();

    match factory.reload("a.txt") {
        Err(ReloadError::Load(Error::ResourceNotFound(_))) => {}
        other => panic!("expected load failure, got {:?}", other),
    }
    assert_eq!(text_of(&resource), "hello");

    factory.release(&resource);
}

#[test]
fn recreate_failures_map_onto_reload_errors() {
    let journal = Rc::new(Journal::default());
    let mut handler = TextHandler::new(journal);
    handler.fail_recreate = Some(CreateError::FormatError);

    let (dir, mut factory) = testbed(handler);
    fs::write(dir.path().join("a.txt"), "hello").unwrap();

    let resource = factory.acquire("a.txt").unwrap();

    let notified = Rc::new(RefCell::new(0u32));
    let sink = notified.clone();
    factory
        .register_reload_observer(Box::new(move |_, _| *sink.borrow_mut() += 1))
        .unwrap();

    assert_eq!(
        factory.reload("a.txt").err(),
        Some(ReloadError::FormatError)
    );
    assert_eq!(*notified.borrow(), 0);

    factory.release(&resource);
}

#[test]
fn observers_fire_in_registration_order() {
    let journal = Rc::new(Journal::default());
    let (dir, mut factory) = testbed(TextHandler::new(journal));
    fs::write(dir.path().join("a.txt"), "hello").unwrap();

    let resource = factory.acquire("a.txt").unwrap();

    let order = Rc::new(RefCell::new(Vec::new()));
    let first_sink = order.clone();
    let first = factory
        .register_reload_observer(Box::new(move |_, _| first_sink.borrow_mut().push("first")))
        .unwrap();
    let second_sink = order.clone();
    factory
        .register_reload_observer(Box::new(move |_, _| second_sink.borrow_mut().push("second")))
        .unwrap();

    factory.reload("a.txt").unwrap();
    assert_eq!(*order.borrow(), vec!["first", "second"]);

    factory.unregister_reload_observer(first);
    factory.reload("a.txt").unwrap();
    assert_eq!(*order.borrow(), vec!["first", "second", "second"]);

    factory.release(&resource);
}

#[test]
fn observer_capacity_is_bounded() {
    let journal = Rc::new(Journal::default());
    let (_dir, mut factory) = testbed(TextHandler::new(journal));

    for _ in 0..16 {
        assert!(factory
            .register_reload_observer(Box::new(|_, _| {}))
            .is_some());
    }
    assert!(factory
        .register_reload_observer(Box::new(|_, _| {}))
        .is_none());
}

#[test]
fn observers_require_reload_support() {
    let dir = tempfile::tempdir().unwrap();
    let uri = format!("file://{}", dir.path().display());
    let mut factory = Factory::new(FactoryParams::default(), &uri).unwrap();

    assert!(factory
        .register_reload_observer(Box::new(|_, _| {}))
        .is_none());
}
