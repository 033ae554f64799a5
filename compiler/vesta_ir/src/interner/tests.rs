use super::*;

#[test]
fn interning_is_stable() {
    let interner = StringInterner::new();
    let a = interner.intern("push");
    let b = interner.intern("push");
    let c = interner.intern("pop");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.lookup(a), "push");
    assert_eq!(interner.lookup(c), "pop");
}

#[test]
fn empty_string_is_pre_interned() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert_eq!(interner.len(), 1);
}

#[test]
fn get_does_not_insert() {
    let interner = StringInterner::new();
    assert_eq!(interner.get("missing"), None);
    assert_eq!(interner.len(), 1);
    let name = interner.intern("present");
    assert_eq!(interner.get("present"), Some(name));
}

#[test]
fn shared_interner_is_concurrent() {
    let interner = SharedInterner::new();
    let names: Vec<Name> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let interner = interner.clone();
                s.spawn(move || interner.intern("shared"))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(Name::EMPTY))
            .collect()
    });
    assert!(names.iter().all(|n| *n == names[0]));
    assert_eq!(interner.lookup(names[0]), "shared");
}
