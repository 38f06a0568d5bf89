//! Behavior every backend must share.

use super::StorageBackend;
use crate::error::StorageError;
use std::sync::Barrier;
use std::thread;

pub(crate) fn run_all(storage: &dyn StorageBackend) {
    put_then_get_returns_exact_bytes(storage);
    put_refuses_to_overwrite(storage);
    missing_keys_are_not_found(storage);
    invalid_keys_are_rejected(storage);
    racing_puts_have_one_winner(storage);
}

fn put_then_get_returns_exact_bytes(storage: &dyn StorageBackend) {
    let content = b"line one\n\tline two \xe2\x9c\x93\n".to_vec();
    assert!(!storage.exists("roundtrip").unwrap());
    storage.put("roundtrip", &content).unwrap();
    assert!(storage.exists("roundtrip").unwrap());
    for _ in 0..3 {
        let doc = storage.get("roundtrip").unwrap();
        assert_eq!(doc.key, "roundtrip");
        assert_eq!(doc.content, content);
    }
}

fn put_refuses_to_overwrite(storage: &dyn StorageBackend) {
    storage.put("immutable", b"original").unwrap();
    let err = storage.put("immutable", b"replacement").unwrap_err();
    assert!(matches!(err, StorageError::AlreadyExists(ref key) if key == "immutable"));
    assert_eq!(storage.get("immutable").unwrap().content, b"original");
}

fn missing_keys_are_not_found(storage: &dyn StorageBackend) {
    assert!(!storage.exists("missing").unwrap());
    assert!(matches!(
        storage.get("missing"),
        Err(StorageError::NotFound(_))
    ));
}

fn invalid_keys_are_rejected(storage: &dyn StorageBackend) {
    for key in ["", "../escape", "a/b", ".hidden"] {
        assert!(matches!(
            storage.put(key, b"x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(!storage.exists(key).unwrap());
        assert!(matches!(storage.get(key), Err(StorageError::NotFound(_))));
    }
}

fn racing_puts_have_one_winner(storage: &dyn StorageBackend) {
    let writers = 8;
    let barrier = Barrier::new(writers);
    let results: Vec<Result<(), StorageError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..writers)
            .map(|i| {
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    storage.put("contended", format!("writer-{}", i).as_bytes())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("writer join"))
            .collect()
    });

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|err| matches!(err, StorageError::AlreadyExists(_))));

    let stored = storage.get("contended").unwrap().content;
    let text = String::from_utf8(stored).unwrap();
    assert!(text.starts_with("writer-"), "unexpected content {:?}", text);
}
