use std::cell::Cell;
use std::rc::Rc;

use super::*;

fn counting_hook() -> (Rc<Cell<u32>>, Rc<dyn Fn()>) {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    (calls, Rc::new(move || counter.set(counter.get() + 1)))
}

fn next_key() -> usize {
    NEXT_CONTEXT_KEY.fetch_add(1, Ordering::Relaxed)
}

#[test]
fn repeated_calls_activate_once() {
    let key = next_key();
    let (calls, hook) = counting_hook();

    activate_cached(key, Some(&*hook));
    activate_cached(key, Some(&*hook));
    assert_eq!(calls.get(), 1);
}

#[test]
fn switching_contexts_reactivates() {
    let (first_key, second_key) = (next_key(), next_key());
    let (first_calls, first) = counting_hook();
    let (second_calls, second) = counting_hook();

    activate_cached(first_key, Some(&*first));
    activate_cached(second_key, Some(&*second));
    activate_cached(first_key, Some(&*first));
    assert_eq!(first_calls.get(), 2);
    assert_eq!(second_calls.get(), 1);
}

#[test]
fn unhooked_domain_clears_the_cache() {
    let (hooked_key, unhooked_key) = (next_key(), next_key());
    let (calls, hook) = counting_hook();

    activate_cached(hooked_key, Some(&*hook));
    activate_cached(unhooked_key, None);
    assert_eq!(CURRENT_GL_DOMAIN.with(Cell::get), 0);

    // The caller may have switched contexts in between, so the hooked domain activates again.
    activate_cached(hooked_key, Some(&*hook));
    assert_eq!(calls.get(), 2);
}
