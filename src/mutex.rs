/// Common interface for the lock a [`Board`](crate::Board) is shared through.
///
/// The board does no locking of its own.  When several polling workers drive modules on the same
/// board, every access has to go through one lock so that bus transactions and cache updates from
/// different workers do not interleave.  `pigo` implements this trait for a number of existing
/// mutex types:
///
/// | Mutex | Feature Name | Notes |
/// | --- | --- | --- |
/// | [`core::cell::RefCell`] | _always available_ | For sharing within a single execution context. |
/// | [`std::sync::Mutex`][mutex-std] | `std` | For sharing between [`Poller`](crate::Poller) threads. |
/// | [`critical_section::Mutex`][mutex-cs] | `critical-section` | For bare-metal targets. |
///
/// [mutex-std]: https://doc.rust-lang.org/std/sync/struct.Mutex.html
/// [mutex-cs]: https://docs.rs/critical-section/latest/critical_section/struct.Mutex.html
///
/// For other mutex types, a custom implementation is needed.  Due to the orphan rule, it might be
/// necessary to wrap it in a newtype.  For example, a lock that refuses to hand out a board whose
/// previous holder panicked:
///
/// ```
/// use pigo::{BoardConfig, BoardMutex, Detached, DetachedBoard};
///
/// struct StrictMutex<T>(std::sync::Mutex<T>);
///
/// impl<T> BoardMutex for StrictMutex<T> {
///     type Board = T;
///
///     fn create(v: T) -> Self {
///         Self(std::sync::Mutex::new(v))
///     }
///
///     fn lock<R, F: FnOnce(&mut Self::Board) -> R>(&self, f: F) -> R {
///         let mut v = self.0.lock().expect("board lock poisoned");
///         f(&mut v)
///     }
/// }
///
/// let board = DetachedBoard::new(Detached, Detached, Detached, &BoardConfig::default()).unwrap();
/// let shared = StrictMutex::create(board);
/// assert_eq!(shared.lock(|b| b.flush()), Ok(0));
/// ```
pub trait BoardMutex {
    /// What is wrapped inside this mutex, usually a [`Board`](crate::Board).
    type Board;

    /// Create a new mutex of this type.
    fn create(v: Self::Board) -> Self;

    /// Lock the mutex and give a closure access to the board inside.
    fn lock<R, F: FnOnce(&mut Self::Board) -> R>(&self, f: F) -> R;
}

impl<T> BoardMutex for core::cell::RefCell<T> {
    type Board = T;

    fn create(v: Self::Board) -> Self {
        core::cell::RefCell::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Board) -> R>(&self, f: F) -> R {
        let mut v = self.borrow_mut();
        f(&mut v)
    }
}

#[cfg(feature = "std")]
impl<T> BoardMutex for std::sync::Mutex<T> {
    type Board = T;

    fn create(v: Self::Board) -> Self {
        std::sync::Mutex::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Board) -> R>(&self, f: F) -> R {
        // A worker that panicked mid-operation leaves at worst a dirty shadow register, which the
        // next flush writes again.
        let mut v = self.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut v)
    }
}

#[cfg(feature = "critical-section")]
impl<T> BoardMutex for critical_section::Mutex<core::cell::RefCell<T>> {
    type Board = T;

    fn create(v: Self::Board) -> Self {
        critical_section::Mutex::new(core::cell::RefCell::new(v))
    }

    fn lock<R, F: FnOnce(&mut Self::Board) -> R>(&self, f: F) -> R {
        critical_section::with(|cs| {
            let mut v = self.borrow(cs).borrow_mut();
            f(&mut v)
        })
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::BoardMutex;
    use std::sync::{Arc, Mutex};

    #[test]
    fn poisoned_lock_is_still_usable() {
        let m = Arc::new(<Mutex<u32> as BoardMutex>::create(1));
        let m2 = m.clone();
        let _ = std::thread::spawn(move || {
            BoardMutex::lock(&*m2, |v| {
                *v = 2;
                panic!("worker died");
            })
        })
        .join();

        assert_eq!(BoardMutex::lock(&*m, |v| *v), 2);
    }
}
