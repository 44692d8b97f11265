use std::ops::Deref;

use gl::types::*;

/// A driver object owned by a wrapper. A name of 0 means nothing is allocated.
pub trait Resource {
    /// Driver name of the object, 0 if unallocated
    fn object(&self) -> GLuint;

    /// Frees the driver object(s). Calling again is a no-op
    fn release(&mut self);

    fn is_allocated(&self) -> bool {
        self.object() != 0
    }
}

/// Something that can be made current in the context, e.g. a program in use or a bound texture
pub trait Bindable {
    fn bind(&self);
    fn unbind(&self);
}

/// Binds on creation, unbinds on drop
pub struct ScopedBind<'a, T: Bindable>(&'a T);

impl<'a, T: Bindable> ScopedBind<'a, T> {
    fn new(obj: &'a T) -> Self {
        obj.bind();
        Self(obj)
    }
}

impl<'a, T: Bindable> Drop for ScopedBind<'a, T> {
    fn drop(&mut self) {
        self.0.unbind();
    }
}

impl<'a, T: Bindable> Deref for ScopedBind<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

pub trait ScopedBindable: Bindable + Sized {
    fn scoped_bind(&self) -> ScopedBind<Self> {
        ScopedBind::new(self)
    }
}

impl<T: Bindable> ScopedBindable for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counter {
        bound: Cell<bool>,
        binds: Cell<u32>,
    }

    impl Bindable for Counter {
        fn bind(&self) {
            self.bound.set(true);
            self.binds.set(self.binds.get() + 1);
        }

        fn unbind(&self) {
            self.bound.set(false);
        }
    }

    #[test]
    fn scoped() {
        let counter = Counter::default();
        {
            let bound = counter.scoped_bind();
            assert!(bound.bound.get());
        }
        assert!(!counter.bound.get());

        let _a = counter.scoped_bind();
        assert_eq!(counter.binds.get(), 2);
    }
}
