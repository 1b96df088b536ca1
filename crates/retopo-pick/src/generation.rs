use std::cell::Cell;
use std::rc::Rc;

/// Shared edit counter. Every projection cache holding a clone compares its
/// stamp against the counter and recomputes once the mesh has been edited.
#[derive(Clone, Debug, Default)]
pub struct EditGeneration(Rc<Cell<u64>>);

impl EditGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.get()
    }

    /// Marks every dependent cache stale and returns the new generation.
    pub fn bump(&self) -> u64 {
        let next = self.0.get().wrapping_add(1);
        self.0.set(next);
        next
    }

    pub fn shares_counter(&self, other: &EditGeneration) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_bumps() {
        let a = EditGeneration::new();
        let b = a.clone();
        assert_eq!(b.current(), 0);
        assert_eq!(a.bump(), 1);
        assert_eq!(b.current(), 1);
        assert!(a.shares_counter(&b));
        assert!(!a.shares_counter(&EditGeneration::new()));
    }
}
