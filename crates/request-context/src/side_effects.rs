use index_gate_core_types::IndexSet;

/// Deferred mutation, applied only when the owning request is allowed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SideEffect {
    SetIndices(IndexSet),
    SetResponseHeader { name: String, value: String },
}

/// Ordered queue of [`SideEffect`]s for one request.
#[derive(Clone, Debug, Default)]
pub struct RequestSideEffects {
    effects: Vec<SideEffect>,
}

impl RequestSideEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_effect(&mut self, effect: SideEffect) {
        self.effects.push(effect);
    }

    pub fn size(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SideEffect> {
        self.effects.iter()
    }

    /// Runs every queued effect in enqueue order, then empties the queue.
    ///
    /// Stops at the first failing effect; the rest are dropped with it.
    pub fn commit<F, E>(&mut self, mut apply: F) -> Result<(), E>
    where
        F: FnMut(SideEffect) -> Result<(), E>,
    {
        for effect in std::mem::take(&mut self.effects) {
            apply(effect)?;
        }
        Ok(())
    }

    /// Discards every queued effect without running it.
    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_gate_core_types::index_set;

    #[test]
    fn commit_runs_in_order_and_empties() {
        let mut ledger = RequestSideEffects::new();
        ledger.append_effect(SideEffect::SetIndices(index_set(["a"])));
        ledger.append_effect(SideEffect::SetResponseHeader {
            name: "X-A".into(),
            value: "1".into(),
        });
        assert_eq!(ledger.size(), 2);

        let mut seen = Vec::new();
        ledger
            .commit(|effect| {
                seen.push(effect);
                Ok::<_, ()>(())
            })
            .unwrap();
        assert!(matches!(seen[0], SideEffect::SetIndices(_)));
        assert!(matches!(seen[1], SideEffect::SetResponseHeader { .. }));
        assert!(ledger.is_empty());
    }

    #[test]
    fn clear_discards_without_running() {
        let mut ledger = RequestSideEffects::new();
        ledger.append_effect(SideEffect::SetIndices(index_set(["a"])));
        ledger.clear();
        let mut ran = false;
        ledger
            .commit(|_| {
                ran = true;
                Ok::<_, ()>(())
            })
            .unwrap();
        assert!(!ran);
    }

    #[test]
    fn commit_stops_at_first_failure() {
        let mut ledger = RequestSideEffects::new();
        for name in ["a", "b", "c"] {
            ledger.append_effect(SideEffect::SetIndices(index_set([name])));
        }
        let mut applied = 0;
        let result = ledger.commit(|effect| {
            applied += 1;
            match effect {
                SideEffect::SetIndices(set) if set.contains("b") => Err("boom"),
                _ => Ok(()),
            }
        });
        assert_eq!(result, Err("boom"));
        assert_eq!(applied, 2);
        assert!(ledger.is_empty());
    }
}
