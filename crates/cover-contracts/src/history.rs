use crate::artifact::Artifact;
use crate::errors::SessionError;

/// Append-only, chronological list of artifacts plus a selection pointer.
///
/// Storage order never changes; "most recent first" is only a display order
/// exposed through [`HistoryStore::newest_first`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStore {
    artifacts: Vec<Artifact>,
    selected: Option<usize>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the artifact and selects it. Returns its index.
    pub fn append(&mut self, artifact: Artifact) -> usize {
        self.artifacts.push(artifact);
        let index = self.artifacts.len() - 1;
        self.selected = Some(index);
        index
    }

    pub fn restore(&mut self, index: usize) -> Result<&Artifact, SessionError> {
        let len = self.artifacts.len();
        let Some(artifact) = self.artifacts.get(index) else {
            return Err(SessionError::IndexOutOfRange { index, len });
        };
        self.selected = Some(index);
        Ok(artifact)
    }

    pub fn current(&self) -> Option<&Artifact> {
        self.selected.and_then(|index| self.artifacts.get(index))
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn get(&self, index: usize) -> Option<&Artifact> {
        self.artifacts.get(index)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = (usize, &Artifact)> {
        self.artifacts.iter().enumerate().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::HistoryStore;
    use crate::artifact::Artifact;
    use crate::errors::SessionError;
    use crate::image::ImageData;

    fn artifact(payload: &str) -> Artifact {
        Artifact::generated(ImageData::new(None, payload), format!("prompt {payload}"))
    }

    #[test]
    fn append_selects_newest() {
        let mut history = HistoryStore::new();
        assert!(history.current().is_none());
        assert_eq!(history.selected(), None);

        assert_eq!(history.append(artifact("a")), 0);
        assert_eq!(history.append(artifact("b")), 1);
        assert_eq!(history.len(), 2);
        assert_eq!(history.selected(), Some(1));
        assert_eq!(history.current(), Some(&artifact("b")));
    }

    #[test]
    fn restore_moves_selection_without_touching_artifacts() -> anyhow::Result<()> {
        let mut history = HistoryStore::new();
        history.append(artifact("a"));
        history.append(artifact("b"));
        history.append(artifact("c"));
        let before = history.iter().cloned().collect::<Vec<Artifact>>();

        let restored = history.restore(0)?.clone();
        assert_eq!(restored, artifact("a"));
        assert_eq!(history.current(), Some(&artifact("a")));
        assert_eq!(history.iter().cloned().collect::<Vec<Artifact>>(), before);
        Ok(())
    }

    #[test]
    fn restore_out_of_range_keeps_selection() {
        let mut history = HistoryStore::new();
        history.append(artifact("a"));
        history.append(artifact("b"));
        history.restore(0).expect("in range");

        let err = history.restore(2).expect_err("out of range");
        assert_eq!(err, SessionError::IndexOutOfRange { index: 2, len: 2 });
        assert_eq!(history.selected(), Some(0));

        let mut empty = HistoryStore::new();
        assert!(matches!(
            empty.restore(0),
            Err(SessionError::IndexOutOfRange { index: 0, len: 0 })
        ));
        assert_eq!(empty.selected(), None);
    }

    #[test]
    fn newest_first_reverses_display_order_only() {
        let mut history = HistoryStore::new();
        history.append(artifact("a"));
        history.append(artifact("b"));
        let order = history
            .newest_first()
            .map(|(index, _)| index)
            .collect::<Vec<usize>>();
        assert_eq!(order, vec![1, 0]);
        assert_eq!(history.get(0), Some(&artifact("a")));
    }
}
