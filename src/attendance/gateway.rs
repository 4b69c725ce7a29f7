use super::model::Snapshot;

/// Backend contract: whole-document load and whole-document replace. There
/// is no delta API and no concurrency token, so two writers clobber each
/// other.
pub trait PersistenceGateway {
    fn load_all(&mut self) -> anyhow::Result<Snapshot>;

    /// `None` is the reset sentinel ("wipe all attendance"), distinct from
    /// saving an empty document.
    fn save_all(&mut self, snapshot: Option<&Snapshot>) -> anyhow::Result<()>;
}
