//! Trait comuni dei repository
//!
//! Coprono solo le operazioni che girano direttamente sul pool. Tutto ciò che
//! deve stare dentro una transazione del chiamante è un metodo inerente che
//! prende `&mut SqliteConnection`: così è il manager a decidere quando fare commit.

/// Insert di un nuovo record; la chiave la assegna SQLite
pub trait Create<Entity, NewEntity> {
    async fn create(&self, data: &NewEntity) -> Result<Entity, sqlx::Error>;
}

/// Lettura per chiave primaria (`i64`, oppure `(group_id, user_id)` per le membership)
pub trait Read<Entity, Key> {
    /// `Ok(None)` se la chiave non esiste
    async fn read(&self, key: &Key) -> Result<Option<Entity>, sqlx::Error>;
}

pub trait ReadMany<Entity, Key> {
    /// Ordine per chiave primaria, non quello di `keys`; le chiavi mancanti vengono saltate
    async fn read_many(&self, keys: &[Key]) -> Result<Vec<Entity>, sqlx::Error>;
}

pub trait Delete<Key> {
    /// `Ok(false)` se non c'era niente da cancellare
    async fn delete(&self, key: &Key) -> Result<bool, sqlx::Error>;
}
