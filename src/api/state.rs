use std::{ops::Deref, sync::Arc};

use derive_new::new;

use crate::{auth::Authenticator, config::Config, database::Database, sync::SyncService};

pub type SyncChannel = SyncService<Authenticator, Database, Database>;

#[derive(Debug, Clone, new)]
pub struct App {
    pub sync: Arc<SyncChannel>,
}

impl Deref for App {
    type Target = SyncChannel;

    fn deref(&self) -> &Self::Target {
        &self.sync
    }
}

pub fn create_app(config: &Config, database: Database) -> App {
    let authenticator = config.authenticator(&database);
    let sync = SyncService::new(authenticator, database.clone(), database)
        .with_idle_timeout(config.sync.idle_timeout);

    App {
        sync: Arc::new(sync),
    }
}
